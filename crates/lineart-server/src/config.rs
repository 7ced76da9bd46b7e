//! Server configuration from flags and environment.

use std::net::SocketAddr;

use clap::Parser;

/// Default upload limit: 32 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// HTTP host for the line-art pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "lineart-server", version)]
pub struct ServerConfig {
    /// Address to bind to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 9000)]
    pub port: u16,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns an error if `bind_address:port` is not a valid socket
    /// address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address: {e}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "lineart-server",
            "--bind-address",
            "127.0.0.1",
            "--port",
            "8088",
            "--max-upload-bytes",
            "1024",
        ]);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8088");
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn bad_bind_address_is_an_error() {
        let config = ServerConfig::parse_from(["lineart-server", "--bind-address", "not an ip"]);
        assert!(config.socket_addr().is_err());
    }
}
