//! Multipart form decoding shared by every upload endpoint.
//!
//! The uploaded file lives in the `image` field. Every other field is
//! read as text; absent fields take the endpoint's default. Integer
//! fields must parse exactly (surrounding whitespace allowed) and
//! boolean fields go through [`parse_bool`].

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::ApiError;

/// Name of the file field.
pub const IMAGE_FIELD: &str = "image";

/// Tokens accepted as `true`, compared case-insensitively.
pub const TRUTHY: [&str; 4] = ["1", "true", "yes", "y"];

/// Interpret a form value as a boolean.
///
/// Only the [`TRUTHY`] tokens are true; anything else, including an
/// empty string, is false.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(value))
}

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name.
    pub file_name: String,
    /// File contents.
    pub data: Bytes,
}

/// A decoded multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    image: Option<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read every part of `multipart`.
    ///
    /// A part named `image` counts as the upload only when it carries a
    /// file name. For repeated text fields the first value wins.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Multipart`] if the body is malformed.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == IMAGE_FIELD
                && let Some(file_name) = field.file_name().map(str::to_owned)
            {
                let data = field.bytes().await?;
                if form.image.is_none() {
                    form.image = Some(Upload { file_name, data });
                }
                continue;
            }
            let value = field.text().await?;
            form.fields.entry(name).or_insert(value);
        }
        Ok(form)
    }

    /// Build a form directly, for callers that already hold the parts.
    #[must_use]
    pub fn new(image: Option<Upload>, fields: HashMap<String, String>) -> Self {
        Self { image, fields }
    }

    /// The uploaded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingInput`] when no file was uploaded or
    /// the file name is empty.
    pub fn image(&self) -> Result<Bytes, ApiError> {
        match &self.image {
            None => Err(ApiError::MissingInput("No image file provided")),
            Some(upload) if upload.file_name.is_empty() => {
                Err(ApiError::MissingInput("No image file selected"))
            }
            Some(upload) => Ok(upload.data.clone()),
        }
    }

    /// Integer field `name`, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BadField`] when present but not an integer.
    pub fn int(&self, name: &str, default: i64) -> Result<i64, ApiError> {
        self.fields.get(name).map_or(Ok(default), |raw| {
            raw.trim().parse().map_err(|_| ApiError::BadField {
                field: name.to_owned(),
                value: raw.clone(),
            })
        })
    }

    /// Boolean field `name`; absent is false.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| parse_bool(v))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadForm {
        UploadForm::new(
            Some(Upload {
                file_name: "photo.png".into(),
                data: Bytes::from_static(b"png"),
            }),
            fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[test]
    fn truthy_tokens() {
        for value in ["1", "true", "TRUE", "Yes", "y", " y ", "True\n"] {
            assert!(parse_bool(value), "{value:?} should be true");
        }
        for value in ["", "0", "false", "no", "on", "t", "yes please"] {
            assert!(!parse_bool(value), "{value:?} should be false");
        }
    }

    #[test]
    fn missing_integer_takes_default() {
        assert_eq!(form(&[]).int("k", 6).unwrap(), 6);
        assert_eq!(form(&[("k", " 9 ")]).int("k", 6).unwrap(), 9);
        assert_eq!(form(&[("k", "-3")]).int("k", 6).unwrap(), -3);
    }

    #[test]
    fn non_integer_is_a_bad_field() {
        let err = form(&[("min_area", "12.5")]).int("min_area", 300).unwrap_err();
        assert!(matches!(err, ApiError::BadField { ref field, .. } if field == "min_area"));
        assert!(form(&[("k", "")]).int("k", 6).is_err());
    }

    #[test]
    fn flags_default_to_false() {
        assert!(!form(&[]).flag("invert_colors"));
        assert!(form(&[("invert_colors", "yes")]).flag("invert_colors"));
    }

    #[test]
    fn image_presence_is_checked() {
        assert!(matches!(
            UploadForm::default().image(),
            Err(ApiError::MissingInput("No image file provided"))
        ));
        let unnamed = UploadForm::new(
            Some(Upload {
                file_name: String::new(),
                data: Bytes::new(),
            }),
            HashMap::new(),
        );
        assert!(matches!(
            unnamed.image(),
            Err(ApiError::MissingInput("No image file selected"))
        ));
        assert_eq!(form(&[]).image().unwrap(), Bytes::from_static(b"png"));
    }
}
