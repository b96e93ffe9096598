//! Image ingestion — turns an uploaded picture into the opaque `data:` URL
//! stored in `personalDetails.profilePicture`.

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use thiserror::Error;

/// Uploads above this size are rejected before encoding.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("image is empty")]
    Empty,

    #[error("image is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

const ACCEPTED_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

pub fn to_data_url(content_type: &str, data: &Bytes) -> Result<String, ImageError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ACCEPTED_TYPES.contains(&mime.as_str()) {
        return Err(ImageError::UnsupportedType(content_type.to_string()));
    }
    if data.is_empty() {
        return Err(ImageError::Empty);
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            size: data.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(format!(
        "data:{mime};base64,{}",
        general_purpose::STANDARD.encode(data)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_becomes_data_url() {
        let url = to_data_url("image/png", &Bytes::from_static(&[0x89, b'P', b'N', b'G'])).unwrap();
        assert_eq!(url, "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_content_type_parameters_are_ignored() {
        let url = to_data_url("Image/JPEG; charset=binary", &Bytes::from_static(b"abc")).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_non_image_rejected() {
        assert_eq!(
            to_data_url("application/pdf", &Bytes::from_static(b"%PDF")),
            Err(ImageError::UnsupportedType("application/pdf".into()))
        );
    }

    #[test]
    fn test_empty_and_oversized_rejected() {
        assert_eq!(to_data_url("image/png", &Bytes::new()), Err(ImageError::Empty));
        let big = Bytes::from(vec![0u8; MAX_IMAGE_BYTES + 1]);
        assert!(matches!(
            to_data_url("image/png", &big),
            Err(ImageError::TooLarge { .. })
        ));
    }
}
