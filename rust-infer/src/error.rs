//! Error definitions for the SDK.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {source}")]
    HttpClient {
        #[from]
        source: reqwest::Error,
    },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Image error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },

    #[error("Font error: {source}")]
    Font {
        #[from]
        source: ab_glyph::InvalidFont,
    },

    #[error("Base64 decode error: {source}")]
    Base64 {
        #[from]
        source: base64::DecodeError,
    },

    #[error("Unsupported mask type: {kind}")]
    UnsupportedMask { kind: &'static str },

    #[error("Mask size {mask_width}x{mask_height} does not match image size {image_width}x{image_height}")]
    MaskSizeMismatch {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_carries_status_and_body() {
        let err = Error::ApiError {
            status: 500,
            message: "server error".into(),
        };
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("server error"));
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
