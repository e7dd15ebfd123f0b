//! Package manifest rewriting
//!
//! This module provides:
//! - Format-preserving version updates for package.json
//! - Decoding of manifest contents fetched from the hosting platform

mod package_json;

pub use package_json::{
    format_updated_spec, update_dependency_version, DEPENDENCY_SECTIONS, PACKAGE_JSON,
};

use crate::error::ManifestError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decode base64 file content as returned by the contents API
///
/// Line breaks inside the payload are ignored.
pub fn decode_content(path: &str, encoded: &str) -> Result<String, ManifestError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ManifestError::DecodeError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| ManifestError::DecodeError {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Encode file content for the contents API
pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_content() {
        let encoded = "eyJuYW1lIjog\nImFwcCJ9\n";
        assert_eq!(decode_content("package.json", encoded).unwrap(), r#"{"name": "app"}"#);
    }

    #[test]
    fn test_encode_decode() {
        let content = "{\n  \"dependencies\": {}\n}\n";
        let encoded = encode_content(content);
        assert_eq!(decode_content(PACKAGE_JSON, &encoded).unwrap(), content);
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(
            decode_content("package.json", "!!!"),
            Err(ManifestError::DecodeError { .. })
        ));
    }
}
