use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::errors::ConversionError;

/// Binary payload carried by a BINARY property.
///
/// The payload is either inline bytes (round-tripping as a `data:` URI) or a
/// reference to an external file holding the data. Which form a payload takes
/// is decided by the value converter's size threshold when data leaves the
/// store; incoming trees may carry either form.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryValue {
    backing: Backing,
    media_type: Option<String>,
    charset: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Backing {
    Inline(Vec<u8>),
    External(PathBuf),
}

impl BinaryValue {
    /// Inline payload from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            backing: Backing::Inline(data),
            media_type: None,
            charset: None,
        }
    }

    /// External payload referencing a file on disk.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::External(path.into()),
            media_type: None,
            charset: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.backing, Backing::Inline(_))
    }

    /// Path of the external backing file, if this payload is external.
    pub fn external_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::External(path) => Some(path),
            Backing::Inline(_) => None,
        }
    }

    /// Parse a `data:[mediatype][;charset=cs][;base64],<data>` URI.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::InvalidBinary` when the scheme, separator or
    /// base64 payload is malformed.
    pub fn from_data_uri(uri: &str) -> Result<Self, ConversionError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ConversionError::InvalidBinary {
                reason: "missing data: scheme".to_string(),
            })?;

        let (metadata, payload) =
            rest.split_once(',')
                .ok_or_else(|| ConversionError::InvalidBinary {
                    reason: "missing ',' separator in data URI".to_string(),
                })?;

        let mut media_type = None;
        let mut charset = None;
        for token in metadata.split(';').filter(|t| !t.is_empty()) {
            if let Some(cs) = token.strip_prefix("charset=") {
                charset = Some(cs.to_string());
            } else if token != "base64" {
                media_type = Some(token.to_string());
            }
        }

        let data = BASE64
            .decode(payload)
            .map_err(|e| ConversionError::InvalidBinary {
                reason: format!("invalid base64 payload: {}", e),
            })?;

        Ok(Self {
            backing: Backing::Inline(data),
            media_type,
            charset,
        })
    }

    /// Parse a stringified binary value: a `data:` URI becomes an inline
    /// payload, anything else is treated as an external file locator.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::InvalidBinary` for a malformed `data:` URI.
    pub fn from_locator(value: &str) -> Result<Self, ConversionError> {
        if value.starts_with("data:") {
            Self::from_data_uri(value)
        } else {
            Ok(Self::from_file(value))
        }
    }

    /// URI-string encoding of this payload: a `data:` URI for inline bytes,
    /// the locator string for an external file.
    pub fn to_uri_string(&self) -> String {
        match &self.backing {
            Backing::Inline(data) => {
                let mut uri = String::with_capacity(data.len() + 24);
                uri.push_str("data:");
                if let Some(media_type) = &self.media_type {
                    uri.push_str(media_type);
                }
                if let Some(charset) = &self.charset {
                    uri.push_str(";charset=");
                    uri.push_str(charset);
                }
                uri.push_str(";base64,");
                uri.push_str(&BASE64.encode(data));
                uri
            }
            Backing::External(path) => path.display().to_string(),
        }
    }

    /// Payload size in bytes. Stats the backing file for external payloads.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for an unreadable external file.
    pub fn len(&self) -> io::Result<u64> {
        match &self.backing {
            Backing::Inline(data) => Ok(data.len() as u64),
            Backing::External(path) => Ok(std::fs::metadata(path)?.len()),
        }
    }

    /// Whether the payload holds zero bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for an unreadable external file.
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Open a transient reader over the payload. The reader owns its
    /// resources and releases them on drop, including on error paths.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when an external file cannot be opened.
    pub fn reader(&self) -> io::Result<Box<dyn Read + '_>> {
        match &self.backing {
            Backing::Inline(data) => Ok(Box::new(Cursor::new(data.as_slice()))),
            Backing::External(path) => Ok(Box::new(File::open(path)?)),
        }
    }

    /// Read the full payload into memory.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the backing cannot be read.
    pub fn bytes(&self) -> io::Result<Vec<u8>> {
        match &self.backing {
            Backing::Inline(data) => Ok(data.clone()),
            Backing::External(_) => {
                let mut buf = Vec::new();
                self.reader()?.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_data_uri_round_trip() {
        let payload = BinaryValue::from_bytes(b"hello world".to_vec())
            .with_media_type("text/plain")
            .with_charset("utf-8");

        let uri = payload.to_uri_string();
        assert!(uri.starts_with("data:text/plain;charset=utf-8;base64,"));

        let back = BinaryValue::from_data_uri(&uri).unwrap();
        assert_eq!(back.bytes().unwrap(), b"hello world");
        assert_eq!(back.media_type(), Some("text/plain"));
        assert_eq!(back.charset(), Some("utf-8"));
    }

    #[test]
    fn test_data_uri_without_metadata() {
        let uri = format!("data:;base64,{}", BASE64.encode(b"x"));
        let payload = BinaryValue::from_data_uri(&uri).unwrap();
        assert_eq!(payload.bytes().unwrap(), b"x");
        assert_eq!(payload.media_type(), None);
    }

    #[test]
    fn test_invalid_data_uri_rejected() {
        assert!(BinaryValue::from_data_uri("nope").is_err());
        assert!(BinaryValue::from_data_uri("data:text/plain").is_err());
        assert!(BinaryValue::from_data_uri("data:;base64,!!!").is_err());
    }

    #[test]
    fn test_locator_dispatches_on_scheme() {
        let inline = BinaryValue::from_locator("data:;base64,").unwrap();
        assert!(inline.is_inline());

        let external = BinaryValue::from_locator("/tmp/blob.bin").unwrap();
        assert!(!external.is_inline());
        assert_eq!(
            external.external_path(),
            Some(Path::new("/tmp/blob.bin"))
        );
    }

    #[test]
    fn test_external_file_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"external bytes").unwrap();
        drop(file);

        let payload = BinaryValue::from_file(&path);
        assert_eq!(payload.len().unwrap(), 14);
        assert_eq!(payload.bytes().unwrap(), b"external bytes");
        assert_eq!(payload.to_uri_string(), path.display().to_string());
    }
}
