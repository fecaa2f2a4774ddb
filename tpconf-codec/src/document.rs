//! Decoded documents and their interchange views

use serde::{Deserialize, Serialize};

use tpconf_format::{ConfigFormat, Endianness, Result};

/// A decoded configuration backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Configuration text, normally an XML document
    pub xml: String,
    /// Byte order the backup was written with
    pub endianness: Endianness,
    /// Layout the backup was read from; encoding always writes W9970
    pub format: ConfigFormat,
}

impl Document {
    /// Create a document destined for encoding
    pub fn new(xml: impl Into<String>, endianness: Endianness) -> Self {
        Self {
            xml: xml.into(),
            endianness,
            format: ConfigFormat::W9970,
        }
    }

    /// Interchange view of this document
    pub fn to_view(&self) -> DocumentView {
        DocumentView {
            xml: self.xml.clone(),
            little_endian: self.endianness.is_little(),
            format: self.format.name().to_string(),
        }
    }
}

/// `{ xml, littleEndian, format }` as handed to editors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    /// Configuration text
    pub xml: String,
    /// Whether the backup is little-endian
    pub little_endian: bool,
    /// Display name of the source layout
    pub format: String,
}

impl DocumentView {
    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `{ xml, littleEndian }` as received from editors for export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Configuration text
    pub xml: String,
    /// Whether to write a little-endian backup
    #[serde(default)]
    pub little_endian: bool,
}

impl ExportRequest {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Document to encode
    pub fn into_document(self) -> Document {
        Document::new(self.xml, Endianness::from_little_endian(self.little_endian))
    }
}

/// Normalize text for encoding: trim surrounding whitespace and end with exactly one NUL
pub fn encode_text(xml: &str) -> Vec<u8> {
    let trimmed = xml.trim();
    let mut bytes = Vec::with_capacity(trimmed.len() + 1);
    bytes.extend_from_slice(trimmed.as_bytes());
    if bytes.last() != Some(&0) {
        bytes.push(0);
    }
    bytes
}

/// Turn an extracted payload into text, replacing a trailing NUL with a line feed
pub fn decode_text(mut bytes: Vec<u8>) -> String {
    if let Some(last) = bytes.last_mut() {
        if *last == 0 {
            *last = b'\n';
        }
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Text that decoding an encoding of `xml` yields
pub fn canonical_text(xml: &str) -> String {
    decode_text(encode_text(xml))
}
