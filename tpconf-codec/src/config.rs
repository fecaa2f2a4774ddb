//! `config.bin` encoder and decoder
//!
//! Decoding: DES-ECB decrypt, pick the layout, infer byte order from its size
//! header (trying both orders when both are plausible), verify and unpack,
//! then turn the payload into text. Encoding always
//! writes the W9970 layout (digest + compressed stream, zero-padded to the DES
//! block size) and re-decodes its own output before returning it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tpconf_format::constants::{BLOCK_LEN, DIGEST_LEN};
use tpconf_format::{
    checksum, CipherFrame, ConfigFormat, Endianness, Limits, Result, TpconfError,
};

use crate::document::{canonical_text, decode_text, encode_text, Document};
use crate::lz;
use crate::registry;

/// Codec options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Skip hashing positions covered by a match (off in firmware-produced files)
    pub allow_overlap_insert: bool,
    /// Allocation limits
    pub limits: Limits,
}

/// Layout facts about a backup, without decoding its text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    /// Detected layout
    pub format: ConfigFormat,
    /// Inferred byte order
    pub endianness: Endianness,
    /// Length of the decrypted buffer
    pub decrypted_len: usize,
    /// Length of the unpacked payload
    pub payload_len: usize,
}

struct Unpacked {
    format: ConfigFormat,
    endianness: Endianness,
    decrypted_len: usize,
    payload: Vec<u8>,
}

/// Encoder/decoder for configuration backups
#[derive(Debug, Clone, Default)]
pub struct ConfigCodec {
    cipher: CipherFrame,
    options: CodecOptions,
}

impl ConfigCodec {
    /// Create a codec using the embedded key
    pub fn new(options: CodecOptions) -> Self {
        Self::with_cipher(CipherFrame::default(), options)
    }

    /// Create a codec with an explicit cipher frame
    pub fn with_cipher(cipher: CipherFrame, options: CodecOptions) -> Self {
        Self { cipher, options }
    }

    /// Options in effect
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Decode an encrypted backup
    pub fn decode(&self, raw: &[u8]) -> Result<Document> {
        let unpacked = self.unpack(raw)?;
        Ok(Document {
            xml: decode_text(unpacked.payload),
            endianness: unpacked.endianness,
            format: unpacked.format,
        })
    }

    /// Report layout facts about an encrypted backup
    pub fn inspect(&self, raw: &[u8]) -> Result<Inspection> {
        let unpacked = self.unpack(raw)?;
        Ok(Inspection {
            format: unpacked.format,
            endianness: unpacked.endianness,
            decrypted_len: unpacked.decrypted_len,
            payload_len: unpacked.payload.len(),
        })
    }

    /// Encode text as a W9970 backup in the given byte order
    pub fn encode(&self, xml: &str, endianness: Endianness) -> Result<Vec<u8>> {
        let text = encode_text(xml);
        if text.len() > self.options.limits.max_config_size {
            return Err(TpconfError::LimitExceeded(format!(
                "config is {} bytes, at most {} can be re-detected",
                text.len(),
                self.options.limits.max_config_size
            )));
        }

        let compressed = lz::compress(&text, endianness, self.options.allow_overlap_insert)?;
        let mut plain = checksum::prepend_digest(&compressed);
        plain.resize(plain.len().div_ceil(BLOCK_LEN) * BLOCK_LEN, 0);
        let raw = self.cipher.encrypt(&plain)?;
        debug!(
            text = text.len(),
            compressed = compressed.len(),
            encrypted = raw.len(),
            "encoded config"
        );

        self.check_round_trip(&raw, xml, endianness)?;
        Ok(raw)
    }

    /// Encode a document in its recorded byte order
    pub fn encode_document(&self, document: &Document) -> Result<Vec<u8>> {
        self.encode(&document.xml, document.endianness)
    }

    fn unpack(&self, raw: &[u8]) -> Result<Unpacked> {
        if raw.len() % BLOCK_LEN != 0 {
            return Err(TpconfError::InvalidSize(raw.len()));
        }

        let plain = self.cipher.decrypt(raw)?;
        if plain.is_empty() {
            return Err(TpconfError::DecryptionFailure(
                "decrypted output is empty".to_string(),
            ));
        }
        if plain.len() < DIGEST_LEN {
            return Err(TpconfError::DecryptionFailure(format!(
                "decrypted output is {} bytes, shorter than its digest",
                plain.len()
            )));
        }

        let descriptor = registry::detect(&plain)?;
        let (endianness, payload) = descriptor.unpack(&plain, &self.options.limits)?;
        debug!(format = %descriptor.format, %endianness, "unpacked layout");
        Ok(Unpacked {
            format: descriptor.format,
            endianness,
            decrypted_len: plain.len(),
            payload,
        })
    }

    fn check_round_trip(&self, raw: &[u8], xml: &str, endianness: Endianness) -> Result<()> {
        let decoded = self.decode(raw).map_err(|err| {
            debug!(error = %err, "encoded output does not decode");
            TpconfError::RoundTripMismatch("config")
        })?;
        if decoded.xml != canonical_text(xml) {
            return Err(TpconfError::RoundTripMismatch("XML"));
        }
        if decoded.endianness != endianness {
            return Err(TpconfError::RoundTripMismatch("endianness"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<DslCpeConfig>
  <InternetGatewayDevice>
    <DeviceInfo>
      <ManufacturerOUI val="001478" />
      <SerialNumber val="0000000000000" />
    </DeviceInfo>
    <LANDevice instance="1">
      <LANHostConfigManagement>
        <IPInterface instance="1">
          <IPInterfaceIPAddress val="192.168.1.1" />
          <IPInterfaceSubnetMask val="255.255.255.0" />
        </IPInterface>
      </LANHostConfigManagement>
    </LANDevice>
  </InternetGatewayDevice>
</DslCpeConfig>
"#;

    #[test]
    fn test_short_document_roundtrip() {
        let codec = ConfigCodec::default();
        let raw = codec.encode("<a/>", Endianness::Big).unwrap();
        assert_eq!(raw.len() % 8, 0);

        let document = codec.decode(&raw).unwrap();
        assert_eq!(document.xml, "<a/>\n");
        assert_eq!(document.endianness, Endianness::Big);
        assert_eq!(document.format, ConfigFormat::W9970);
    }

    #[test]
    fn test_sample_roundtrip_both_orders() {
        let codec = ConfigCodec::default();
        for endianness in [Endianness::Big, Endianness::Little] {
            let raw = codec.encode(SAMPLE, endianness).unwrap();
            let document = codec.decode(&raw).unwrap();
            assert_eq!(document.xml, SAMPLE);
            assert_eq!(document.endianness, endianness);
            assert_eq!(document.format, ConfigFormat::W9970);
        }
    }

    #[test]
    fn test_reencoding_decoded_document_is_stable() {
        let codec = ConfigCodec::default();
        let first = codec.encode(SAMPLE, Endianness::Little).unwrap();
        let document = codec.decode(&first).unwrap();
        let second = codec.encode_document(&document).unwrap();
        assert_eq!(first, second);
    }

    /// A document whose stored form, terminator included, is exactly `len` bytes
    fn document_of_len(len: usize) -> String {
        let mut xml = String::from("<?xml version=\"1.0\"?><DslCpeConfig>");
        let closing = "</DslCpeConfig>";
        let filler = len - 1 - xml.len() - closing.len();
        xml.push_str(&"<a/>".repeat(filler / 4));
        xml.push_str(&"b".repeat(filler % 4));
        xml.push_str(closing);
        assert_eq!(encode_text(&xml).len(), len);
        xml
    }

    #[test]
    fn test_little_endian_sizes_that_also_read_big_endian() {
        let codec = ConfigCodec::default();
        for len in [0x100, 0x200, 0x10000] {
            let xml = document_of_len(len);
            let raw = codec.encode(&xml, Endianness::Little).unwrap();

            let document = codec.decode(&raw).unwrap();
            assert_eq!(document.endianness, Endianness::Little, "{} byte document", len);
            assert_eq!(document.xml, canonical_text(&xml));
            assert_eq!(codec.inspect(&raw).unwrap().payload_len, len);
        }
    }

    #[test]
    fn test_big_endian_sizes_that_also_read_little_endian() {
        let codec = ConfigCodec::default();
        for len in [0x200, 0x10000, 0x20000] {
            let xml = document_of_len(len);
            let raw = codec.encode(&xml, Endianness::Big).unwrap();
            let document = codec.decode(&raw).unwrap();
            assert_eq!(document.endianness, Endianness::Big, "{} byte document", len);
            assert_eq!(document.xml, canonical_text(&xml));
        }
    }

    #[test]
    fn test_inspect() {
        let codec = ConfigCodec::default();
        let raw = codec.encode(SAMPLE, Endianness::Big).unwrap();
        let inspection = codec.inspect(&raw).unwrap();
        assert_eq!(inspection.format, ConfigFormat::W9970);
        assert_eq!(inspection.endianness, Endianness::Big);
        assert_eq!(inspection.decrypted_len, raw.len());
        assert_eq!(inspection.payload_len, SAMPLE.trim().len() + 1);
    }

    #[test]
    fn test_decode_rejects_unaligned_input() {
        let codec = ConfigCodec::default();
        assert!(matches!(
            codec.decode(&[0u8; 13]),
            Err(TpconfError::InvalidSize(13))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        let codec = ConfigCodec::default();
        assert!(matches!(
            codec.decode(&[]),
            Err(TpconfError::DecryptionFailure(_))
        ));
        assert!(matches!(
            codec.decode(&[0u8; 8]),
            Err(TpconfError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_decode_with_wrong_key() {
        let codec = ConfigCodec::default();
        let raw = codec.encode(SAMPLE, Endianness::Big).unwrap();

        let other = ConfigCodec::with_cipher(
            CipherFrame::new([1, 2, 3, 4, 5, 6, 7, 8]),
            CodecOptions::default(),
        );
        assert!(other.decode(&raw).is_err());
    }

    #[test]
    fn test_encode_size_limit() {
        let options = CodecOptions {
            limits: Limits {
                max_config_size: 16,
                ..Limits::default()
            },
            ..CodecOptions::default()
        };
        let codec = ConfigCodec::new(options);
        assert!(codec.encode("<short/>", Endianness::Big).is_ok());
        assert!(matches!(
            codec.encode("<a-much-longer-document/>", Endianness::Big),
            Err(TpconfError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_overlap_insert_option_roundtrips() {
        let codec = ConfigCodec::new(CodecOptions {
            allow_overlap_insert: true,
            ..CodecOptions::default()
        });
        let raw = codec.encode(SAMPLE, Endianness::Little).unwrap();
        assert_eq!(codec.decode(&raw).unwrap().xml, SAMPLE);
    }

    #[test]
    fn test_options_deserialize() {
        let options: CodecOptions =
            serde_json::from_str(r#"{"allow_overlap_insert": true}"#).unwrap();
        assert!(options.allow_overlap_insert);
        assert_eq!(options.limits, Limits::default());
    }
}
