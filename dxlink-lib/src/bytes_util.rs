//! Small byte helpers shared by every layer: base64 payload conversion, hex
//! formatting for logs and fixtures, and the link-error signature classifier.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::error::Result;

/// Lower-cased message fragments that identify a failure of the link itself.
const LINK_ERROR_SIGNATURES: &[&str] = &[
    "not connected",
    "disconnected",
    "gatt",
    "connection failed",
    "connection lost",
    "operation was cancelled",
];

/// Decode a base64 characteristic value as delivered by mobile BLE bridges.
pub fn base64_to_bytes(encoded: &str) -> Result<Bytes> {
    let decoded = STANDARD.decode(encoded.trim())?;
    Ok(Bytes::from(decoded))
}

pub fn bytes_to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Format bytes as space separated upper-case hex, e.g. `00 55 AA`.
pub fn format_hex(data: &[u8]) -> String {
    let encoded = hex::encode_upper(data);
    let mut out = String::with_capacity(encoded.len() + data.len());
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // hex output is pure ASCII
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }
    out
}

/// Parse hex text, tolerating whitespace, `:` separators and a `0x` prefix.
pub fn parse_hex(text: &str) -> Result<Bytes> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let cleaned: String = body.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    Ok(Bytes::from(hex::decode(cleaned)?))
}

/// Whether an error message carries a link-failure signature.
pub fn is_link_error_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    LINK_ERROR_SIGNATURES.iter().any(|signature| lowered.contains(signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip_of_characteristic_value() {
        let encoded = bytes_to_base64(&[0xC1, 0x0F]);
        assert_eq!(encoded, "wQ8=");
        assert_eq!(base64_to_bytes(" wQ8=\n").unwrap().as_ref(), &[0xC1, 0x0F]);
    }

    #[test]
    fn test_base64_rejects_garbage() {
        assert!(base64_to_bytes("not*base64").is_err());
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[]), "");
        assert_eq!(format_hex(&[0x00, 0x55, 0xaa]), "00 55 AA");
    }

    #[test]
    fn test_parse_hex_variants() {
        assert_eq!(parse_hex("0x0055aa").unwrap().as_ref(), &[0x00, 0x55, 0xAA]);
        assert_eq!(parse_hex("00 55 AA").unwrap().as_ref(), &[0x00, 0x55, 0xAA]);
        assert_eq!(parse_hex("00:55:aa").unwrap().as_ref(), &[0x00, 0x55, 0xAA]);
        assert!(parse_hex("0g").is_err());
    }

    #[test]
    fn test_link_error_classification() {
        assert!(is_link_error_message("Device 7C:DF:A1 is not connected"));
        assert!(is_link_error_message("Device was disconnected"));
        assert!(is_link_error_message("GATT_ERROR 133"));
        assert!(is_link_error_message("BleError: Connection failed"));
        assert!(is_link_error_message("Operation was cancelled"));
        assert!(!is_link_error_message("Characteristic not found"));
        assert!(!is_link_error_message("Value out of range"));
    }
}
