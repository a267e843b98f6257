//! Room-key generation, decoding, and base64 helpers
//!
//! A room key is 32 bytes of OS randomness, stored and exchanged as
//! standard base64. [`RoomKey`] wipes itself from memory on drop.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::Result;

/// Room key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// A decoded 256-bit room key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RoomKey([u8; KEY_LEN]);

impl RoomKey {
    /// Decode a base64-encoded room key, enforcing the 32-byte length
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = from_base64(encoded)?;
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidKey(format!("{} bytes", v.len())))?;
        Ok(Self(arr))
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 encoding of the key
    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }
}

impl std::fmt::Debug for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RoomKey").field(&"<REDACTED>").finish()
    }
}

/// Generate a fresh random 32-byte key, base64-encoded
pub fn generate_key_base64() -> String {
    RoomKey::generate().to_base64()
}

/// Decode a base64 key into raw bytes, enforcing the 32-byte length
pub fn decode_key(encoded: &str) -> Result<Vec<u8>> {
    let bytes = from_base64(encoded)?;
    if bytes.len() != KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "expected {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Standard base64 encode
pub fn to_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Standard base64 decode
pub fn from_base64(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::InvalidBase64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_decodes_to_32_bytes() {
        let encoded = generate_key_base64();
        let key = decode_key(&encoded).unwrap();
        assert_eq!(key.len(), KEY_LEN);
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_key_base64(), generate_key_base64());
    }

    #[test]
    fn test_base64_roundtrip() {
        let data = b"\x00\x01\xFEclipferry\xFF";
        let encoded = to_base64(data);
        assert_eq!(from_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_decode_key_wrong_length() {
        let short = to_base64(&[7u8; 16]);
        assert!(matches!(
            decode_key(&short),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_decode_key_bad_base64() {
        assert!(matches!(
            decode_key("not*base64!"),
            Err(CryptoError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_room_key_from_base64_roundtrip() {
        let key = RoomKey::generate();
        let restored = RoomKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
    }

    #[test]
    fn test_room_key_debug_redacted() {
        let key = RoomKey::generate();
        let printed = format!("{:?}", key);
        assert!(printed.contains("REDACTED"));
    }
}
