//! AES-256-GCM envelope seal/open
//!
//! Envelope layout, bit-exact:
//!
//! ```text
//! offset 0   : 12-byte random nonce
//! offset 12  : ciphertext (len == plaintext len)
//! offset end : 16-byte GCM tag
//! ```
//!
//! A fresh nonce is drawn from the OS RNG for every encryption. Empty
//! plaintext is valid and yields a 28-byte envelope of nonce ‖ tag.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;
use crate::keys::KEY_LEN;
use crate::Result;

/// Nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Fixed envelope overhead: `len(envelope) == len(plaintext) + OVERHEAD`
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Seal `plaintext` into an envelope under a 32-byte key
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = build_cipher(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    // aes-gcm appends the tag to the ciphertext, which is exactly the
    // envelope tail we need
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM encryption failed: {}", e)))?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&sealed);
    Ok(envelope)
}

/// Open an envelope, returning the plaintext
///
/// Fails with [`CryptoError::CorruptedEnvelope`] if the envelope is shorter
/// than nonce + tag or if tag verification fails.
pub fn decrypt(key: &[u8], envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < OVERHEAD {
        return Err(CryptoError::CorruptedEnvelope(format!(
            "envelope too short: {} bytes",
            envelope.len()
        )));
    }

    let cipher = build_cipher(key)?;
    let (nonce, sealed) = envelope.split_at(NONCE_LEN);

    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::CorruptedEnvelope("tag verification failed".to_string()))
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm> {
    let key: &[u8; KEY_LEN] = key.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, key.len()))
    })?;
    Ok(Aes256Gcm::new(key.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        let mut k = [0u8; 32];
        OsRng.fill_bytes(&mut k);
        k
    }

    #[test]
    fn test_roundtrip() {
        let k = key();
        let plaintext = b"hello clipboard";

        let envelope = encrypt(&k, plaintext).unwrap();
        let opened = decrypt(&k, &envelope).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_envelope_size_is_plaintext_plus_overhead() {
        let k = key();
        for len in [0usize, 1, 13, 255, 4096] {
            let plaintext = vec![0xA5u8; len];
            let envelope = encrypt(&k, &plaintext).unwrap();
            assert_eq!(envelope.len(), len + OVERHEAD, "len={}", len);
        }
    }

    #[test]
    fn test_empty_plaintext_yields_28_byte_envelope() {
        let k = key();
        let envelope = encrypt(&k, b"").unwrap();
        assert_eq!(envelope.len(), OVERHEAD);
        assert_eq!(decrypt(&k, &envelope).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_tampering_any_bit_fails() {
        let k = key();
        let envelope = encrypt(&k, b"tamper target").unwrap();

        // Flip one bit in every byte position: nonce, ciphertext, and tag
        // regions must all be covered by authentication.
        for pos in 0..envelope.len() {
            let mut bent = envelope.clone();
            bent[pos] ^= 0x01;
            assert!(
                decrypt(&k, &bent).is_err(),
                "bit flip at byte {} was not detected",
                pos
            );
        }
    }

    #[test]
    fn test_truncated_envelope_rejected() {
        let k = key();
        for len in 0..OVERHEAD {
            let short = vec![0u8; len];
            match decrypt(&k, &short) {
                Err(CryptoError::CorruptedEnvelope(_)) => {}
                other => panic!("expected CorruptedEnvelope for len {}, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let k1 = key();
        let k2 = key();
        let envelope = encrypt(&k1, b"secret").unwrap();
        assert!(decrypt(&k2, &envelope).is_err());
    }

    #[test]
    fn test_bad_key_length_rejected() {
        assert!(matches!(
            encrypt(&[0u8; 16], b"x"),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            decrypt(&[0u8; 31], &[0u8; 64]),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_nonce_uniqueness() {
        use std::collections::HashSet;

        let k = key();
        let mut seen = HashSet::new();
        for _ in 0..4096 {
            let envelope = encrypt(&k, b"n").unwrap();
            let nonce: [u8; NONCE_LEN] = envelope[..NONCE_LEN].try_into().unwrap();
            assert!(seen.insert(nonce), "nonce reused");
        }
    }
}
