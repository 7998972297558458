//! ============================================================================
//! Encryption Envelope - AES-256-GCM for uploaded content
//! ============================================================================
//! Encrypt-then-store: a random 12-byte nonce is prepended to the
//! ciphertext so the stored blob is self-contained. The secret is a
//! 64-hex-char (32-byte) key supplied by the caller; it never leaves the
//! process.
//! ============================================================================

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{anyhow, bail, Context, Result};
use rand::RngCore;

/// Nonce length for AES-GCM, prepended to every sealed blob.
pub const NONCE_LEN: usize = 12;

fn cipher_from_hex(secret: &str) -> Result<Aes256Gcm> {
    let key_bytes = hex::decode(secret).context("encryption secret must be hex")?;
    if key_bytes.len() != 32 {
        bail!("encryption secret must be 32 bytes, got {}", key_bytes.len());
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes)))
}

/// Encrypt `plaintext` under the hex secret; output is nonce || ciphertext.
pub fn seal(secret: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_from_hex(secret)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| anyhow!("encryption failed"))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a nonce-prefixed blob produced by [`seal`].
pub fn open(secret: &str, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        bail!("sealed data too short: {} bytes", sealed.len());
    }
    let cipher = cipher_from_hex(secret)?;
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| anyhow!("decryption failed: wrong secret or corrupted data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_seal_open() {
        let sealed = seal(SECRET, b"manifest contents").unwrap();
        assert_ne!(&sealed[NONCE_LEN..], b"manifest contents");
        assert_eq!(open(SECRET, &sealed).unwrap(), b"manifest contents");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let a = seal(SECRET, b"same input").unwrap();
        let b = seal(SECRET, b"same input").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let sealed = seal(SECRET, b"manifest contents").unwrap();
        let other = "ff0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1eff";
        assert!(open(other, &sealed).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut sealed = seal(SECRET, b"manifest contents").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(SECRET, &sealed).is_err());
    }

    #[test]
    fn test_rejects_bad_secret() {
        assert!(seal("not-hex", b"x").is_err());
        assert!(seal("abcd", b"x").is_err()); // 2 bytes, not 32
    }

    #[test]
    fn test_rejects_truncated_blob() {
        assert!(open(SECRET, &[0u8; 4]).is_err());
    }
}
