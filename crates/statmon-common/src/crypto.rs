use std::path::Path;

use anyhow::{bail, Context, Result};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

// OAEP overhead per chunk: 2 * hash_len + 2
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// RSA-OAEP-SHA256 payload encryptor holding the recipient's public key.
///
/// Payloads larger than one modulus are split into chunks; the ciphertext is
/// the concatenation of the per-chunk encryptions, each exactly one modulus
/// wide, so the receiving side can re-chunk without a length prefix.
pub struct Encryptor {
    key: RsaPublicKey,
}

impl Encryptor {
    /// Loads a PKCS#8 (SPKI) PEM public key file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path)
            .with_context(|| format!("read public key {}", path.display()))?;
        let key = RsaPublicKey::from_public_key_pem(&pem)
            .with_context(|| format!("parse public key {}", path.display()))?;
        Ok(Self { key })
    }

    pub fn new(key: RsaPublicKey) -> Self {
        Self { key }
    }

    pub fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let modulus = self.key.size();
        let chunk_len = modulus
            .checked_sub(OAEP_OVERHEAD)
            .context("RSA key too small for OAEP-SHA256")?;
        let mut rng = rand::thread_rng();
        let mut out = Vec::with_capacity(plain.len().div_ceil(chunk_len.max(1)) * modulus);
        for chunk in plain.chunks(chunk_len) {
            let sealed = self
                .key
                .encrypt(&mut rng, Oaep::new::<Sha256>(), chunk)
                .context("RSA encrypt")?;
            out.extend_from_slice(&sealed);
        }
        Ok(out)
    }
}

/// RSA-OAEP-SHA256 payload decryptor holding the server's private key.
pub struct Decryptor {
    key: RsaPrivateKey,
}

impl Decryptor {
    /// Loads a PKCS#8 PEM private key file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path)
            .with_context(|| format!("read private key {}", path.display()))?;
        let key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .with_context(|| format!("parse private key {}", path.display()))?;
        Ok(Self { key })
    }

    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        let modulus = self.key.size();
        if sealed.is_empty() || sealed.len() % modulus != 0 {
            bail!(
                "ciphertext length {} is not a multiple of the {modulus}-byte modulus",
                sealed.len()
            );
        }
        let mut out = Vec::with_capacity(sealed.len());
        for chunk in sealed.chunks(modulus) {
            let plain = self
                .key
                .decrypt(Oaep::new::<Sha256>(), chunk)
                .context("RSA decrypt")?;
            out.extend_from_slice(&plain);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (Encryptor, Decryptor) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        (Encryptor::new(public), Decryptor::new(private))
    }

    #[test]
    fn round_trip_small_and_multi_chunk() {
        let (enc, dec) = keypair();

        let small = br#"{"id":"Alloc","type":"gauge","value":1.0}"#.to_vec();
        assert_eq!(dec.decrypt(&enc.encrypt(&small).unwrap()).unwrap(), small);

        // Larger than one 2048-bit OAEP chunk (190 bytes) forces chunking.
        let big: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        let sealed = enc.encrypt(&big).unwrap();
        assert_eq!(sealed.len() % 256, 0);
        assert!(sealed.len() > 256);
        assert_eq!(dec.decrypt(&sealed).unwrap(), big);
    }

    #[test]
    fn decrypt_rejects_truncated_ciphertext() {
        let (enc, dec) = keypair();
        let sealed = enc.encrypt(b"payload").unwrap();
        assert!(dec.decrypt(&sealed[..sealed.len() - 1]).is_err());
        assert!(dec.decrypt(&[]).is_err());
    }
}
