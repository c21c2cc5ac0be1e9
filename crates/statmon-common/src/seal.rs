use anyhow::Result;

use crate::compress;
use crate::crypto::Encryptor;
use crate::signing::Signer;

/// A request body prepared for the wire, with the transport metadata the
/// sender must attach as headers.
pub struct Sealed {
    pub body: Vec<u8>,
    /// Hex HMAC signature for the `HashSHA256` header, when signing is on.
    pub signature: Option<String>,
    /// Whether `Content-Encoding: gzip` applies to `body`.
    pub gzipped: bool,
}

/// Agent-side payload sealer. Applies, in order: RSA encryption (optional),
/// HMAC signing over the exact pre-compression bytes (optional), then gzip
/// (optional). The server opens in the symmetric order: inflate, verify,
/// decrypt.
pub struct Sealer {
    pub signer: Option<Signer>,
    pub encryptor: Option<Encryptor>,
    pub gzip: bool,
}

impl Sealer {
    pub fn seal(&self, plain: &[u8]) -> Result<Sealed> {
        let body = match &self.encryptor {
            Some(enc) => enc.encrypt(plain)?,
            None => plain.to_vec(),
        };
        let signature = self.signer.as_ref().map(|s| s.sign(&body));
        let (body, gzipped) = if self.gzip {
            (compress::gzip(&body)?, true)
        } else {
            (body, false)
        };
        Ok(Sealed {
            body,
            signature,
            gzipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_covers_pre_compression_bytes() {
        let sealer = Sealer {
            signer: Some(Signer::new("secret auth key")),
            encryptor: None,
            gzip: true,
        };
        let plain = br#"[{"id":"PollCount","type":"counter","delta":1}]"#;
        let sealed = sealer.seal(plain).unwrap();

        assert!(sealed.gzipped);
        let inflated = compress::gunzip(&sealed.body).unwrap();
        assert_eq!(inflated, plain.to_vec());

        let signer = Signer::new("secret auth key");
        assert!(signer.verify(&inflated, sealed.signature.as_deref().unwrap()));
        // The compressed bytes are explicitly NOT what is signed.
        assert!(!signer.verify(&sealed.body, sealed.signature.as_deref().unwrap()));
    }

    #[test]
    fn plain_seal_is_passthrough() {
        let sealer = Sealer {
            signer: None,
            encryptor: None,
            gzip: false,
        };
        let sealed = sealer.seal(b"body").unwrap();
        assert_eq!(sealed.body, b"body".to_vec());
        assert!(sealed.signature.is_none());
        assert!(!sealed.gzipped);
    }
}
