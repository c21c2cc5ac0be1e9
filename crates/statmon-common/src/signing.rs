use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the HTTP header carrying the hex HMAC-SHA256 body signature.
pub const SIGNATURE_HEADER: &str = "HashSHA256";

/// HMAC-SHA256 request/response signer, applied symmetrically on both ends.
///
/// The signature is computed over the exact plaintext body bytes, before any
/// compression; the receiving side inflates first, then verifies.
///
/// # Examples
///
/// ```
/// use statmon_common::signing::Signer;
///
/// let signer = Signer::new("secret auth key");
/// let sig = signer.sign(b"{");
/// assert!(signer.verify(b"{", &sig));
/// assert!(!signer.verify(b"}", &sig));
/// ```
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.key).expect("HMAC key length")
    }

    /// Returns the lowercase hex digest of `HMAC-SHA256(key, body)`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies a presented hex signature in constant time.
    pub fn verify(&self, body: &[u8], signature_hex: &str) -> bool {
        let Ok(presented) = hex::decode(signature_hex) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(body);
        // Mac::verify_slice is a constant-time comparison
        mac.verify_slice(&presented).is_ok()
    }
}
