use std::io::{Read, Write};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Gzip-compresses a payload for transport (`Content-Encoding: gzip`).
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).context("gzip write")?;
    encoder.finish().context("gzip finish")
}

/// Inflates a gzip payload received from the wire.
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).context("gzip inflate")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip() {
        let body = br#"[{"id":"Alloc","type":"gauge","value":5.0}]"#;
        let packed = gzip(body).unwrap();
        assert_ne!(packed, body.to_vec());
        assert_eq!(gunzip(&packed).unwrap(), body.to_vec());
    }

    #[test]
    fn gunzip_rejects_garbage() {
        assert!(gunzip(b"definitely not gzip").is_err());
    }
}
