use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the uncompressed body.
pub const SIGNATURE_HEADER: &str = "HashSHA256";

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Signs `body` with the shared key. The signature is computed over the
/// uncompressed payload, before any gzip framing is applied.
pub fn sign(key: &str, body: &[u8]) -> String {
    hex::encode(hmac_sha256(key.as_bytes(), body))
}

/// Verifies a hex signature against `body` in constant time.
pub fn verify(key: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
