use std::io::Read;

use axum::http::HeaderMap;
use flate2::read::GzDecoder;
use metrio_common::error::{MetrioError, Result};
use metrio_common::sign;

fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get("Content-Encoding")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("gzip"))
}

/// Prepares a request body for decoding: gunzips when the client says so,
/// then checks the `HashSHA256` signature over the uncompressed bytes when
/// a key is configured. A configured key makes the signature mandatory.
pub fn decode_body(headers: &HeaderMap, body: &[u8], key: Option<&str>) -> Result<Vec<u8>> {
    let body = if is_gzip(headers) {
        let mut decompressed = Vec::new();
        GzDecoder::new(body)
            .read_to_end(&mut decompressed)
            .map_err(|err| MetrioError::Decode(format!("gzip body: {err}")))?;
        decompressed
    } else {
        body.to_vec()
    };

    if let Some(key) = key {
        let signature = headers
            .get(sign::SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(MetrioError::SignatureMismatch)?;
        if !sign::verify(key, &body, signature) {
            return Err(MetrioError::SignatureMismatch);
        }
    }

    Ok(body)
}
