use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed stripe-signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("signature does not match payload")]
    NoMatch,
    #[error("invalid webhook secret")]
    InvalidSecret,
}

/// Verifies a `stripe-signature` header against the raw request body.
///
/// The header carries a unix timestamp and one or more `v1` HMAC-SHA256
/// signatures over `"{timestamp}.{body}"`. Verification fails if no `v1`
/// candidate matches or the timestamp is older than `tolerance_secs`.
pub fn verify(
    header: &str,
    payload: &[u8],
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let (timestamp_raw, candidates) = parse_header(header)?;

    let timestamp: i64 = timestamp_raw
        .parse()
        .map_err(|_| SignatureError::Malformed)?;
    if Utc::now().timestamp() - timestamp > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp_raw.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if candidates
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
    {
        Ok(())
    } else {
        Err(SignatureError::NoMatch)
    }
}

fn parse_header(header: &str) -> Result<(&str, Vec<&str>), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for item in header.split(',') {
        let Some((key, value)) = item.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => candidates.push(value),
            // older scheme versions (v0) are ignored
            _ => {}
        }
    }

    match (timestamp, candidates.is_empty()) {
        (Some(timestamp), false) => Ok((timestamp, candidates)),
        _ => Err(SignatureError::Malformed),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
