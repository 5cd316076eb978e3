use std::collections::BTreeMap;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::warn;

use crate::core::error::{InstallError, InstallResult};

/// Hex digest of `data` for a supported algorithm name.
pub fn digest_hex(algorithm: &str, data: &[u8]) -> Option<String> {
    let digest = match algorithm.to_ascii_lowercase().as_str() {
        "sha1" => hex::encode(Sha1::digest(data)),
        "sha256" => hex::encode(Sha256::digest(data)),
        "sha512" => hex::encode(Sha512::digest(data)),
        "md5" => hex::encode(Md5::digest(data)),
        _ => return None,
    };
    Some(digest)
}

/// Check `data` against every supported hash in `expected`.
///
/// Unknown algorithms are ignored; an empty or fully-unknown map verifies
/// trivially.
pub fn verify(label: &str, data: &[u8], expected: &BTreeMap<String, String>) -> InstallResult<()> {
    for (algorithm, want) in expected {
        let Some(actual) = digest_hex(algorithm, data) else {
            warn!("Ignoring unsupported {} hash for {}", algorithm, label);
            continue;
        };
        if !actual.eq_ignore_ascii_case(want) {
            return Err(InstallError::IntegrityCheckFailed {
                path: label.to_string(),
                algorithm: algorithm.clone(),
                expected: want.clone(),
                actual,
            });
        }
    }
    Ok(())
}

/// True when at least one supported hash is present and all of them match.
pub fn matches(data: &[u8], expected: &BTreeMap<String, String>) -> bool {
    let mut checked = false;
    for (algorithm, want) in expected {
        if let Some(actual) = digest_hex(algorithm, data) {
            if !actual.eq_ignore_ascii_case(want) {
                return false;
            }
            checked = true;
        }
    }
    checked
}
