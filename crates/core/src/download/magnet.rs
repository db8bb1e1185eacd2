//! Magnet link and info hash parsing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("not a magnet link")]
    NotMagnet,

    #[error("magnet link has no urn:btih or urn:btmh topic")]
    MissingTopic,

    #[error("invalid info hash '{0}'")]
    InvalidHash(String),
}

const BTIH: &str = "urn:btih:";
const BTMH: &str = "urn:btmh:";
/// Multihash prefix for a 32-byte SHA-256 digest.
const SHA256_MULTIHASH: &str = "1220";

/// Info hash carried by a magnet link, as lowercase hex.
///
/// v1 hashes may be 40 hex or 32 base32 characters. v2 (`btmh`) hashes are
/// returned as the full multihash hex.
pub fn magnet_info_hash(link: &str) -> Result<String, LinkError> {
    let query = link
        .strip_prefix("magnet:?")
        .or_else(|| link.strip_prefix("magnet:"))
        .ok_or(LinkError::NotMagnet)?;

    let mut v2 = None;
    for param in query.split('&') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if !key.eq_ignore_ascii_case("xt") && !key.to_ascii_lowercase().starts_with("xt.") {
            continue;
        }
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());

        if let Some(hash) = strip_prefix_ignore_case(&value, BTIH) {
            return normalize_info_hash(hash).ok_or_else(|| LinkError::InvalidHash(hash.to_string()));
        }
        if let Some(hash) = strip_prefix_ignore_case(&value, BTMH) {
            v2 = Some(
                normalize_multihash(hash).ok_or_else(|| LinkError::InvalidHash(hash.to_string()))?,
            );
        }
    }

    v2.ok_or(LinkError::MissingTopic)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// Normalize a v1 info hash to 40 lowercase hex characters.
///
/// Accepts 40 hex characters or 32 base32 characters.
pub fn normalize_info_hash(raw: &str) -> Option<String> {
    let raw = raw.trim();
    match raw.len() {
        40 if raw.chars().all(|c| c.is_ascii_hexdigit()) => Some(raw.to_ascii_lowercase()),
        32 => base32_decode(raw).map(|bytes| to_hex(&bytes)),
        _ => None,
    }
}

fn normalize_multihash(raw: &str) -> Option<String> {
    let hash = raw.trim().to_ascii_lowercase();
    (hash.len() == SHA256_MULTIHASH.len() + 64
        && hash.starts_with(SHA256_MULTIHASH)
        && hash.chars().all(|c| c.is_ascii_hexdigit()))
    .then_some(hash)
}

/// RFC 4648 base32 without padding.
fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut bits: u64 = 0;
    let mut bit_count = 0;
    let mut out = Vec::with_capacity(input.len() * 5 / 8);

    for c in input.chars() {
        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u64 - 'A' as u64,
            c @ '2'..='7' => c as u64 - '2' as u64 + 26,
            _ => return None,
        };
        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
            bits &= (1 << bit_count) - 1;
        }
    }

    Some(out)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";
    // Same hash as HEX, base32 encoded
    const BASE32: &str = "YEX6DQDLXISUVHOJ6UM3GNNKPQJWPKEK";

    #[test]
    fn test_hex_hash() {
        let link = format!("magnet:?xt=urn:btih:{}&dn=Dune", HEX.to_uppercase());
        assert_eq!(magnet_info_hash(&link).unwrap(), HEX);
    }

    #[test]
    fn test_base32_hash() {
        let link = format!("magnet:?dn=Dune&xt=urn:btih:{}", BASE32);
        assert_eq!(magnet_info_hash(&link).unwrap(), HEX);
    }

    #[test]
    fn test_v2_hash() {
        let multihash = format!("1220{}", "ab".repeat(32));
        let link = format!("magnet:?xt=urn:btmh:{}", multihash);
        assert_eq!(magnet_info_hash(&link).unwrap(), multihash);
    }

    #[test]
    fn test_hybrid_prefers_v1() {
        let link = format!(
            "magnet:?xt=urn:btmh:1220{}&xt=urn:btih:{}",
            "cd".repeat(32),
            HEX
        );
        assert_eq!(magnet_info_hash(&link).unwrap(), HEX);
    }

    #[test]
    fn test_percent_encoded_topic() {
        let link = format!("magnet:?xt=urn%3Abtih%3A{}", HEX);
        assert_eq!(magnet_info_hash(&link).unwrap(), HEX);
    }

    #[test]
    fn test_errors() {
        assert_eq!(magnet_info_hash("http://x/1.torrent"), Err(LinkError::NotMagnet));
        assert_eq!(magnet_info_hash("magnet:?dn=Dune"), Err(LinkError::MissingTopic));
        assert_eq!(magnet_info_hash("magnet:?xt=urn:btih:"), Err(LinkError::InvalidHash(String::new())));
        assert!(matches!(
            magnet_info_hash("magnet:?xt=urn:btih:xyz"),
            Err(LinkError::InvalidHash(_))
        ));
        assert!(matches!(
            magnet_info_hash("magnet:?xt=urn:btmh:1220abc"),
            Err(LinkError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_normalize_info_hash() {
        assert_eq!(normalize_info_hash(HEX).as_deref(), Some(HEX));
        assert_eq!(normalize_info_hash(BASE32).as_deref(), Some(HEX));
        assert_eq!(normalize_info_hash("1234"), None);
        assert_eq!(normalize_info_hash(&"g".repeat(40)), None);
        assert_eq!(normalize_info_hash(&"1".repeat(32)), None);
    }
}
