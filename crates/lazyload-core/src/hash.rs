use xxhash_rust::xxh64::xxh64;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode a u64 value as a base62 string (11 chars, zero-padded).
fn base62_encode(mut value: u64) -> String {
    if value == 0 {
        return "0".repeat(11);
    }
    let mut result = Vec::with_capacity(11);
    while value > 0 {
        let idx = (value % 62) as usize;
        result.push(BASE62_CHARS[idx]);
        value /= 62;
    }
    // Pad to 11 chars
    while result.len() < 11 {
        result.push(b'0');
    }
    result.reverse();
    String::from_utf8(result).expect("base62 chars are valid UTF-8")
}

/// Compute the content checksum for a file.
///
/// checksum = base62(xxhash64(raw bytes))
///
/// Re-indexing is gated on this value: an unchanged checksum means the file
/// is skipped without re-parsing.
pub fn content_checksum(bytes: &[u8]) -> String {
    base62_encode(xxh64(bytes, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_checksum() {
        let h1 = content_checksum(b"export function greet() {}");
        let h2 = content_checksum(b"export function greet() {}");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_checksum_length() {
        assert_eq!(content_checksum(b"").len(), 11);
        assert_eq!(content_checksum(b"x").len(), 11);
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let h1 = content_checksum(b"const a = 1;");
        let h2 = content_checksum(b"const a = 2;");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_base62_encoding() {
        let encoded = base62_encode(0);
        assert_eq!(encoded.len(), 11);
        assert!(encoded.chars().all(|c| c == '0'));

        let encoded = base62_encode(1);
        assert_eq!(encoded.len(), 11);
    }
}
