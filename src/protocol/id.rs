//! Prefixed opaque identifiers for protocol messages.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 12;

fn generate(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}_{}", prefix, suffix)
}

/// New proposal id (`prop_<12-char opaque>`)
pub fn proposal_id() -> String {
    generate("prop")
}

/// New decision id (`dec_<12-char opaque>`)
pub fn decision_id() -> String {
    generate("dec")
}

/// New authorization id (`auth_<12-char opaque>`)
pub fn authorization_id() -> String {
    generate("auth")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_prefixes() {
        assert!(proposal_id().starts_with("prop_"));
        assert!(decision_id().starts_with("dec_"));
        assert!(authorization_id().starts_with("auth_"));
    }

    #[test]
    fn test_id_shape() {
        let id = proposal_id();
        let suffix = id.strip_prefix("prop_").unwrap();
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = decision_id();
        let b = decision_id();
        assert_ne!(a, b);
    }
}
