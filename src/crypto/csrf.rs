use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// The size of the CSRF token in bytes.
const CSRF_TOKEN_SIZE: usize = 32;

/// Generates a new random CSRF token.
///
/// # Returns
///
/// A URL-safe base64-encoded CSRF token.
pub fn generate_csrf_token() -> String {
    let mut token = [0u8; CSRF_TOKEN_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// Compares a presented token against the session's stored token.
///
/// The comparison is constant-time over tokens of equal length; a length
/// mismatch short-circuits to `false` without revealing anything beyond the
/// length itself.
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_random_and_long_enough() {
        let t1 = generate_csrf_token();
        let t2 = generate_csrf_token();

        assert_ne!(t1, t2);
        // 32 bytes -> 43 chars of unpadded base64
        assert_eq!(t1.len(), 43);
    }

    #[test]
    fn matching_is_exact() {
        let token = generate_csrf_token();
        assert!(tokens_match(&token, &token));
        assert!(!tokens_match(&token, &generate_csrf_token()));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let token = generate_csrf_token();
        assert!(!tokens_match(&token, &token[..token.len() - 1]));
        assert!(!tokens_match(&token, ""));
    }
}
