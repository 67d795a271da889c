//! Secure random tokens for device tags and one-time passes.
//!
//! Both device tags and auto-login passes are 256-bit values drawn from
//! the operating system's CSPRNG and hex-encoded, so a token is a
//! 64-character lowercase string.

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::SessionError;

/// Number of random bytes in one token.
pub const TOKEN_BYTES: usize = 32;

/// Produces unguessable tokens.
///
/// The handshake treats a failure here like a transport failure: the
/// connection is closed and its slot released.
pub trait TokenSource: Send + Sync + 'static {
    /// Generates one fresh token.
    fn generate(&self) -> Result<String, SessionError>;
}

/// [`TokenSource`] backed by the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn generate(&self) -> Result<String, SessionError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;
        Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_os_token_is_64_hex_chars() {
        let token = OsTokenSource.generate().expect("os rng");
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_os_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..256)
            .map(|_| OsTokenSource.generate().expect("os rng"))
            .collect();
        assert_eq!(tokens.len(), 256);
    }
}
