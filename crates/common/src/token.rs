use rand::Rng;

const TOKEN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated webhook tokens.
pub const WEBHOOK_TOKEN_LEN: usize = 32;

/// Generate a random alphanumeric token used to authenticate inbound
/// webhooks for a single connection.
#[must_use]
pub fn generate_webhook_token() -> String {
    generate_token(WEBHOOK_TOKEN_LEN)
}

/// Generate a random alphanumeric token of the given length.
#[must_use]
pub fn generate_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..TOKEN_CHARS.len());
            TOKEN_CHARS[idx] as char
        })
        .collect()
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_requested_length() {
        assert_eq!(generate_token(32).len(), 32);
        assert_eq!(generate_token(8).len(), 8);
    }

    #[test]
    fn token_is_alphanumeric() {
        let token = generate_webhook_token();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_are_unique() {
        let a = generate_webhook_token();
        let b = generate_webhook_token();
        assert_ne!(a, b);
    }
}
