use secrecy::SecretString;

/// Process-wide configuration, loaded once at startup and immutable for the
/// process lifetime.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub token_secret: SecretString,
    pub token_ttl_seconds: u64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_secret: SecretString, token_ttl_seconds: u64) -> Self {
        Self {
            token_secret,
            token_ttl_seconds,
        }
    }
}
