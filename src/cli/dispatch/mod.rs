use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::gardi::errors::AuthError;
use anyhow::Result;
use secrecy::SecretString;

/// Map parsed arguments to an action plus global configuration.
///
/// # Errors
/// Returns an error when the token secret is blank; an unsigned credential
/// engine is a startup failure, not a per-request one.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let secret = matches
        .get_one::<String>("token-secret")
        .map(String::as_str)
        .unwrap_or_default();

    if secret.trim().is_empty() {
        return Err(AuthError::Configuration("token secret is empty or unset".to_string()).into());
    }

    let globals = GlobalArgs::new(
        SecretString::from(secret.to_string()),
        matches.get_one::<u64>("token-ttl").copied().unwrap_or(1800),
    );

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
    };

    Ok((action, globals))
}
