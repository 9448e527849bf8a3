// ABOUTME: Utility functions for validation and display
// ABOUTME: Provides endpoint URL validation and coin list formatting

use crate::ledger::Coin;
use anyhow::{bail, Result};

/// Validate an HTTP(S) endpoint URL passed on the command line
///
/// Checks that the URL:
/// - Is not empty
/// - Starts with "http://" or "https://"
/// - Has a host after the scheme
///
/// Trailing slashes are stripped so paths can be appended with `format!`.
///
/// # Errors
///
/// Returns an error with a helpful message if the URL is empty, uses another
/// scheme, or has no host.
///
/// # Examples
///
/// ```
/// # use shareledger_migrator::utils::validate_endpoint_url;
/// assert_eq!(
///     validate_endpoint_url("https://node.example:1317/").unwrap(),
///     "https://node.example:1317"
/// );
/// assert!(validate_endpoint_url("").is_err());
/// assert!(validate_endpoint_url("ftp://node.example").is_err());
/// ```
pub fn validate_endpoint_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        bail!("Endpoint URL cannot be empty");
    }

    let rest = match url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => bail!(
            "Invalid endpoint URL format.\n\
             Expected format: https://host[:port]\n\
             Got: {}",
            url
        ),
    };

    if rest.trim_matches('/').is_empty() {
        bail!(
            "Endpoint URL missing host.\n\
             Expected format: https://host[:port]"
        );
    }

    Ok(url.trim_end_matches('/').to_string())
}

/// Render coins the way the ledger CLI does: `1000nshr, 50other`
pub fn format_coins(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint_url_valid() {
        assert_eq!(
            validate_endpoint_url("https://explorer.example").unwrap(),
            "https://explorer.example"
        );
        assert_eq!(
            validate_endpoint_url("http://localhost:1317//").unwrap(),
            "http://localhost:1317"
        );
    }

    #[test]
    fn test_validate_endpoint_url_invalid() {
        assert!(validate_endpoint_url("").is_err());
        assert!(validate_endpoint_url("   ").is_err());
        assert!(validate_endpoint_url("localhost:1317").is_err());
        assert!(validate_endpoint_url("tcp://localhost:26657").is_err());
        assert!(validate_endpoint_url("https://").is_err());
    }

    #[test]
    fn test_format_coins() {
        let coins = vec![Coin::new("nshr", "1000"), Coin::new("other", "50")];
        assert_eq!(format_coins(&coins), "1000nshr, 50other");
        assert_eq!(format_coins(&[]), "");
    }
}
