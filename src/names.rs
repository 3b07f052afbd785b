//! YANG identifier validation and utilities
//!
//! This module validates identifiers used for schema node names, module
//! names and feature names, and splits prefixed identifiers.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// identifier = (ALPHA / "_") *(ALPHA / DIGIT / "_" / "-" / ".")
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

/// Check if a string is a valid YANG identifier
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Check if a string is a valid prefixed identifier (`prefix:name` or `name`)
pub fn is_valid_prefixed(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_identifier(prefix) && is_valid_identifier(local),
        None => is_valid_identifier(name),
    }
}

/// Validate a YANG identifier and return an error if invalid
pub fn validate_identifier(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("invalid identifier: '{}'", name)))
    }
}

/// Split a prefixed identifier into prefix and local name
pub fn split_prefixed(name: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = name.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("interface"));
        assert!(is_valid_identifier("ip-address"));
        assert!(is_valid_identifier("_hidden"));
        assert!(is_valid_identifier("v4.addr"));
        assert!(is_valid_identifier("eth0"));

        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("0eth"));
        assert!(!is_valid_identifier("-name"));
        assert!(!is_valid_identifier("a b"));
        assert!(!is_valid_identifier("if:name"));
    }

    #[test]
    fn test_is_valid_prefixed() {
        assert!(is_valid_prefixed("name"));
        assert!(is_valid_prefixed("if:name"));

        assert!(!is_valid_prefixed(":name"));
        assert!(!is_valid_prefixed("if:"));
    }

    #[test]
    fn test_split_prefixed() {
        assert_eq!(split_prefixed("name"), (None, "name"));
        assert_eq!(split_prefixed("if:name"), (Some("if"), "name"));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("mtu").is_ok());
        assert!(validate_identifier("123").is_err());
    }
}
