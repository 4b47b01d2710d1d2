//! # Environment Variables
//!
//! Utilities for reading and parsing environment variables.

use std::env;
use std::str::FromStr;

/// Get an environment variable by name.
///
/// Empty values are treated as missing.
pub fn get_env(name: &'static str) -> Result<String, Error> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingEnv(name))
}

/// Get an environment variable, falling back to `default` when unset.
pub fn get_env_or(name: &'static str, default: &str) -> String {
    get_env(name).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable.
pub fn get_env_parse<T: FromStr>(name: &'static str) -> Result<T, Error> {
    let val = get_env(name)?;
    val.trim().parse::<T>().map_err(|_| Error::WrongFormat(name))
}

/// Parse an environment variable, using `default` only when it is unset.
///
/// A value that is present but malformed is still an error.
pub fn get_env_parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, Error> {
    match get_env_parse(name) {
        Err(Error::MissingEnv(_)) => Ok(default),
        other => other,
    }
}

/// Read a comma-separated list. Blank items are dropped; unset yields `None`.
pub fn get_env_list(name: &'static str) -> Option<Vec<String>> {
    get_env(name).ok().map(|raw| split_list(&raw))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// region:    --- Error
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    MissingEnv(&'static str),
    WrongFormat(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::MissingEnv(name) => write!(fmt, "{name} must be set"),
            Error::WrongFormat(name) => write!(fmt, "{name} has an invalid format"),
        }
    }
}

impl std::error::Error for Error {}
// endregion: --- Error

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(
            split_list(" https://a , ,https://b,"),
            vec!["https://a".to_string(), "https://b".to_string()]
        );
    }

    #[test]
    fn test_missing_env_uses_default() {
        let v: u64 = get_env_parse_or("LIB_UTILS_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(v, 42);
        assert_eq!(get_env_or("LIB_UTILS_TEST_SURELY_UNSET", "x"), "x");
    }
}
