//! Helpers for reading typed settings from environment variables.
//!
//! Every binary calls `dotenvy::dotenv().ok()` first, so values may also
//! come from a `.env` file. A variable that is unset (or empty) falls back
//! to its default; a variable that is set but does not parse is an error
//! naming the variable.

use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Read `var`, returning `None` when it is unset or blank.
pub fn env_opt(var: &'static str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read `var`, failing with [`ConfigError::Missing`] when it is unset.
pub fn env_required(var: &'static str) -> Result<String, ConfigError> {
    env_opt(var).ok_or(ConfigError::Missing { var })
}

/// Read and parse `var`, using `default` when it is unset.
pub fn env_parse<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(var) {
        Some(value) => parse_value(var, &value),
        None => Ok(default),
    }
}

/// Parse a boolean flag: `1/true/yes/on` or `0/false/no/off`.
pub fn env_flag(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_opt(var) {
        Some(value) => parse_flag(var, &value),
        None => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_value_accepts_numbers() {
        let n: u64 = parse_value("TEST_VAR", "512000").unwrap();
        assert_eq!(n, 512_000);
    }

    #[test]
    fn parse_value_names_the_variable() {
        let err = parse_value::<u64>("INGEST_TARGET_BYTES", "lots").unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "INGEST_TARGET_BYTES", .. });
        assert!(err.to_string().contains("'lots'"));
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("F", "TRUE").unwrap());
        assert!(parse_flag("F", "yes").unwrap());
        assert!(!parse_flag("F", "0").unwrap());
        assert!(!parse_flag("F", "Off").unwrap());
        assert!(parse_flag("F", "maybe").is_err());
    }

    #[test]
    fn unset_variable_uses_default() {
        let v: u32 = env_parse("TAGTALLY_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(v, 7);
        assert!(!env_flag("TAGTALLY_TEST_SURELY_UNSET_VAR", false).unwrap());
        assert_matches!(
            env_required("TAGTALLY_TEST_SURELY_UNSET_VAR"),
            Err(ConfigError::Missing { .. })
        );
    }
}
