// ABOUTME: Environment variable parsing utilities
// ABOUTME: Typed lookups with defaults, validation and legacy fallbacks

use std::str::FromStr;

/// Parse an environment variable, falling back to `default` when it is unset or unparseable
pub fn parse_env_or_default<T>(var_name: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse an environment variable and keep it only if `validator` accepts it.
/// Set-but-rejected values are logged so misconfiguration is visible.
pub fn parse_env_or_default_with_validation<T, F>(var_name: &str, default: T, validator: F) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(T) -> bool,
{
    let Ok(raw_value) = std::env::var(var_name) else {
        return default;
    };

    match raw_value.trim().parse::<T>() {
        Ok(parsed) if validator(parsed) => parsed,
        Ok(_) => {
            tracing::warn!(
                "Environment variable {} has invalid value '{}', using default: {}",
                var_name,
                raw_value,
                default
            );
            default
        }
        Err(_) => {
            tracing::warn!(
                "Environment variable {} has unparseable value '{}', using default: {}",
                var_name,
                raw_value,
                default
            );
            default
        }
    }
}

/// Parse `primary_var`, then `fallback_var`, then use `default`.
/// A variable that is set but blank counts as unset.
pub fn parse_env_with_fallback<T>(primary_var: &str, fallback_var: &str, default: T) -> T
where
    T: FromStr,
{
    let non_blank = |var_name: &str| {
        std::env::var(var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
    };

    non_blank(primary_var)
        .or_else(|| non_blank(fallback_var))
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Read a string variable; unset or blank values yield `default`
pub fn string_env_or_default(var_name: &str, default: &str) -> String {
    match std::env::var(var_name) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}
