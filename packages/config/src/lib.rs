// ABOUTME: Configuration crate shared by the sandbox and process packages
// ABOUTME: Exposes environment variable names and typed parsing helpers

pub mod constants;
pub mod env;

pub use env::{
    parse_env_or_default, parse_env_or_default_with_validation, parse_env_with_fallback,
    string_env_or_default,
};
