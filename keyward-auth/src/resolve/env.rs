//! Environment variable lookup.

use std::collections::HashMap;

/// Variable carrying a user OAuth token.
pub const USER_AUTH_VAR: &str = "KNOX_USER_AUTH";
/// Variable enabling machine (TLS certificate) authentication.
pub const MACHINE_AUTH_VAR: &str = "KNOX_MACHINE_AUTH";
/// Variable carrying a service identity.
pub const SERVICE_AUTH_VAR: &str = "KNOX_SERVICE_AUTH";

/// Source of environment variables.
///
/// Implemented for the process environment and for plain maps, which keeps
/// resolution testable without mutating global state.
pub trait Environment: Send + Sync {
    /// Look up a variable. Unset and non-unicode variables are `None`.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
