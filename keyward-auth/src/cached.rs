//! Cached user token written by the login flow.
//!
//! `knox login` stores the OAuth token response as JSON in the user's home
//! directory. This crate only ever reads it.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name of the cached token, relative to the home directory.
pub const CACHED_TOKEN_FILE: &str = ".knox_user_auth";

/// Errors that can occur while loading the cached token.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CachedTokenError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// OAuth token response as persisted by the login flow.
#[derive(Clone, Default, Deserialize)]
pub struct CachedUserToken {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub error: String,
}

impl CachedUserToken {
    /// Parse the JSON record.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Read and parse the record at `path`.
    pub fn load(path: &Path) -> Result<Self, CachedTokenError> {
        let bytes = std::fs::read(path).map_err(|source| CachedTokenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&bytes).map_err(|source| CachedTokenError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Debug for CachedUserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedUserToken")
            .field("access_token_len", &self.access_token.len())
            .field("error", &self.error)
            .finish()
    }
}

/// Location of the cached token for the current user, if a home directory is known.
pub fn default_cached_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CACHED_TOKEN_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let token =
            CachedUserToken::from_json(br#"{"access_token":"abc123","error":""}"#).unwrap();
        assert_eq!(token.access_token, "abc123");
        assert!(token.error.is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let token = CachedUserToken::from_json(br#"{"access_token":"abc123"}"#).unwrap();
        assert_eq!(token.access_token, "abc123");

        let token = CachedUserToken::from_json(br#"{"error":"invalid_grant"}"#).unwrap();
        assert!(token.access_token.is_empty());
        assert_eq!(token.error, "invalid_grant");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let token = CachedUserToken::from_json(
            br#"{"access_token":"abc123","token_type":"bearer","expires_in":3600}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "abc123");
    }

    #[test]
    fn test_malformed_json() {
        assert!(CachedUserToken::from_json(b"{not json").is_err());
        assert!(CachedUserToken::from_json(br#"{"access_token":42}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CachedUserToken::load(&dir.path().join(CACHED_TOKEN_FILE));
        assert!(matches!(result, Err(CachedTokenError::Io { .. })));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHED_TOKEN_FILE);
        std::fs::write(&path, r#"{"access_token":"from-disk"}"#).unwrap();

        let token = CachedUserToken::load(&path).unwrap();
        assert_eq!(token.access_token, "from-disk");
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let token = CachedUserToken {
            access_token: "secret".to_string(),
            error: String::new(),
        };
        assert!(!format!("{token:?}").contains("secret"));
    }
}
