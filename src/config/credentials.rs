//! Connection credentials entered in the connection form.

use super::{ConfigError, Result};

/// The values needed to talk to a JIRA instance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The JIRA instance URL.
    pub url: String,
    /// The account user, usually an email address.
    pub user: String,
    /// The API token.
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials, trimming the URL and user.
    pub fn new(url: &str, user: &str, token: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            user: user.trim().to_string(),
            token: token.to_string(),
        }
    }

    /// Validate the credentials before any request is made.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "JIRA URL cannot be empty".to_string(),
            ));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        if self.user.is_empty() {
            return Err(ConfigError::ValidationError(
                "user cannot be empty".to_string(),
            ));
        }

        if self.token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "API token cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
