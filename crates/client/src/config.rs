use std::fmt;
use std::time::Duration;

use agilestore_protocol::constants::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::error::ErrorKind;

/// Connection settings for a [`Client`](crate::Client).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service base URL, e.g. `https://storage.example.com`.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Pieces requested per listing page when resolving offsets.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***")
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Checks the settings needed before any request can be made.
    pub fn validate(&self) -> Result<(), ErrorKind> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ErrorKind::Transport(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.username.is_empty() {
            return Err(ErrorKind::Authentication("no username configured".into()));
        }
        Ok(())
    }
}
