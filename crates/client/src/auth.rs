use std::fmt;

use agilestore_protocol::RpcMethod;
use agilestore_protocol::methods::{Login, Logout};
use tracing::{debug, info, warn};

use crate::channel::RpcChannel;
use crate::error::ErrorKind;
use crate::transport::Transport;

/// Username and password exchanged for a session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Opaque session token. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps `value`, or returns `None` if it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Caches the session token and logs in lazily.
///
/// [`ensure`](Self::ensure) is the only place a login can happen; every
/// remote operation goes through it first and receives the token explicitly.
#[derive(Debug)]
pub struct Authenticator {
    credentials: Credentials,
    token: Option<AuthToken>,
}

impl Authenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The cached token, if logged in.
    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the cached token, logging in first if there is none.
    pub fn ensure<T: Transport>(
        &mut self,
        channel: &mut RpcChannel<T>,
    ) -> Result<AuthToken, ErrorKind> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let token = self.login(channel)?;
        self.token = Some(token.clone());
        Ok(token)
    }

    fn login<T: Transport>(&self, channel: &mut RpcChannel<T>) -> Result<AuthToken, ErrorKind> {
        let username = &self.credentials.username;
        debug!(user = %username, "logging in");

        let request = Login {
            username: username.clone(),
            password: self.credentials.password.clone(),
        };
        let result = channel
            .call_unauthenticated(&request)
            .map_err(|e| match e {
                ErrorKind::Protocol(msg) => ErrorKind::Authentication(msg),
                other => other,
            })?;

        let token = result
            .into_iter()
            .next()
            .flatten()
            .and_then(AuthToken::new)
            .ok_or_else(|| {
                ErrorKind::Authentication(format!("no token returned for user {username}"))
            })?;

        info!(user = %username, "logged in");
        Ok(token)
    }

    /// Ends the remote session.
    ///
    /// The cached token is dropped and the transport's idle connections are
    /// closed whatever the remote call returns. Without a cached token this
    /// does nothing.
    pub fn logout<T: Transport>(&mut self, channel: &mut RpcChannel<T>) -> Result<(), ErrorKind> {
        let Some(token) = self.token.take() else {
            debug!("logout without a session, nothing to do");
            return Ok(());
        };

        let outcome = channel.call(&Logout {}, &token);
        channel.transport_mut().reset_connections();

        match outcome {
            Ok(Some(0)) => {
                info!(user = %self.credentials.username, "logged out");
                Ok(())
            }
            Ok(Some(code)) => Err(ErrorKind::Rejected {
                method: Logout::NAME,
                code,
            }),
            Ok(None) => Err(ErrorKind::Protocol("logout returned no status".into())),
            Err(e) => {
                warn!(error = %e, "logout failed, session token discarded anyway");
                Err(e)
            }
        }
    }

    /// Forgets the cached token without contacting the server.
    pub fn invalidate(&mut self) {
        self.token = None;
    }
}
