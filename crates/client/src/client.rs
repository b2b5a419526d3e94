use agilestore_protocol::RpcMethod;
use agilestore_protocol::constants::DEFAULT_PAGE_SIZE;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::auth::{AuthToken, Authenticator, Credentials};
use crate::channel::{Diagnostics, RpcChannel};
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind};
use crate::transport::{HttpTransport, Transport};

/// Handle to one Agile Storage account.
///
/// Holds the request channel, the cached session token and the cancellation
/// token. Multipart state lives in [`MultipartSession`](crate::MultipartSession)
/// records that are passed to each call.
pub struct Client<T: Transport = HttpTransport> {
    channel: RpcChannel<T>,
    auth: Authenticator,
    page_size: u32,
    cancel: CancellationToken,
}

impl Client<HttpTransport> {
    /// Builds an HTTP client from validated settings.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let transport = HttpTransport::new(&config.endpoint, config.timeout())?;
        Ok(Self::new(transport, config.credentials()).with_page_size(config.page_size))
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            channel: RpcChannel::new(transport),
            auth: Authenticator::new(credentials),
            page_size: DEFAULT_PAGE_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the piece-listing page size; 0 restores the default of 100.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        self
    }

    /// Replaces the cancellation token, e.g. with a child of an app-wide one.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// A clone of the token that interrupts uploads when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Logs in unless a session token is already cached.
    pub fn ensure_authenticated(&mut self) -> Result<AuthToken, Error> {
        self.run(|client| client.token())
    }

    /// Ends the remote session; the local token is cleared even on failure.
    pub fn logout(&mut self) -> Result<(), Error> {
        let outcome = self.auth.logout(&mut self.channel);
        outcome.map_err(|kind| self.fail(kind))
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// The last request and response exchanged with the server.
    pub fn diagnostics(&self) -> &Diagnostics {
        self.channel.diagnostics()
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.channel.transport_mut()
    }

    /// Runs `op` and turns its failure into an [`Error`] with diagnostics.
    pub(crate) fn run<R>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<R, ErrorKind>,
    ) -> Result<R, Error> {
        let outcome = op(self);
        outcome.map_err(|kind| self.fail(kind))
    }

    fn fail(&mut self, kind: ErrorKind) -> Error {
        if matches!(kind, ErrorKind::Authentication(_)) {
            self.auth.invalidate();
        }
        let diagnostics = self.channel.diagnostics();
        if matches!(kind, ErrorKind::Interrupted) {
            info!("operation cancelled");
        } else {
            error!(
                error = %kind,
                last_query = diagnostics.last_query.as_deref().unwrap_or("-"),
                last_response = diagnostics.last_response.as_deref().unwrap_or("-"),
                "storage request failed"
            );
        }
        Error::with_diagnostics(kind, diagnostics)
    }

    pub(crate) fn token(&mut self) -> Result<AuthToken, ErrorKind> {
        self.auth.ensure(&mut self.channel)
    }

    /// Calls `request` with a freshly ensured token.
    pub(crate) fn rpc<M: RpcMethod>(&mut self, request: &M) -> Result<M::Output, ErrorKind> {
        let token = self.token()?;
        self.channel.call(request, &token)
    }

    pub(crate) fn channel_mut(&mut self) -> &mut RpcChannel<T> {
        &mut self.channel
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), ErrorKind> {
        if self.cancel.is_cancelled() {
            return Err(ErrorKind::Interrupted);
        }
        Ok(())
    }
}
