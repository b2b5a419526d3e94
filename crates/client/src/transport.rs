//! HTTP transport seam.
//!
//! `Transport` is the only place bytes meet the network. `HttpTransport`
//! implements it with `reqwest`'s blocking client; tests substitute an
//! in-memory storage server.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io::{self, Read};
use std::time::Duration;

use agilestore_protocol::constants::{
    AUTH_HEADER, FILE_UPLOAD_PATH, FORM_BASENAME, FORM_DIRECTORY, FORM_FILE, JSON_RPC_PATH,
    MULTIPART_HEADER, PART_HEADER, PIECE_UPLOAD_PATH,
};
use agilestore_transfer::{Cancelled, is_cancelled};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Body, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::auth::AuthToken;
use crate::error::ErrorKind;

/// Streaming request body.
pub type UploadBody = Box<dyn Read + Send>;

/// An HTTP response reduced to what the protocol inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub status: u16,
    /// Header names are lowercased; the first value of a repeated header wins.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawReply {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Sends requests to the storage service.
///
/// Every method blocks until the response has been read in full; connections
/// go back to the pool afterwards whatever the outcome.
pub trait Transport {
    /// Posts a serialized JSON-RPC request. `token` is `None` only for login.
    fn post_rpc(&mut self, token: Option<&AuthToken>, body: String) -> Result<RawReply, ErrorKind>;

    /// Streams exactly `length` bytes as piece `index` of upload `mpid`.
    fn post_piece(
        &mut self,
        token: &AuthToken,
        mpid: &str,
        index: u32,
        body: UploadBody,
        length: u64,
    ) -> Result<RawReply, ErrorKind>;

    /// Uploads `body` as `directory/name` in a single request.
    fn post_file(
        &mut self,
        token: &AuthToken,
        directory: &str,
        name: &str,
        body: UploadBody,
    ) -> Result<RawReply, ErrorKind>;

    /// Drops idle pooled connections.
    fn reset_connections(&mut self) {}
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    base_url: String,
    timeout: Option<Duration>,
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport for the service at `endpoint` (e.g. `https://host`).
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ErrorKind> {
        let http = build_client(timeout).map_err(|e| ErrorKind::Transport(e.to_string()))?;
        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<RawReply, ErrorKind> {
        let resp = request.send().map_err(classify)?;
        let status = resp.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_insert_with(|| value.to_string());
            }
        }

        let body = resp.text().map_err(classify)?;
        debug!(status, bytes = body.len(), "http response");
        Ok(RawReply {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn post_rpc(&mut self, token: Option<&AuthToken>, body: String) -> Result<RawReply, ErrorKind> {
        let mut request = self
            .http
            .post(self.url(JSON_RPC_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = token {
            request = request.header(AUTH_HEADER, token.as_str());
        }
        self.send(request)
    }

    fn post_piece(
        &mut self,
        token: &AuthToken,
        mpid: &str,
        index: u32,
        body: UploadBody,
        length: u64,
    ) -> Result<RawReply, ErrorKind> {
        let request = self
            .http
            .post(self.url(PIECE_UPLOAD_PATH))
            .header(AUTH_HEADER, token.as_str())
            .header(PART_HEADER, index.to_string())
            .header(MULTIPART_HEADER, mpid)
            .body(Body::sized(body, length));
        self.send(request)
    }

    fn post_file(
        &mut self,
        token: &AuthToken,
        directory: &str,
        name: &str,
        body: UploadBody,
    ) -> Result<RawReply, ErrorKind> {
        let form = Form::new()
            .text(FORM_DIRECTORY, directory.to_string())
            .text(FORM_BASENAME, name.to_string())
            .part(FORM_FILE, Part::reader(body).file_name(name.to_string()));
        let request = self
            .http
            .post(self.url(FILE_UPLOAD_PATH))
            .header(AUTH_HEADER, token.as_str())
            .multipart(form);
        self.send(request)
    }

    fn reset_connections(&mut self) {
        match build_client(self.timeout) {
            Ok(http) => self.http = http,
            Err(e) => warn!(error = %e, "failed to rebuild HTTP client, keeping pool"),
        }
    }
}

fn build_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::blocking::Client> {
    // `None` lifts the blocking client's 30 s default.
    reqwest::blocking::Client::builder().timeout(timeout).build()
}

/// Separates caller cancellation from network faults.
fn classify(err: reqwest::Error) -> ErrorKind {
    let mut source: Option<&(dyn StdError + 'static)> = Some(&err);
    while let Some(e) = source {
        if e.is::<Cancelled>() {
            return ErrorKind::Interrupted;
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>()
            && (is_cancelled(io_err) || io_err.kind() == io::ErrorKind::Interrupted)
        {
            return ErrorKind::Interrupted;
        }
        source = e.source();
    }
    ErrorKind::Transport(err.to_string())
}
