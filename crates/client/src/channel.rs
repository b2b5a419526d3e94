//! JSON-RPC request channel.

use agilestore_protocol::constants::TOKEN_PARAM;
use agilestore_protocol::methods::Login;
use agilestore_protocol::{RpcMethod, RpcRequest, RpcResponse};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::auth::AuthToken;
use crate::error::ErrorKind;
use crate::transport::{RawReply, Transport, UploadBody};

/// Parameters whose values never reach the diagnostics.
const REDACTED_PARAMS: [&str; 2] = [TOKEN_PARAM, "password"];

/// The most recent exchange with the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Serialized request, or a one-line summary for uploads.
    pub last_query: Option<String>,
    /// Raw response body, or the acknowledgment headers for uploads.
    pub last_response: Option<String>,
}

/// Executes named remote operations over a [`Transport`].
///
/// Each call records the outgoing request and the raw response in
/// [`Diagnostics`], then accepts the response only if the HTTP status is 200,
/// the body is a JSON-RPC envelope without an error and a `result` is present.
pub struct RpcChannel<T> {
    transport: T,
    next_id: u64,
    diagnostics: Diagnostics,
}

impl<T: Transport> RpcChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Executes `method` with `params` and returns the envelope's `result`.
    ///
    /// The token, if any, is added to the parameters as `token`.
    pub fn execute(
        &mut self,
        method: &str,
        mut params: Map<String, Value>,
        token: Option<&AuthToken>,
    ) -> Result<Value, ErrorKind> {
        if let Some(token) = token {
            params.insert(TOKEN_PARAM.into(), Value::String(token.as_str().into()));
        }
        let request = RpcRequest::new(self.next_id, method, params);
        self.next_id += 1;

        let body = serde_json::to_string(&request)
            .map_err(|e| ErrorKind::Protocol(format!("cannot encode {method} request: {e}")))?;
        self.diagnostics.last_query = Some(redacted(&request));
        self.diagnostics.last_response = None;
        debug!(method, id = request.id, "rpc call");

        let reply = self.transport.post_rpc(token, body)?;
        trace!(method, body = %reply.body, "rpc reply");
        self.diagnostics.last_response = Some(reply.body.clone());

        if !reply.is_success() {
            return Err(ErrorKind::Protocol(format!(
                "got status {} from {method}",
                reply.status
            )));
        }
        let envelope: RpcResponse = serde_json::from_str(&reply.body)
            .map_err(|e| ErrorKind::Protocol(format!("malformed {method} response: {e}")))?;
        if let Some(message) = envelope.error_message() {
            return Err(ErrorKind::Protocol(format!("{method} failed: {message}")));
        }
        envelope
            .result
            .ok_or_else(|| ErrorKind::Protocol(format!("no result in {method} response")))
    }

    /// Calls a typed remote method.
    pub fn call<M: RpcMethod>(
        &mut self,
        request: &M,
        token: &AuthToken,
    ) -> Result<M::Output, ErrorKind> {
        self.invoke(request, Some(token))
    }

    /// Login is the one call made without a token.
    pub(crate) fn call_unauthenticated(
        &mut self,
        request: &Login,
    ) -> Result<<Login as RpcMethod>::Output, ErrorKind> {
        self.invoke(request, None)
    }

    fn invoke<M: RpcMethod>(
        &mut self,
        request: &M,
        token: Option<&AuthToken>,
    ) -> Result<M::Output, ErrorKind> {
        let params = match serde_json::to_value(request) {
            Ok(Value::Object(params)) => params,
            Ok(other) => {
                return Err(ErrorKind::Protocol(format!(
                    "{} parameters must be an object, got {other}",
                    M::NAME
                )));
            }
            Err(e) => {
                return Err(ErrorKind::Protocol(format!(
                    "cannot encode {} parameters: {e}",
                    M::NAME
                )));
            }
        };
        let result = self.execute(M::NAME, params, token)?;
        serde_json::from_value(result)
            .map_err(|e| ErrorKind::Protocol(format!("unexpected {} result: {e}", M::NAME)))
    }

    /// Streams one piece and returns the acknowledgment.
    pub fn upload_piece(
        &mut self,
        token: &AuthToken,
        mpid: &str,
        index: u32,
        body: UploadBody,
        length: u64,
    ) -> Result<RawReply, ErrorKind> {
        self.record_upload(format!("upload piece {index} of {mpid} ({length} bytes)"));
        let reply = self.transport.post_piece(token, mpid, index, body, length)?;
        self.accept_upload(reply, "piece upload")
    }

    /// Uploads a whole file and returns the acknowledgment.
    pub fn upload_file(
        &mut self,
        token: &AuthToken,
        directory: &str,
        name: &str,
        body: UploadBody,
    ) -> Result<RawReply, ErrorKind> {
        self.record_upload(format!("upload {name} to {directory}"));
        let reply = self.transport.post_file(token, directory, name, body)?;
        self.accept_upload(reply, "file upload")
    }

    fn record_upload(&mut self, summary: String) {
        debug!(query = %summary, "upload");
        self.diagnostics.last_query = Some(summary);
        self.diagnostics.last_response = None;
    }

    fn accept_upload(&mut self, reply: RawReply, what: &str) -> Result<RawReply, ErrorKind> {
        self.diagnostics.last_response = Some(summarize(&reply));
        if !reply.is_success() {
            return Err(ErrorKind::Protocol(format!(
                "got status {} from {what}",
                reply.status
            )));
        }
        Ok(reply)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// Serializes `request` with secret parameters masked.
fn redacted(request: &RpcRequest) -> String {
    let mut shown = request.clone();
    for key in REDACTED_PARAMS {
        if let Some(value) = shown.params.get_mut(key) {
            *value = Value::String("***".into());
        }
    }
    serde_json::to_string(&shown).unwrap_or_else(|_| format!("{} request", request.method))
}

/// Renders an upload reply as status line, headers, then body.
fn summarize(reply: &RawReply) -> String {
    let mut out = format!("HTTP {}", reply.status);
    for (name, value) in &reply.headers {
        out.push_str(&format!("\n{name}: {value}"));
    }
    if !reply.body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&reply.body);
    }
    out
}
