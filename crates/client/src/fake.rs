//! In-memory storage service for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;

use agilestore_transfer::checksum_bytes;
use serde_json::{Map, Value, json};

use crate::auth::AuthToken;
use crate::error::ErrorKind;
use crate::transport::{RawReply, Transport, UploadBody};

struct Upload {
    path: String,
    state: i64,
    pieces: Vec<Vec<u8>>,
}

/// Speaks just enough of the storage protocol to drive the client.
///
/// Public fields tweak the next responses; the accessor methods expose what
/// the client sent.
pub struct FakeServer {
    /// Id handed out by `createMultipart`.
    pub next_mpid: String,
    /// `login` result; `Null` means `["tok-<username>"]`.
    pub login_result: Value,
    pub logout_code: i64,
    /// Value of the status acknowledgment header.
    pub ack_status: String,
    /// Flips one byte of the next received upload before storing it.
    pub corrupt_next_piece: bool,
    /// Stops reading upload bodies after this many bytes.
    pub read_limit: Option<u64>,
    /// HTTP status returned for the given piece index.
    pub piece_status: Option<(u16, u32)>,
    /// Drops `index` from listed pieces.
    pub omit_piece_index: bool,
    /// Fails the next RPC with a transport error.
    pub fail_next_rpc: bool,
    /// Number of `reset_connections` calls.
    pub resets: usize,

    issued: Option<String>,
    overrides: HashMap<String, (u16, String)>,
    calls: Vec<(u64, String, Value)>,
    uploads: HashMap<String, Upload>,
    piece_writes: HashMap<String, Vec<u32>>,
    cursors: HashMap<String, Vec<u32>>,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            next_mpid: "mp-1".into(),
            login_result: Value::Null,
            logout_code: 0,
            ack_status: "0".into(),
            corrupt_next_piece: false,
            read_limit: None,
            piece_status: None,
            omit_piece_index: false,
            fail_next_rpc: false,
            resets: 0,
            issued: None,
            overrides: HashMap::new(),
            calls: Vec::new(),
            uploads: HashMap::new(),
            piece_writes: HashMap::new(),
            cursors: HashMap::new(),
            dirs: BTreeSet::from(["/".to_string()]),
            files: BTreeMap::new(),
        }
    }

    /// Answers every call to `method` with a fixed HTTP status and body.
    pub fn override_method(&mut self, method: &str, status: u16, body: &str) {
        self.overrides
            .insert(method.to_string(), (status, body.to_string()));
    }

    /// Creates upload `mpid` holding zero-filled pieces of the given sizes.
    pub fn seed_pieces(&mut self, mpid: &str, sizes: &[u64]) {
        let pieces = sizes.iter().map(|&size| vec![0u8; size as usize]).collect();
        self.uploads.insert(
            mpid.to_string(),
            Upload {
                path: format!("/seeded/{mpid}"),
                state: 1,
                pieces,
            },
        );
    }

    /// Registers an empty upload for `path` and returns its id.
    pub fn open_multipart(&mut self, path: &str) -> String {
        let mpid = self.next_mpid.clone();
        self.uploads.insert(
            mpid.clone(),
            Upload {
                path: path.to_string(),
                state: 0,
                pieces: Vec::new(),
            },
        );
        mpid
    }

    /// Accepts `token` as if it had been handed out by `login`.
    pub fn issue(&mut self, token: &str) {
        self.issued = Some(token.to_string());
    }

    pub fn add_dir(&mut self, path: &str) {
        self.dirs.insert(path.to_string());
    }

    pub fn add_file(&mut self, path: &str, data: &[u8]) {
        self.files.insert(path.to_string(), data.to_vec());
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.iter().filter(|(_, m, _)| m == method).count()
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.calls
            .iter()
            .rev()
            .find(|(_, m, _)| m == method)
            .map(|(_, _, params)| params.clone())
    }

    pub fn request_ids(&self) -> Vec<u64> {
        self.calls.iter().map(|(id, _, _)| *id).collect()
    }

    pub fn upload_path(&self, mpid: &str) -> Option<&str> {
        self.uploads.get(mpid).map(|u| u.path.as_str())
    }

    /// Piece indices written to `mpid`, in arrival order.
    pub fn piece_writes(&self, mpid: &str) -> Vec<u32> {
        self.piece_writes.get(mpid).cloned().unwrap_or_default()
    }

    pub fn piece_data(&self, mpid: &str, index: u32) -> Option<&[u8]> {
        let slot = usize::try_from(index).ok()?.checked_sub(1)?;
        self.uploads
            .get(mpid)?
            .pieces
            .get(slot)
            .map(Vec::as_slice)
    }

    /// Listing cursors requested for `mpid`.
    pub fn cursors(&self, mpid: &str) -> Vec<u32> {
        self.cursors.get(mpid).cloned().unwrap_or_default()
    }

    pub fn clear_cursors(&mut self, mpid: &str) {
        self.cursors.remove(mpid);
    }

    pub fn file_data(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    fn authorized(&self, token: Option<&AuthToken>) -> bool {
        match (token, &self.issued) {
            (Some(token), Some(issued)) => token.as_str() == issued,
            _ => false,
        }
    }

    fn dispatch(&mut self, method: &str, params: &Map<String, Value>) -> Result<Value, String> {
        let text = |key: &str| {
            params
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let result = match method {
            "login" => {
                if self.login_result.is_null() {
                    let token = format!("tok-{}", text("username"));
                    self.issued = Some(token.clone());
                    json!([token])
                } else {
                    if let Some(token) = self.login_result.get(0).and_then(Value::as_str) {
                        self.issued = Some(token.to_string());
                    }
                    self.login_result.clone()
                }
            }
            "logout" => {
                self.issued = None;
                json!(self.logout_code)
            }
            "createMultipart" => {
                let mpid = self.next_mpid.clone();
                if !mpid.is_empty() {
                    self.open_multipart(&text("path"));
                }
                json!({ "mpid": mpid })
            }
            "restartMultipart" => match self.uploads.get_mut(&text("mpid")) {
                Some(upload) => {
                    upload.state = 1;
                    json!({ "code": 0 })
                }
                None => json!({ "code": -1 }),
            },
            "getMultipartStatus" => match self.uploads.get(&text("mpid")) {
                Some(upload) => json!({ "code": 0, "state": upload.state }),
                None => json!({ "code": -1 }),
            },
            "completeMultipart" => match self.uploads.get_mut(&text("mpid")) {
                Some(upload) => {
                    upload.state = 3;
                    json!({ "code": 0, "numpieces": upload.pieces.len() })
                }
                None => json!({ "code": -1 }),
            },
            "abortMultipart" => match self.uploads.get_mut(&text("mpid")) {
                Some(upload) => {
                    upload.state = 4;
                    json!({ "code": 0 })
                }
                None => json!({ "code": -1 }),
            },
            "listMultipartPiece" => {
                let mpid = text("mpid");
                let cookie = params.get("cookie").and_then(Value::as_u64).unwrap_or(1) as u32;
                let size = params.get("pagesize").and_then(Value::as_u64).unwrap_or(100) as usize;
                self.cursors.entry(mpid.clone()).or_default().push(cookie);

                match self.uploads.get(&mpid) {
                    Some(upload) => {
                        let pieces: Vec<Value> = (cookie..)
                            .zip(upload.pieces.iter().skip(cookie.saturating_sub(1) as usize))
                            .take(size)
                            .map(|(index, data)| {
                                if self.omit_piece_index {
                                    json!({ "size": data.len() })
                                } else {
                                    json!({ "index": index, "size": data.len() })
                                }
                            })
                            .collect();
                        json!({ "code": 0, "pieces": pieces })
                    }
                    None => json!({ "code": -1 }),
                }
            }
            "makeDir2" => {
                if self.dirs.insert(text("path")) {
                    json!(0)
                } else {
                    json!(-2)
                }
            }
            "deleteDir" => status_code(self.dirs.remove(&text("path"))),
            "deleteFile" => status_code(self.files.remove(&text("path")).is_some()),
            "listFile" => {
                let dir = text("path");
                let prefix = format!("{}/", dir.trim_end_matches('/'));
                let child = |path: &String| {
                    path.strip_prefix(&prefix)
                        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                        .map(str::to_string)
                };
                let mut list: Vec<Value> = self
                    .dirs
                    .iter()
                    .filter_map(|p| child(p).map(|name| json!({ "name": name, "type": 1 })))
                    .collect();
                list.extend(
                    self.files
                        .keys()
                        .filter_map(|p| child(p).map(|name| json!({ "name": name, "type": 2 }))),
                );
                if self.dirs.contains(&dir) {
                    json!({ "list": list })
                } else {
                    json!({})
                }
            }
            "stat" => {
                let path = text("path");
                let found = self.dirs.contains(&path) || self.files.contains_key(&path);
                json!({ "code": status_code(found) })
            }
            "noop" => json!(0),
            other => return Err(format!("no such method: {other}")),
        };
        Ok(result)
    }

    /// Reads an upload body the way the service would, honouring the
    /// corruption and read-limit knobs.
    fn receive(&mut self, body: UploadBody) -> Result<Vec<u8>, ErrorKind> {
        let mut data = Vec::new();
        let read = match self.read_limit {
            Some(limit) => body.take(limit).read_to_end(&mut data),
            None => {
                let mut body = body;
                body.read_to_end(&mut data)
            }
        };
        read.map_err(ErrorKind::from_io)?;

        if std::mem::take(&mut self.corrupt_next_piece)
            && let Some(byte) = data.first_mut()
        {
            *byte ^= 0x01;
        }
        Ok(data)
    }

    fn ack(&self, data: &[u8]) -> RawReply {
        let mut headers = BTreeMap::new();
        headers.insert("x-agile-status".to_string(), self.ack_status.clone());
        headers.insert("x-agile-size".to_string(), data.len().to_string());
        headers.insert("x-agile-checksum".to_string(), checksum_bytes(data));
        RawReply {
            status: 200,
            headers,
            body: String::new(),
        }
    }

    fn unauthorized() -> RawReply {
        RawReply {
            status: 401,
            headers: BTreeMap::new(),
            body: "unauthorized".into(),
        }
    }
}

fn status_code(ok: bool) -> Value {
    json!(if ok { 0 } else { -1 })
}

impl Transport for FakeServer {
    fn post_rpc(&mut self, token: Option<&AuthToken>, body: String) -> Result<RawReply, ErrorKind> {
        if std::mem::take(&mut self.fail_next_rpc) {
            return Err(ErrorKind::Transport("connection reset by peer".into()));
        }

        let request: Value = serde_json::from_str(&body).map_err(|e| {
            ErrorKind::Transport(format!("fake server got invalid JSON: {e}"))
        })?;
        let id = request["id"].as_u64().unwrap_or_default();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request["params"].as_object().cloned().unwrap_or_default();
        self.calls.push((id, method.clone(), Value::Object(params.clone())));

        if let Some((status, body)) = self.overrides.get(&method) {
            return Ok(RawReply {
                status: *status,
                headers: BTreeMap::new(),
                body: body.clone(),
            });
        }

        let param_token = params.get("token").and_then(Value::as_str);
        if method != "login"
            && (!self.authorized(token) || param_token != token.map(AuthToken::as_str))
        {
            let body = json!({ "jsonrpc": "2.0", "error": "not logged in", "id": id });
            return Ok(RawReply {
                status: 200,
                headers: BTreeMap::new(),
                body: body.to_string(),
            });
        }

        let envelope = match self.dispatch(&method, &params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "result": result, "id": id }),
            Err(message) => json!({ "jsonrpc": "2.0", "error": message, "id": id }),
        };
        Ok(RawReply {
            status: 200,
            headers: BTreeMap::new(),
            body: envelope.to_string(),
        })
    }

    fn post_piece(
        &mut self,
        token: &AuthToken,
        mpid: &str,
        index: u32,
        body: UploadBody,
        _length: u64,
    ) -> Result<RawReply, ErrorKind> {
        if !self.authorized(Some(token)) {
            return Ok(Self::unauthorized());
        }
        if let Some((status, failing)) = self.piece_status
            && failing == index
        {
            return Ok(RawReply {
                status,
                headers: BTreeMap::new(),
                body: "piece rejected".into(),
            });
        }

        let data = self.receive(body)?;
        let reply = self.ack(&data);
        let Some(upload) = self.uploads.get_mut(mpid) else {
            return Ok(RawReply {
                status: 404,
                headers: BTreeMap::new(),
                body: format!("unknown upload {mpid}"),
            });
        };

        let slot = index.saturating_sub(1) as usize;
        if slot < upload.pieces.len() {
            upload.pieces[slot] = data;
        } else if slot == upload.pieces.len() {
            upload.pieces.push(data);
        } else {
            return Ok(RawReply {
                status: 400,
                headers: BTreeMap::new(),
                body: format!("piece {index} leaves a gap"),
            });
        }
        upload.state = 1;
        self.piece_writes
            .entry(mpid.to_string())
            .or_default()
            .push(index);
        Ok(reply)
    }

    fn post_file(
        &mut self,
        token: &AuthToken,
        directory: &str,
        name: &str,
        body: UploadBody,
    ) -> Result<RawReply, ErrorKind> {
        if !self.authorized(Some(token)) {
            return Ok(Self::unauthorized());
        }
        let data = self.receive(body)?;
        let reply = self.ack(&data);
        let path = format!("{}/{}", directory.trim_end_matches('/'), name);
        self.files.insert(path, data);
        Ok(reply)
    }

    fn reset_connections(&mut self) {
        self.resets += 1;
    }
}
