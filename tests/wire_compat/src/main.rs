fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use agilestore_protocol::constants::TOKEN_PARAM;
    use agilestore_protocol::methods::{
        CompleteMultipart, CreateMultipart, ListFile, ListMultipartPiece, Login,
        MultipartStatusResult, RpcMethod,
    };
    use agilestore_protocol::{FileEntry, MultipartState, Piece, RpcRequest, RpcResponse};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
    }

    /// Builds the request the client would post for `method`.
    fn build_request<M: RpcMethod>(id: u64, method: &M, token: Option<&str>) -> serde_json::Value {
        let mut params = match serde_json::to_value(method).unwrap() {
            serde_json::Value::Object(map) => map,
            other => panic!("{} params are not an object: {other}", M::NAME),
        };
        if let Some(token) = token {
            params.insert(TOKEN_PARAM.into(), token.into());
        }
        serde_json::to_value(RpcRequest::new(id, M::NAME, params)).unwrap()
    }

    /// Unwraps a response fixture's `result` into the method's output type.
    fn result_of<M: RpcMethod>(name: &str) -> M::Output {
        let envelope: RpcResponse = serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse envelope {name}: {e}"));
        assert!(envelope.error_message().is_none(), "{name} carries an error");
        let result = envelope
            .result
            .unwrap_or_else(|| panic!("{name} has no result"));
        serde_json::from_value(result)
            .unwrap_or_else(|e| panic!("unexpected {} result in {name}: {e}", M::NAME))
    }

    // --- Requests ---

    #[test]
    fn fixture_request_envelopes_roundtrip() {
        roundtrip_test::<RpcRequest>("request_login.json");
        roundtrip_test::<RpcRequest>("request_create_multipart.json");
        roundtrip_test::<RpcRequest>("request_list_pieces.json");
    }

    #[test]
    fn fixture_login_request() {
        let built = build_request(
            1,
            &Login {
                username: "alice".into(),
                password: "s3cret".into(),
            },
            None,
        );
        assert_eq!(built, load_fixture("request_login.json"));
    }

    #[test]
    fn fixture_create_multipart_request() {
        let built = build_request(
            2,
            &CreateMultipart {
                path: "/videos/movie.mp4".into(),
            },
            Some("tok-alice"),
        );
        assert_eq!(built, load_fixture("request_create_multipart.json"));
    }

    #[test]
    fn fixture_list_pieces_request() {
        let built = build_request(
            7,
            &ListMultipartPiece {
                mpid: "mp-42".into(),
                cookie: 101,
                pagesize: 100,
            },
            Some("tok-alice"),
        );
        assert_eq!(built, load_fixture("request_list_pieces.json"));
    }

    // --- Responses ---

    #[test]
    fn fixture_login_response() {
        let tokens = result_of::<Login>("response_login.json");
        assert_eq!(tokens, vec![Some("b7c1a2f0e4d94c6f".to_string())]);
    }

    #[test]
    fn fixture_create_multipart_response() {
        let created = result_of::<CreateMultipart>("response_create_multipart.json");
        assert_eq!(created.mpid, "mp-42");
    }

    #[test]
    fn fixture_list_pieces_response() {
        let page = result_of::<ListMultipartPiece>("response_list_pieces.json");
        assert_eq!(page.code, Some(0));
        let pieces = page.pieces.unwrap();
        assert_eq!(
            pieces,
            vec![
                Piece {
                    index: 101,
                    size: 5_242_880
                },
                Piece {
                    index: 102,
                    size: 5_242_880
                },
                Piece {
                    index: 103,
                    size: 1_048_576
                },
            ]
        );
    }

    #[test]
    fn fixture_pieces_roundtrip() {
        let fixture = load_fixture("response_list_pieces.json");
        let pieces = fixture["result"]["pieces"].clone();
        let parsed: Vec<Piece> = serde_json::from_value(pieces.clone()).unwrap();
        assert_eq!(serde_json::to_value(&parsed).unwrap(), pieces);
    }

    #[test]
    fn fixture_multipart_status_response() {
        let envelope: RpcResponse =
            serde_json::from_value(load_fixture("response_multipart_status.json")).unwrap();
        let status: MultipartStatusResult = serde_json::from_value(envelope.result.unwrap()).unwrap();
        assert_eq!(status.code, Some(0));
        let state = MultipartState::try_from(status.state.unwrap()).unwrap();
        assert_eq!(state, MultipartState::Uploading);
    }

    #[test]
    fn fixture_complete_multipart_response() {
        let done = result_of::<CompleteMultipart>("response_complete_multipart.json");
        assert_eq!(done.code, Some(0));
        assert_eq!(done.numpieces, Some(3));
    }

    #[test]
    fn fixture_list_file_response() {
        let listed = result_of::<ListFile>("response_list_file.json");
        let entries = listed.list.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            FileEntry {
                name: "clips".into(),
                kind: 1
            }
        );

        let fixture = load_fixture("response_list_file.json");
        let raw = fixture["result"]["list"].clone();
        let parsed: Vec<FileEntry> = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn fixture_error_response() {
        let envelope: RpcResponse =
            serde_json::from_value(load_fixture("response_error.json")).unwrap();
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error_message().as_deref(), Some("Method not found"));
    }
}
