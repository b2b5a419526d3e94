//! Endpoint paths, header names and status codes.

/// Path of the JSON-RPC endpoint, relative to the service base URL.
pub const JSON_RPC_PATH: &str = "/jsonrpc";

/// Path of the multipart piece upload endpoint.
pub const PIECE_UPLOAD_PATH: &str = "/multipart/piece";

/// Path of the single-request file upload endpoint.
pub const FILE_UPLOAD_PATH: &str = "/post/file";

/// JSON-RPC protocol version sent in every request.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Request header carrying the session token.
pub const AUTH_HEADER: &str = "X-Agile-Authorization";

/// Request header carrying the 1-based piece index.
pub const PART_HEADER: &str = "X-Agile-Part";

/// Request header carrying the multipart identifier.
pub const MULTIPART_HEADER: &str = "X-Agile-Multipart";

/// Acknowledgment header carrying the upload status code.
pub const STATUS_HEADER: &str = "X-Agile-Status";

/// Acknowledgment header carrying the number of bytes the server stored.
pub const SIZE_HEADER: &str = "X-Agile-Size";

/// Acknowledgment header carrying the hex SHA-256 of the stored bytes.
pub const CHECKSUM_HEADER: &str = "X-Agile-Checksum";

/// Name of the RPC parameter the session token is injected under.
pub const TOKEN_PARAM: &str = "token";

/// Multipart form field names used by the file upload endpoint.
pub const FORM_DIRECTORY: &str = "directory";
pub const FORM_BASENAME: &str = "basename";
pub const FORM_FILE: &str = "uploadFile";

/// Status code meaning success for every operation.
pub const STATUS_OK: i64 = 0;

/// Codes `makeDir2` returns when the directory already exists.
pub const DIRECTORY_EXISTS_CODES: [i64; 3] = [-2, -1, 1];

/// Page size used when scanning the piece listing.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Returns `true` if `code` means a `makeDir2` call left the directory in place.
pub fn is_make_dir_success(code: i64) -> bool {
    code == STATUS_OK || DIRECTORY_EXISTS_CODES.contains(&code)
}
