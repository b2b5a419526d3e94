//! Directory and file operations.

use agilestore_protocol::constants::{STATUS_OK, is_make_dir_success};
use agilestore_protocol::methods::{DeleteDir, DeleteFile, ListFile, MakeDir2, Noop, Stat};
use agilestore_protocol::{FileEntry, RpcMethod};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{Error, ErrorKind};
use crate::transport::Transport;

fn expect_ok(method: &'static str, code: i64) -> Result<(), ErrorKind> {
    if code == STATUS_OK {
        Ok(())
    } else {
        Err(ErrorKind::Rejected { method, code })
    }
}

impl<T: Transport> Client<T> {
    /// Creates `path`. An already existing directory is not an error.
    pub fn make_directory(&mut self, path: &str) -> Result<(), Error> {
        self.run(|client| {
            let code = client.rpc(&MakeDir2 { path: path.into() })?;
            if !is_make_dir_success(code) {
                return Err(ErrorKind::Rejected {
                    method: MakeDir2::NAME,
                    code,
                });
            }
            info!(path, code, "directory ready");
            Ok(())
        })
    }

    pub fn delete_directory(&mut self, path: &str) -> Result<(), Error> {
        self.run(|client| {
            let code = client.rpc(&DeleteDir { path: path.into() })?;
            expect_ok(DeleteDir::NAME, code)?;
            info!(path, "directory deleted");
            Ok(())
        })
    }

    pub fn delete_file(&mut self, path: &str) -> Result<(), Error> {
        self.run(|client| {
            let code = client.rpc(&DeleteFile { path: path.into() })?;
            expect_ok(DeleteFile::NAME, code)?;
            info!(path, "file deleted");
            Ok(())
        })
    }

    /// Lists the entries of directory `path`. A reply without a list is
    /// treated as an empty directory.
    pub fn list_entries(&mut self, path: &str) -> Result<Vec<FileEntry>, Error> {
        self.run(|client| {
            let listed = client.rpc(&ListFile { path: path.into() })?;
            let entries = listed.list.unwrap_or_default();
            debug!(path, entries = entries.len(), "directory listed");
            Ok(entries)
        })
    }

    /// Names of the entries of directory `path`.
    pub fn list_files(&mut self, path: &str) -> Result<Vec<String>, Error> {
        let entries = self.list_entries(path)?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    /// Whether a file or directory exists at `path`.
    pub fn exists(&mut self, path: &str) -> Result<bool, Error> {
        self.run(|client| {
            let stat = client.rpc(&Stat { path: path.into() })?;
            Ok(stat.code == STATUS_OK)
        })
    }

    /// Keeps the server-side session alive.
    pub fn noop(&mut self) -> Result<(), Error> {
        self.run(|client| client.rpc(&Noop::default()).map(|_| ()))
    }
}
