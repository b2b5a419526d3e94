//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use agilestore_client::{
    ActivityCallback, ChunkSource, Client, MultipartSession, plan_chunks,
};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Remote name for `local`: `name` if given, else the local file name.
pub fn remote_name(local: &Path, name: Option<&str>) -> Result<String> {
    if let Some(name) = name {
        return Ok(name.to_string());
    }
    local
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a remote name from {}", local.display()))
}

/// Logs bytes sent for the current request.
fn progress(label: String) -> ActivityCallback {
    Arc::new(move |bytes| debug!(file = %label, bytes, "sending"))
}

pub fn put(client: &mut Client, local: &Path, directory: &str, name: Option<&str>) -> Result<()> {
    let name = remote_name(local, name)?;
    let source = ChunkSource::open(local)
        .with_context(|| format!("cannot open {}", local.display()))?;

    let digest = client.upload(&source, directory, &name, Some(progress(name.clone())))?;
    println!(
        "{}/{}  {} bytes  sha256:{}",
        directory.trim_end_matches('/'),
        name,
        digest.length,
        digest.hex
    );
    Ok(())
}

pub struct MputOptions<'a> {
    pub name: Option<&'a str>,
    pub resume: Option<&'a str>,
    pub chunk_size: u64,
}

pub fn mput(client: &mut Client, local: &Path, directory: &str, opts: MputOptions<'_>) -> Result<()> {
    let name = remote_name(local, opts.name)?;
    let source = ChunkSource::open(local)
        .with_context(|| format!("cannot open {}", local.display()))?;
    let mut session = MultipartSession::new();

    let offset = match opts.resume {
        Some(mpid) => {
            client.resume_multipart(&mut session, mpid)?;
            let offset = client.uploaded_bytes(&session)?;
            info!(mpid, pieces = session.pieces(), offset, "resuming upload");
            offset
        }
        None => {
            client.start_multipart(&mut session, directory, &name)?;
            0
        }
    };
    let mpid = session.id().unwrap_or_default().to_string();

    let plan = plan_chunks(source.len(), opts.chunk_size).starting_at(offset);
    info!(
        mpid = %mpid,
        file = %local.display(),
        chunks = plan.size_hint().0,
        chunk_size = plan.chunk_size(),
        "uploading pieces"
    );

    if let Err(e) = client.upload_parts(&mut session, &source, plan, Some(progress(name))) {
        warn!(mpid = %mpid, pieces = session.pieces(), "upload stopped; rerun with --resume {mpid}");
        return Err(e.into());
    }

    client.complete_multipart(&mut session)?;
    println!("{mpid}  {} pieces  {} bytes", session.pieces(), source.len());
    Ok(())
}

pub fn status(client: &mut Client, mpid: &str) -> Result<()> {
    let state = client.status_of(mpid)?;
    println!("{mpid}  {state}");
    Ok(())
}

pub fn abort(client: &mut Client, mpid: &str) -> Result<()> {
    let mut session = MultipartSession::new();
    client.resume_multipart(&mut session, mpid)?;
    client.abort_multipart(&mut session)?;
    println!("{mpid}  aborted");
    Ok(())
}

pub fn mkdir(client: &mut Client, path: &str) -> Result<()> {
    client.make_directory(path)?;
    Ok(())
}

pub fn rm(client: &mut Client, path: &str, recursive: bool) -> Result<()> {
    if recursive {
        client.delete_directory(path)?;
    } else {
        client.delete_file(path)?;
    }
    Ok(())
}

pub fn ls(client: &mut Client, path: &str) -> Result<()> {
    let mut names = client.list_files(path)?;
    names.sort();
    for name in names {
        println!("{name}");
    }
    Ok(())
}
