use std::{
    collections::HashSet,
    io::{self, Read},
    sync::Arc,
};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::config_model::Push,
    domain::{
        repositories::remote_store::{RemoteSession, RemoteStoreConnector},
        value_objects::{
            remote_paths::{
                EntryNameError, decode_entry_name, is_default_directory, join_remote_path, normalize_entry_name,
                parent_directory, single_file_name,
            },
            uploads::{PushKind, PushMode, PushUpload, UploadManifest, UploadRecord},
        },
    },
};

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Could not connect to FTP server")]
    Connection(#[source] anyhow::Error),

    #[error("Could not create directory on FTP server")]
    Directory(#[source] anyhow::Error),

    #[error("Invalid file name in upload")]
    InvalidEntryName(#[from] EntryNameError),

    #[error("Could not read tar archive contents")]
    Archive(#[source] io::Error),

    #[error("Could not upload file to FTP server")]
    Store(#[source] anyhow::Error),

    #[error("Upload task failed")]
    Internal(#[source] tokio::task::JoinError),
}

impl PushError {
    /// The underlying cause, rendered for the `error` field of a response body.
    pub fn detail(&self) -> String {
        match self {
            PushError::Connection(err) | PushError::Directory(err) | PushError::Store(err) => {
                format!("{:#}", err)
            }
            PushError::InvalidEntryName(err) => err.to_string(),
            PushError::Archive(err) => err.to_string(),
            PushError::Internal(err) => err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub kind: PushKind,
    pub manifest: UploadManifest,
}

/// Forwards one upload to the remote store over a session opened for this push only.
pub struct PushUseCase<C>
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    connector: Arc<C>,
    base_directory: String,
    mode: PushMode,
}

impl<C> PushUseCase<C>
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    pub fn new(connector: Arc<C>, config: Push) -> Self {
        Self {
            connector,
            base_directory: config.base_directory,
            mode: config.mode,
        }
    }

    pub async fn push(&self, push_id: Uuid, upload: PushUpload) -> Result<PushOutcome, PushError> {
        let connector = Arc::clone(&self.connector);
        let base_directory = self.base_directory.clone();
        let kind = upload.kind(self.mode);

        debug!(%push_id, ?kind, "push: dispatching upload");

        tokio::task::spawn_blocking(move || {
            run_push(connector.as_ref(), &base_directory, push_id, kind, upload)
        })
        .await
        .map_err(PushError::Internal)?
    }
}

fn run_push(
    connector: &dyn RemoteStoreConnector,
    base_directory: &str,
    push_id: Uuid,
    kind: PushKind,
    upload: PushUpload,
) -> Result<PushOutcome, PushError> {
    let single_name = match kind {
        PushKind::Single => Some(single_file_name(
            upload.file_name.as_deref().unwrap_or_default(),
        )?),
        PushKind::Archive => None,
    };

    let mut session = connector.connect().map_err(PushError::Connection)?;

    let result = prepare_base_directory(session.as_mut(), base_directory).and_then(|()| {
        match single_name {
            Some(name) => push_single(
                session.as_mut(),
                base_directory,
                push_id,
                &name,
                upload.contents,
            ),
            None => push_archive(session.as_mut(), base_directory, push_id, upload.contents),
        }
    });

    if let Err(err) = session.quit() {
        warn!(%push_id, error = %err, "push: failed to close FTP session");
    }

    result.map(|manifest| PushOutcome { kind, manifest })
}

fn prepare_base_directory(
    session: &mut dyn RemoteSession,
    base_directory: &str,
) -> Result<(), PushError> {
    if is_default_directory(base_directory) {
        return Ok(());
    }

    session
        .ensure_directory(base_directory)
        .map_err(PushError::Directory)
}

fn push_single(
    session: &mut dyn RemoteSession,
    base_directory: &str,
    push_id: Uuid,
    name: &str,
    contents: impl Read,
) -> Result<UploadManifest, PushError> {
    let remote_path = join_remote_path(base_directory, name);
    let record = store_entry(session, push_id, name, &remote_path, contents, None)?;

    Ok(vec![record])
}

fn push_archive(
    session: &mut dyn RemoteSession,
    base_directory: &str,
    push_id: Uuid,
    contents: impl Read,
) -> Result<UploadManifest, PushError> {
    let mut archive = tar::Archive::new(contents);
    let entries = archive.entries().map_err(PushError::Archive)?;

    let mut manifest = Vec::new();
    let mut ensured_directories = HashSet::new();

    for entry in entries {
        let mut entry = entry.map_err(PushError::Archive)?;
        let raw_name = decode_entry_name(&entry.path_bytes())?.to_string();
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            let name = match normalize_entry_name(&raw_name) {
                // `./` style root entries carry nothing to create.
                Err(EntryNameError::Empty) => continue,
                other => other?,
            };
            let remote_path = join_remote_path(base_directory, &name);
            ensure_once(session, &mut ensured_directories, &remote_path)?;
            continue;
        }

        if !(entry_type.is_file() || entry_type.is_contiguous()) {
            warn!(
                %push_id,
                name = %raw_name,
                entry_type = ?entry_type,
                "push: skipping non-regular archive entry"
            );
            continue;
        }

        let name = normalize_entry_name(&raw_name)?;
        let remote_path = join_remote_path(base_directory, &name);

        if name.contains('/') {
            if let Some(parent) = parent_directory(&remote_path) {
                ensure_once(session, &mut ensured_directories, parent)?;
            }
        }

        let expected_size = entry.header().size().map_err(PushError::Archive)?;
        let record = store_entry(
            session,
            push_id,
            &name,
            &remote_path,
            &mut entry,
            Some(expected_size),
        )?;
        manifest.push(record);
    }

    info!(%push_id, files = manifest.len(), "push: archive forwarded");
    Ok(manifest)
}

fn ensure_once(
    session: &mut dyn RemoteSession,
    ensured: &mut HashSet<String>,
    path: &str,
) -> Result<(), PushError> {
    if ensured.contains(path) {
        return Ok(());
    }

    session.ensure_directory(path).map_err(PushError::Directory)?;
    ensured.insert(path.to_string());
    Ok(())
}

fn store_entry<R: Read>(
    session: &mut dyn RemoteSession,
    push_id: Uuid,
    name: &str,
    remote_path: &str,
    contents: R,
    expected_size: Option<u64>,
) -> Result<UploadRecord, PushError> {
    let mut counted = CountingReader::new(contents);

    session
        .store(remote_path, &mut counted)
        .map_err(PushError::Store)?;

    // A truncated archive ends an entry early without a read error.
    if let Some(expected) = expected_size {
        if counted.bytes_read() < expected {
            return Err(PushError::Archive(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "entry `{}` ended after {} of {} bytes",
                    name,
                    counted.bytes_read(),
                    expected
                ),
            )));
        }
    }

    let record = UploadRecord {
        uploaded_at: Utc::now().timestamp(),
        name: name.to_string(),
        size: counted.bytes_read(),
    };

    info!(
        %push_id,
        name = %record.name,
        remote_path = %remote_path,
        size = record.size,
        "push: file stored"
    );

    Ok(record)
}

struct CountingReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.bytes_read += read as u64;
        Ok(read)
    }
}
