use std::{fmt, io::Read};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One file that reached the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub uploaded_at: i64,
    pub name: String,
    pub size: u64,
}

pub type UploadManifest = Vec<UploadRecord>;

/// The `push` multipart field. `contents` yields the body as it arrives, so it
/// can be read once and only from a blocking context.
pub struct PushUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub contents: Box<dyn Read + Send>,
}

impl fmt::Debug for PushUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PushMode {
    /// Tar archives by name or content type, anything else as a single file
    #[default]
    Auto,
    /// Always unpack the upload as a tar archive
    Archive,
    /// Always store the upload as one file
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    Archive,
    Single,
}

impl PushUpload {
    pub fn kind(&self, mode: PushMode) -> PushKind {
        match mode {
            PushMode::Archive => PushKind::Archive,
            PushMode::Single => PushKind::Single,
            PushMode::Auto if self.looks_like_tar() => PushKind::Archive,
            PushMode::Auto => PushKind::Single,
        }
    }

    fn looks_like_tar(&self) -> bool {
        let by_name = self
            .file_name
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".tar"));
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|mime| mime.eq_ignore_ascii_case("application/x-tar"));

        by_name || by_type
    }
}
