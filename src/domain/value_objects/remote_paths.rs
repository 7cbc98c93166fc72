use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryNameError {
    #[error("entry name is empty")]
    Empty,
    #[error("entry name `{0}` contains a parent directory reference")]
    ParentReference(String),
    #[error("entry name `{0}` contains a backslash")]
    Backslash(String),
    #[error("entry name `{0}` is not valid UTF-8")]
    NotUtf8(String),
}

/// Decodes a raw archive entry name; names that are not UTF-8 are refused
/// rather than rewritten.
pub fn decode_entry_name(raw: &[u8]) -> Result<&str, EntryNameError> {
    std::str::from_utf8(raw)
        .map_err(|_| EntryNameError::NotUtf8(String::from_utf8_lossy(raw).into_owned()))
}

/// Normalizes an archive entry name into a relative, `/`-separated path.
///
/// Empty and `.` segments are dropped, so `./a//b.txt` becomes `a/b.txt` and a
/// leading `/` is stripped. Any `..` segment is rejected outright.
pub fn normalize_entry_name(raw: &str) -> Result<String, EntryNameError> {
    if raw.contains('\\') {
        return Err(EntryNameError::Backslash(raw.to_string()));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(EntryNameError::ParentReference(raw.to_string())),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(EntryNameError::Empty);
    }

    Ok(segments.join("/"))
}

/// Reduces a client supplied file name to its final path segment.
pub fn single_file_name(raw: &str) -> Result<String, EntryNameError> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    normalize_entry_name(last)
}

/// Joins the configured upload directory with a normalized entry name.
///
/// `.` and the empty string both mean the session's working directory.
pub fn join_remote_path(base_directory: &str, name: &str) -> String {
    let base = normalize_base_directory(base_directory);
    if base.is_empty() {
        name.to_string()
    } else if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Collapses repeated separators and `.` segments; keeps a leading `/`.
pub fn normalize_base_directory(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let joined = raw
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");

    match (absolute, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", joined),
        (false, _) => joined,
    }
}

pub fn is_default_directory(base_directory: &str) -> bool {
    normalize_base_directory(base_directory).is_empty()
}

/// Parent directory of a joined remote path, if it has one.
pub fn parent_directory(remote_path: &str) -> Option<&str> {
    match remote_path.rfind('/') {
        Some(0) | None => None,
        Some(index) => Some(&remote_path[..index]),
    }
}
