use std::{
    io::Read,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};

use crate::domain::repositories::remote_store::{MockRemoteStoreConnector, RemoteSession};

/// Everything the in-memory remote store saw, shared across sessions.
#[derive(Debug, Default)]
pub struct RemoteLog {
    pub connects: usize,
    pub quits: usize,
    pub directories: Vec<String>,
    pub attempted: Vec<String>,
    pub stored: Vec<(String, Vec<u8>)>,
    pub fail_directories: bool,
}

impl RemoteLog {
    pub fn stored_paths(&self) -> Vec<String> {
        self.stored.iter().map(|(path, _)| path.clone()).collect()
    }
}

pub struct MemorySession {
    log: Arc<Mutex<RemoteLog>>,
    fail_on: Option<String>,
}

impl RemoteSession for MemorySession {
    fn ensure_directory(&mut self, path: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail_directories {
            return Err(anyhow!("550 {}: Permission denied", path));
        }
        log.directories.push(path.to_string());
        Ok(())
    }

    fn store(&mut self, remote_path: &str, contents: &mut dyn Read) -> Result<u64> {
        self.log
            .lock()
            .unwrap()
            .attempted
            .push(remote_path.to_string());

        if self.fail_on.as_deref().is_some_and(|fail| remote_path.ends_with(fail)) {
            return Err(anyhow!("553 could not create file {}", remote_path));
        }

        let mut buffer = Vec::new();
        contents.read_to_end(&mut buffer)?;
        let written = buffer.len() as u64;
        self.log
            .lock()
            .unwrap()
            .stored
            .push((remote_path.to_string(), buffer));
        Ok(written)
    }

    fn quit(&mut self) -> Result<()> {
        self.log.lock().unwrap().quits += 1;
        Ok(())
    }
}

/// A connector whose sessions record into `log`; stores to a path ending in
/// `fail_on` fail.
pub fn memory_connector(
    log: Arc<Mutex<RemoteLog>>,
    fail_on: Option<&str>,
) -> MockRemoteStoreConnector {
    let fail_on = fail_on.map(str::to_string);
    let mut connector = MockRemoteStoreConnector::new();
    connector.expect_connect().returning(move || {
        log.lock().unwrap().connects += 1;
        let session: Box<dyn RemoteSession + Send> = Box::new(MemorySession {
            log: Arc::clone(&log),
            fail_on: fail_on.clone(),
        });
        Ok(session)
    });
    connector
}

pub fn failing_connector(message: &'static str) -> MockRemoteStoreConnector {
    let mut connector = MockRemoteStoreConnector::new();
    connector
        .expect_connect()
        .returning(move || Err(anyhow!("failed to dial FTP server: {}", message)));
    connector
}

pub struct TarEntry {
    name: &'static [u8],
    contents: &'static [u8],
    entry_type: tar::EntryType,
    link_name: &'static [u8],
}

impl TarEntry {
    pub fn file(name: &'static str, contents: &'static [u8]) -> Self {
        Self::raw_file(name.as_bytes(), contents)
    }

    /// A regular file whose header name is taken byte for byte.
    pub fn raw_file(name: &'static [u8], contents: &'static [u8]) -> Self {
        Self {
            name,
            contents,
            entry_type: tar::EntryType::Regular,
            link_name: b"",
        }
    }

    pub fn directory(name: &'static str) -> Self {
        Self {
            name: name.as_bytes(),
            contents: b"",
            entry_type: tar::EntryType::Directory,
            link_name: b"",
        }
    }

    pub fn symlink(name: &'static str, target: &'static str) -> Self {
        Self {
            name: name.as_bytes(),
            contents: b"",
            entry_type: tar::EntryType::Symlink,
            link_name: target.as_bytes(),
        }
    }
}

/// Builds a tar archive with names written verbatim into the header, bypassing
/// the path checks `tar::Builder` applies.
pub fn build_tar(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        {
            let old = header.as_old_mut();
            old.name[..entry.name.len()].copy_from_slice(entry.name);
            old.linkname[..entry.link_name.len()].copy_from_slice(entry.link_name);
        }
        header.set_size(entry.contents.len() as u64);
        header.set_entry_type(entry.entry_type);
        header.set_mode(match entry.entry_type {
            tar::EntryType::Directory => 0o755,
            tar::EntryType::Symlink => 0o777,
            _ => 0o644,
        });
        header.set_cksum();
        builder.append(&header, entry.contents).unwrap();
    }

    builder.into_inner().unwrap()
}
