use std::io::Read;

use anyhow::Result;
use mockall::automock;

/// Opens authenticated sessions against the remote store.
///
/// A session is owned by exactly one request; implementations hand out a fresh
/// connection on every call.
#[automock]
pub trait RemoteStoreConnector {
    fn connect(&self) -> Result<Box<dyn RemoteSession + Send>>;
}

pub trait RemoteSession {
    /// Creates `path` and any missing parents. An existing directory is not an error.
    fn ensure_directory(&mut self, path: &str) -> Result<()>;

    /// Writes everything `contents` yields to `remote_path`, replacing any existing file.
    /// Returns the number of bytes written.
    fn store(&mut self, remote_path: &str, contents: &mut dyn Read) -> Result<u64>;

    fn quit(&mut self) -> Result<()> {
        Ok(())
    }
}
