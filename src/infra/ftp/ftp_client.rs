use std::io::Read;

use anyhow::{Context, Result};
use suppaftp::{FtpStream, types::FileType};
use tracing::{debug, info, warn};

use crate::{
    config::config_model::Ftp,
    domain::{
        repositories::remote_store::{RemoteSession, RemoteStoreConnector},
        value_objects::remote_paths::{is_default_directory, normalize_base_directory},
    },
};

#[derive(Clone, Debug)]
pub struct FtpConnector {
    config: Ftp,
}

impl FtpConnector {
    pub fn new(config: Ftp) -> Self {
        Self { config }
    }
}

impl RemoteStoreConnector for FtpConnector {
    fn connect(&self) -> Result<Box<dyn RemoteSession + Send>> {
        let mut stream = FtpStream::connect(&self.config.host)
            .with_context(|| format!("failed to dial FTP server {}", self.config.host))?;

        stream
            .login(&self.config.username, &self.config.password)
            .with_context(|| {
                format!(
                    "failed to authenticate against FTP server {} as {}",
                    self.config.host, self.config.username
                )
            })?;

        stream
            .transfer_type(FileType::Binary)
            .context("failed to switch FTP transfer type to binary")?;

        debug!(host = %self.config.host, "ftp_client: session established");

        Ok(Box::new(FtpSession { stream }))
    }
}

pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    fn directory_exists(&mut self, path: &str) -> Result<bool> {
        let previous = self
            .stream
            .pwd()
            .context("failed to read current FTP directory")?;

        if self.stream.cwd(path).is_err() {
            return Ok(false);
        }

        self.stream
            .cwd(&previous)
            .with_context(|| format!("failed to return to FTP directory {}", previous))?;
        Ok(true)
    }
}

impl RemoteSession for FtpSession {
    fn ensure_directory(&mut self, path: &str) -> Result<()> {
        let normalized = normalize_base_directory(path);
        let absolute = normalized.starts_with('/');

        let mut current = String::new();
        for segment in normalized.split('/').filter(|segment| !segment.is_empty()) {
            if !current.is_empty() || absolute {
                current.push('/');
            }
            current.push_str(segment);

            // MKD fails on an existing directory, so a failure is only fatal
            // when the directory is still missing afterwards.
            if let Err(mkdir_err) = self.stream.mkdir(&current) {
                if !self.directory_exists(&current)? {
                    return Err(mkdir_err)
                        .with_context(|| format!("failed to create FTP directory {}", current));
                }
                debug!(path = %current, "ftp_client: directory already exists");
            } else {
                debug!(path = %current, "ftp_client: directory created");
            }
        }

        Ok(())
    }

    fn store(&mut self, remote_path: &str, mut contents: &mut dyn Read) -> Result<u64> {
        let written = self
            .stream
            .put_file(remote_path, &mut contents)
            .with_context(|| format!("failed to store {} on FTP server", remote_path))?;

        debug!(path = %remote_path, bytes = written, "ftp_client: file stored");
        Ok(written)
    }

    fn quit(&mut self) -> Result<()> {
        self.stream.quit().context("failed to close FTP session")
    }
}

/// Checks the FTP credentials at boot and creates the upload directory.
pub fn verify(connector: &dyn RemoteStoreConnector, base_directory: &str) -> Result<()> {
    let mut session = connector.connect()?;

    if !is_default_directory(base_directory) {
        session
            .ensure_directory(base_directory)
            .with_context(|| format!("failed to create given directory {}", base_directory))?;
        info!(directory = %base_directory, "ftp_client: upload directory is ready");
    }

    if let Err(err) = session.quit() {
        warn!(error = %err, "ftp_client: failed to close startup session");
    }

    Ok(())
}
