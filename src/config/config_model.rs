use std::fmt;

use tracing::Level;

use crate::domain::value_objects::uploads::PushMode;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server: Server,
    pub auth: BasicAuth,
    pub ftp: Ftp,
    pub push: Push,
    pub log_level: Level,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    /// Maximum request body size in MiB.
    pub body_limit: u64,
}

#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct Ftp {
    /// Always `host:port`.
    pub host: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Ftp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ftp")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Push {
    pub base_directory: String,
    pub mode: PushMode,
}
