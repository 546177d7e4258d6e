use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Startup failures: anything that stops the process before it can serve.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("missing setting `{key}`")]
    MissingSetting { key: &'static str },
    #[error("could not open the database pool")]
    Connect(#[source] sqlx::Error),
    #[error("applying migrations failed")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("cannot listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("media root `{}` is unusable", root.display())]
    MediaRoot {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn missing(key: &'static str) -> Self {
        Self::MissingSetting { key }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_failures_name_the_address() {
        let addr: SocketAddr = "127.0.0.1:5000".parse().expect("addr");
        let err = InfraError::Bind {
            addr,
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert_eq!(err.to_string(), "cannot listen on 127.0.0.1:5000");
        assert!(std::error::Error::source(&err).is_some());
    }
}
