use thiserror::Error;

/// A value that could not be turned into a domain type.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
}

impl DomainError {
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}
