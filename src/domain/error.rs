use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain validation failed for `{entity}`: {message}")]
    Validation {
        entity: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            entity,
            message: message.into(),
        }
    }
}
