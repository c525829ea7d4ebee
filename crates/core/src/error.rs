use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("component mismatch: expected {expected}, command targets {found}")]
    ComponentMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
