#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} index {index} is out of range")]
    OutOfRange { entity: &'static str, index: usize },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid field path: {0}")]
    InvalidPath(String),
}
