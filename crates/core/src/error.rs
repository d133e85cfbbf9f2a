#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid option \"{option}\": {message}")]
    Configuration { option: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
