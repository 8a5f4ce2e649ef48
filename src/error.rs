use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalizationError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The string table has neither the requested locale nor an English fallback.
    #[error("No schema locale available for '{requested}' and no English fallback present")]
    NoFallbackLocale { requested: String },

    #[error("Collection not found: {0}")]
    CollectionNotFound(i64),

    #[error("Invalid schema type: {0}")]
    InvalidSchemaType(String),

    #[error("Invalid request parameter: {0}")]
    InvalidParameter(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LocalizationError>;
