pub mod config;
pub mod error;
pub mod locale;
pub mod localization;
pub mod migrations;
pub mod routes;

// Database access for the localization tables
pub mod db;

pub use error::{LocalizationError, Result};
pub use localization::{get_schema_localization, SchemaType};
