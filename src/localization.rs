//! Schema localization documents
//!
//! Builds, for one discipline and schema type, the map of every container
//! and its items with display names and descriptions in the best available
//! locale. Container keys keep their stored case; item keys are lowercased.

use crate::config::LocaleScope;
use crate::db::{LocaleRepository, SchemaRepository};
use crate::error::{LocalizationError, Result};
use crate::locale::resolve_locale;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Discriminator stored in `splocalecontainer.schematype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Core,
    WorkBench,
}

impl SchemaType {
    pub fn code(self) -> i64 {
        match self {
            SchemaType::Core => 0,
            SchemaType::WorkBench => 1,
        }
    }
}

impl FromStr for SchemaType {
    type Err = LocalizationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "0" | "core" => Ok(SchemaType::Core),
            "1" | "workbench" => Ok(SchemaType::WorkBench),
            _ => Err(LocalizationError::InvalidSchemaType(s.to_string())),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub id: i64,
    pub discipline_id: i64,
}

/// A field of a container, with localized display metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedItem {
    pub format: Option<String>,
    #[serde(rename = "ishidden")]
    pub is_hidden: bool,
    #[serde(rename = "isuiformatter")]
    pub is_ui_formatter: bool,
    #[serde(rename = "picklistname")]
    pub pick_list_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "isrequired")]
    pub is_required: bool,
    #[serde(rename = "weblinkname")]
    pub web_link_name: Option<String>,
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
}

/// A table-level schema grouping, with localized display metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedContainer {
    pub format: Option<String>,
    #[serde(rename = "ishidden")]
    pub is_hidden: bool,
    #[serde(rename = "isuiformatter")]
    pub is_ui_formatter: bool,
    #[serde(rename = "picklistname")]
    pub pick_list_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub aggregator: Option<String>,
    #[serde(rename = "defaultui")]
    pub default_ui: Option<String>,
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
    /// Keyed by lowercased item name
    pub items: BTreeMap<String, LocalizedItem>,
}

/// Containers keyed by their raw (case-preserved) name.
pub type SchemaLocalization = BTreeMap<String, LocalizedContainer>;

/// Build the localization map for a collection's discipline.
pub fn load_schema_localization(
    conn: &Connection,
    collection: &Collection,
    schema_type: SchemaType,
    lang: &str,
    scope: LocaleScope,
) -> Result<SchemaLocalization> {
    let available = LocaleRepository::new(conn).available_locales(scope, collection.discipline_id)?;
    let locale = resolve_locale(lang, &available)?;

    let repo = SchemaRepository::new(conn);
    let mut containers = repo.load_containers(collection.discipline_id, schema_type, &locale)?;
    let item_count = repo.load_items_into(&mut containers, collection.discipline_id, schema_type, &locale)?;

    debug!(
        "Loaded {} containers and {} items for discipline {} (schema type {})",
        containers.len(),
        item_count,
        collection.discipline_id,
        schema_type
    );

    Ok(containers)
}

/// Resolve the localization document for a collection and serialize it to JSON.
pub fn get_schema_localization(
    conn: &Connection,
    collection: &Collection,
    schema_type: SchemaType,
    lang: &str,
    scope: LocaleScope,
) -> Result<String> {
    let containers = load_schema_localization(conn, collection, schema_type, lang, scope)?;
    Ok(serde_json::to_string(&containers)?)
}
