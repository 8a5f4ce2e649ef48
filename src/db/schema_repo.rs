//! Container and item queries for schema localization
//!
//! Each query comes in two static variants: one matching a specific country
//! and one matching rows whose country is NULL. Country matching is never a
//! wildcard and variants are always required to be NULL.

use crate::error::{LocalizationError, Result};
use crate::locale::ResolvedLocale;
use crate::localization::{
    Collection, LocalizedContainer, LocalizedItem, SchemaLocalization, SchemaType,
};
use rusqlite::{named_params, params, Connection, Row};
use std::collections::BTreeMap;
use tracing::warn;

const CONTAINERS_WITH_COUNTRY_SQL: &str = r#"
    SELECT c.name, c.format, c.ishidden, c.isuiformatter, c.picklistname, c.type,
           c.aggregator, c.defaultui,
           coalesce(n.text, c.name), coalesce(d.text, c.name)
    FROM splocalecontainer c
    LEFT OUTER JOIN splocaleitemstr n ON n.splocalecontainernameid = c.splocalecontainerid
        AND lower(n.language) = :language
        AND lower(n.country) = :country
        AND n.variant IS NULL
    LEFT OUTER JOIN splocaleitemstr d ON d.splocalecontainerdescid = c.splocalecontainerid
        AND lower(d.language) = :language
        AND lower(d.country) = :country
        AND d.variant IS NULL
    WHERE c.schematype = :schematype AND c.disciplineid = :disciplineid
    ORDER BY c.name
"#;

const CONTAINERS_WITHOUT_COUNTRY_SQL: &str = r#"
    SELECT c.name, c.format, c.ishidden, c.isuiformatter, c.picklistname, c.type,
           c.aggregator, c.defaultui,
           coalesce(n.text, c.name), coalesce(d.text, c.name)
    FROM splocalecontainer c
    LEFT OUTER JOIN splocaleitemstr n ON n.splocalecontainernameid = c.splocalecontainerid
        AND lower(n.language) = :language
        AND n.country IS NULL
        AND n.variant IS NULL
    LEFT OUTER JOIN splocaleitemstr d ON d.splocalecontainerdescid = c.splocalecontainerid
        AND lower(d.language) = :language
        AND d.country IS NULL
        AND d.variant IS NULL
    WHERE c.schematype = :schematype AND c.disciplineid = :disciplineid
    ORDER BY c.name
"#;

const ITEMS_WITH_COUNTRY_SQL: &str = r#"
    SELECT c.name, i.name,
           i.format, i.ishidden, i.isuiformatter, i.picklistname,
           i.type, i.isrequired, i.weblinkname,
           coalesce(n.text, i.name), coalesce(d.text, i.name)
    FROM splocalecontainer c
    INNER JOIN splocalecontaineritem i ON i.splocalecontainerid = c.splocalecontainerid
    LEFT OUTER JOIN splocaleitemstr n ON n.splocalecontaineritemnameid = i.splocalecontaineritemid
        AND lower(n.language) = :language
        AND lower(n.country) = :country
        AND n.variant IS NULL
    LEFT OUTER JOIN splocaleitemstr d ON d.splocalecontaineritemdescid = i.splocalecontaineritemid
        AND lower(d.language) = :language
        AND lower(d.country) = :country
        AND d.variant IS NULL
    WHERE c.schematype = :schematype AND c.disciplineid = :disciplineid
    ORDER BY i.name
"#;

const ITEMS_WITHOUT_COUNTRY_SQL: &str = r#"
    SELECT c.name, i.name,
           i.format, i.ishidden, i.isuiformatter, i.picklistname,
           i.type, i.isrequired, i.weblinkname,
           coalesce(n.text, i.name), coalesce(d.text, i.name)
    FROM splocalecontainer c
    INNER JOIN splocalecontaineritem i ON i.splocalecontainerid = c.splocalecontainerid
    LEFT OUTER JOIN splocaleitemstr n ON n.splocalecontaineritemnameid = i.splocalecontaineritemid
        AND lower(n.language) = :language
        AND n.country IS NULL
        AND n.variant IS NULL
    LEFT OUTER JOIN splocaleitemstr d ON d.splocalecontaineritemdescid = i.splocalecontaineritemid
        AND lower(d.language) = :language
        AND d.country IS NULL
        AND d.variant IS NULL
    WHERE c.schematype = :schematype AND c.disciplineid = :disciplineid
    ORDER BY i.name
"#;

const COLLECTION_SQL: &str = "SELECT collectionid, disciplineid FROM collection WHERE collectionid = ?1";

pub struct SchemaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SchemaRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Look up the discipline a collection belongs to
    pub fn find_collection(&self, collection_id: i64) -> Result<Collection> {
        let result = self.conn.query_row(COLLECTION_SQL, params![collection_id], |row| {
            Ok(Collection {
                id: row.get(0)?,
                discipline_id: row.get(1)?,
            })
        });

        match result {
            Ok(collection) => Ok(collection),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(LocalizationError::CollectionNotFound(collection_id))
            }
            Err(e) => Err(LocalizationError::Database(format!(
                "Failed to load collection {}: {}",
                collection_id, e
            ))),
        }
    }

    /// Load every container for the discipline and schema type, with no items yet
    pub fn load_containers(
        &self,
        discipline_id: i64,
        schema_type: SchemaType,
        locale: &ResolvedLocale,
    ) -> Result<SchemaLocalization> {
        let rows = match &locale.country {
            Some(country) => {
                let mut stmt = self
                    .conn
                    .prepare_cached(CONTAINERS_WITH_COUNTRY_SQL)
                    .map_err(|e| LocalizationError::Database(format!("Failed to prepare container query: {}", e)))?;
                let rows = stmt
                    .query_map(
                        named_params! {
                            ":language": locale.language,
                            ":country": country,
                            ":schematype": schema_type.code(),
                            ":disciplineid": discipline_id,
                        },
                        container_from_row,
                    )
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>());
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare_cached(CONTAINERS_WITHOUT_COUNTRY_SQL)
                    .map_err(|e| LocalizationError::Database(format!("Failed to prepare container query: {}", e)))?;
                let rows = stmt
                    .query_map(
                        named_params! {
                            ":language": locale.language,
                            ":schematype": schema_type.code(),
                            ":disciplineid": discipline_id,
                        },
                        container_from_row,
                    )
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>());
                rows
            }
        }
        .map_err(|e| LocalizationError::Database(format!("Failed to load containers: {}", e)))?;

        Ok(rows.into_iter().collect())
    }

    /// Load items and fold them into their parent containers.
    ///
    /// Items are keyed by lowercased name, so names differing only in case
    /// collapse to one entry. Returns the number of distinct keys placed.
    pub fn load_items_into(
        &self,
        containers: &mut SchemaLocalization,
        discipline_id: i64,
        schema_type: SchemaType,
        locale: &ResolvedLocale,
    ) -> Result<usize> {
        let rows = match &locale.country {
            Some(country) => {
                let mut stmt = self
                    .conn
                    .prepare_cached(ITEMS_WITH_COUNTRY_SQL)
                    .map_err(|e| LocalizationError::Database(format!("Failed to prepare item query: {}", e)))?;
                let rows = stmt
                    .query_map(
                        named_params! {
                            ":language": locale.language,
                            ":country": country,
                            ":schematype": schema_type.code(),
                            ":disciplineid": discipline_id,
                        },
                        item_from_row,
                    )
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>());
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare_cached(ITEMS_WITHOUT_COUNTRY_SQL)
                    .map_err(|e| LocalizationError::Database(format!("Failed to prepare item query: {}", e)))?;
                let rows = stmt
                    .query_map(
                        named_params! {
                            ":language": locale.language,
                            ":schematype": schema_type.code(),
                            ":disciplineid": discipline_id,
                        },
                        item_from_row,
                    )
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>());
                rows
            }
        }
        .map_err(|e| LocalizationError::Database(format!("Failed to load container items: {}", e)))?;

        let mut placed = 0;
        for (container_name, item_name, item) in rows {
            match containers.get_mut(&container_name) {
                Some(container) => {
                    if container.items.insert(item_name.to_lowercase(), item).is_none() {
                        placed += 1;
                    }
                }
                None => warn!(
                    "Skipping item {} of unknown container {}",
                    item_name, container_name
                ),
            }
        }

        Ok(placed)
    }
}

fn container_from_row(row: &Row<'_>) -> rusqlite::Result<(String, LocalizedContainer)> {
    let name: String = row.get(0)?;
    let container = LocalizedContainer {
        format: row.get(1)?,
        is_hidden: flag(row, 2)?,
        is_ui_formatter: flag(row, 3)?,
        pick_list_name: row.get(4)?,
        kind: row.get(5)?,
        aggregator: row.get(6)?,
        default_ui: row.get(7)?,
        name: row.get(8)?,
        description: row.get(9)?,
        items: BTreeMap::new(),
    };
    Ok((name, container))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, LocalizedItem)> {
    let container_name: String = row.get(0)?;
    let item_name: String = row.get(1)?;
    let item = LocalizedItem {
        format: row.get(2)?,
        is_hidden: flag(row, 3)?,
        is_ui_formatter: flag(row, 4)?,
        pick_list_name: row.get(5)?,
        kind: row.get(6)?,
        is_required: flag(row, 7)?,
        web_link_name: row.get(8)?,
        name: row.get(9)?,
        description: row.get(10)?,
    };
    Ok((container_name, item_name, item))
}

// NULL flags read as false
fn flag(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, Option<bool>>(idx)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::seeded_db;

    #[test]
    fn test_find_collection() {
        let conn = seeded_db();
        let repo = SchemaRepository::new(&conn);

        assert_eq!(
            repo.find_collection(9).unwrap(),
            Collection { id: 9, discipline_id: 7 }
        );
        assert!(matches!(
            repo.find_collection(404),
            Err(LocalizationError::CollectionNotFound(404))
        ));
    }

    #[test]
    fn test_country_match_is_exact() {
        let conn = seeded_db();
        let repo = SchemaRepository::new(&conn);

        let mx = repo
            .load_containers(3, SchemaType::Core, &ResolvedLocale::new("es", Some("mx")))
            .unwrap();
        assert_eq!(mx["Collectionobject"].name, "Objeto de colección (MX)");

        // a country with no rows must not borrow another country's strings
        let ar = repo
            .load_containers(3, SchemaType::Core, &ResolvedLocale::new("es", Some("ar")))
            .unwrap();
        assert_eq!(ar["Collectionobject"].name, "Collectionobject");

        let plain = repo
            .load_containers(3, SchemaType::Core, &ResolvedLocale::new("es", None))
            .unwrap();
        assert_eq!(plain["Collectionobject"].name, "Objeto de colección");
    }

    #[test]
    fn test_country_strings_never_match_without_country() {
        let conn = seeded_db();
        let repo = SchemaRepository::new(&conn);

        // Accession and remarks only carry es/MX strings
        let mx = ResolvedLocale::new("es", Some("mx"));
        let mut containers = repo.load_containers(3, SchemaType::Core, &mx).unwrap();
        repo.load_items_into(&mut containers, 3, SchemaType::Core, &mx).unwrap();
        assert_eq!(containers["Accession"].name, "Acceso (MX)");
        assert_eq!(containers["Collectionobject"].items["remarks"].name, "Observaciones (MX)");

        let plain = ResolvedLocale::new("es", None);
        let mut containers = repo.load_containers(3, SchemaType::Core, &plain).unwrap();
        repo.load_items_into(&mut containers, 3, SchemaType::Core, &plain).unwrap();
        assert_eq!(containers["Accession"].name, "Accession");
        assert_eq!(containers["Accession"].description, "Accession");
        assert_eq!(containers["Collectionobject"].items["remarks"].name, "remarks");
        assert_eq!(containers["Collectionobject"].items["remarks"].description, "remarks");
    }

    #[test]
    fn test_case_colliding_items_count_once() {
        let conn = seeded_db();
        conn.execute(
            "INSERT INTO splocalecontaineritem (splocalecontaineritemid, splocalecontainerid, name) VALUES (15, 1, 'REMARKS')",
            [],
        )
        .unwrap();
        let repo = SchemaRepository::new(&conn);
        let locale = ResolvedLocale::new("en", None);

        let mut containers = repo.load_containers(3, SchemaType::Core, &locale).unwrap();
        let placed = repo
            .load_items_into(&mut containers, 3, SchemaType::Core, &locale)
            .unwrap();

        let total: usize = containers.values().map(|c| c.items.len()).sum();
        assert_eq!(placed, 3);
        assert_eq!(placed, total);
        assert_eq!(containers["Collectionobject"].items.len(), 2);
    }

    #[test]
    fn test_items_keyed_lowercase_under_case_preserved_containers() {
        let conn = seeded_db();
        let repo = SchemaRepository::new(&conn);
        let locale = ResolvedLocale::new("en", None);

        let mut containers = repo.load_containers(3, SchemaType::Core, &locale).unwrap();
        let placed = repo
            .load_items_into(&mut containers, 3, SchemaType::Core, &locale)
            .unwrap();

        assert_eq!(placed, 3);
        let keys: Vec<&str> = containers.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Accession", "Collectionobject"]);

        let items = &containers["Collectionobject"].items;
        assert!(items.contains_key("catalognumber"));
        assert!(!items.contains_key("catalogNumber"));
        assert_eq!(items["catalognumber"].name, "Catalog #");
        assert_eq!(items["catalognumber"].description, "The catalog number");
        assert!(items["catalognumber"].is_required);
        assert!(items["catalognumber"].is_ui_formatter);
        assert_eq!(items["remarks"].name, "remarks");
        assert!(items["remarks"].is_hidden);
    }
}
