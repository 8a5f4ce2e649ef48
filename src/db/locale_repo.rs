//! Available-locale queries over `splocaleitemstr`

use crate::config::LocaleScope;
use crate::error::{LocalizationError, Result};
use crate::locale::{AvailableLocales, LocaleTag};
use rusqlite::{named_params, Connection, Row};

const ALL_LOCALES_SQL: &str = r#"
    SELECT DISTINCT
        lower(language),
        lower(country),
        lower(variant)
    FROM splocaleitemstr
"#;

const DISCIPLINE_LOCALES_SQL: &str = r#"
    SELECT DISTINCT
        lower(s.language),
        lower(s.country),
        lower(s.variant)
    FROM splocaleitemstr s
    LEFT OUTER JOIN splocalecontainer c
        ON c.splocalecontainerid IN (s.splocalecontainernameid, s.splocalecontainerdescid)
    LEFT OUTER JOIN splocalecontaineritem i
        ON i.splocalecontaineritemid IN (s.splocalecontaineritemnameid, s.splocalecontaineritemdescid)
    LEFT OUTER JOIN splocalecontainer ic
        ON ic.splocalecontainerid = i.splocalecontainerid
    WHERE c.disciplineid = :disciplineid OR ic.disciplineid = :disciplineid
"#;

pub struct LocaleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> LocaleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Distinct locales present in the string table.
    ///
    /// With [`LocaleScope::Global`] this is every locale in the database,
    /// regardless of discipline.
    pub fn available_locales(&self, scope: LocaleScope, discipline_id: i64) -> Result<AvailableLocales> {
        Ok(self.load(scope, discipline_id)?.into_iter().collect())
    }

    /// Available locales in a stable order, for language pickers
    pub fn schema_languages(&self, scope: LocaleScope, discipline_id: i64) -> Result<Vec<LocaleTag>> {
        let mut tags = self.load(scope, discipline_id)?;
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    fn load(&self, scope: LocaleScope, discipline_id: i64) -> Result<Vec<LocaleTag>> {
        let rows = match scope {
            LocaleScope::Global => {
                let mut stmt = self.conn.prepare_cached(ALL_LOCALES_SQL).map_err(prepare_error)?;
                let tags = stmt
                    .query_map([], locale_from_row)
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>());
                tags
            }
            LocaleScope::Discipline => {
                let mut stmt = self
                    .conn
                    .prepare_cached(DISCIPLINE_LOCALES_SQL)
                    .map_err(prepare_error)?;
                let tags = stmt
                    .query_map(named_params! { ":disciplineid": discipline_id }, locale_from_row)
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>());
                tags
            }
        };

        rows.map_err(|e| LocalizationError::Database(format!("Failed to load schema locales: {}", e)))
    }
}

fn locale_from_row(row: &Row<'_>) -> rusqlite::Result<LocaleTag> {
    Ok(LocaleTag {
        language: row.get(0)?,
        country: row.get(1)?,
        variant: row.get(2)?,
    })
}

fn prepare_error(e: rusqlite::Error) -> LocalizationError {
    LocalizationError::Database(format!("Failed to prepare locale query: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::seeded_db;

    #[test]
    fn test_global_locales_are_lowercased_and_distinct() {
        let conn = seeded_db();
        let repo = LocaleRepository::new(&conn);

        let locales = repo.available_locales(LocaleScope::Global, 3).unwrap();

        assert!(locales.contains(&LocaleTag::new("en", None)));
        assert!(locales.contains(&LocaleTag::new("es", None)));
        assert!(locales.contains(&LocaleTag::new("es", Some("mx"))));
        assert!(locales.contains(&LocaleTag::new("fr", None)));
        assert!(locales.contains(&LocaleTag {
            language: "es".to_string(),
            country: Some("mx".to_string()),
            variant: Some("x".to_string()),
        }));
        assert_eq!(locales.len(), 5);
    }

    #[test]
    fn test_discipline_scope_excludes_other_disciplines() {
        let conn = seeded_db();
        let repo = LocaleRepository::new(&conn);

        let ichthyology = repo.available_locales(LocaleScope::Discipline, 3).unwrap();
        assert!(!ichthyology.contains(&LocaleTag::new("fr", None)));
        assert!(ichthyology.contains(&LocaleTag::new("es", Some("mx"))));

        let botany = repo.schema_languages(LocaleScope::Discipline, 7).unwrap();
        assert_eq!(botany, vec![LocaleTag::new("fr", None)]);
    }

    #[test]
    fn test_schema_languages_are_sorted() {
        let conn = seeded_db();
        let repo = LocaleRepository::new(&conn);

        let languages = repo.schema_languages(LocaleScope::Global, 3).unwrap();
        let names: Vec<String> = languages.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["en", "es", "es-mx", "es-mx-x", "fr"]);
    }
}
