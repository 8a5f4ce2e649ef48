//! HTTP routing table
//!
//! Routes are declared as data. The server binary only does socket I/O and
//! hands matched requests to [`dispatch`].

use crate::config::Config;
use crate::db::{LocaleRepository, SchemaRepository};
use crate::error::{LocalizationError, Result};
use crate::localization::{get_schema_localization, load_schema_localization, SchemaLocalization, SchemaType};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SchemaLocalization,
    SchemaLanguages,
    ApiSchema,
    ApiEndpoints,
}

impl Endpoint {
    pub fn needs_database(self) -> bool {
        matches!(
            self,
            Endpoint::SchemaLocalization | Endpoint::SchemaLanguages | Endpoint::ApiSchema
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryParam {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub path: &'static str,
    pub endpoint: Endpoint,
    pub summary: &'static str,
    /// Listed by `/api/endpoints/`; documentation routes are not
    pub public: bool,
    pub params: &'static [QueryParam],
}

const LANG_PARAM: QueryParam = QueryParam {
    name: "lang",
    description: "Requested locale, `language` or `language-COUNTRY` (default `en`)",
    required: false,
};

const SCHEMA_TYPE_PARAM: QueryParam = QueryParam {
    name: "schematype",
    description: "0 (core) or 1 (workbench), default 0",
    required: false,
};

const COLLECTION_PARAM: QueryParam = QueryParam {
    name: "collectionid",
    description: "Collection whose discipline is described (default from DEFAULT_COLLECTION_ID)",
    required: false,
};

pub const ROUTES: &[Route] = &[
    Route {
        path: "/context/schema_localization.json",
        endpoint: Endpoint::SchemaLocalization,
        summary: "Localized names and descriptions of schema containers and their fields",
        public: true,
        params: &[LANG_PARAM, COLLECTION_PARAM, SCHEMA_TYPE_PARAM],
    },
    Route {
        path: "/context/schema/language",
        endpoint: Endpoint::SchemaLanguages,
        summary: "Locales available in the schema localization tables",
        public: true,
        params: &[COLLECTION_PARAM],
    },
    Route {
        path: "/api/schema",
        endpoint: Endpoint::ApiSchema,
        summary: "Data model document: one schema per container with its fields",
        public: false,
        params: &[LANG_PARAM, COLLECTION_PARAM, SCHEMA_TYPE_PARAM],
    },
    Route {
        path: "/api/endpoints",
        endpoint: Endpoint::ApiEndpoints,
        summary: "Documentation of the data endpoints",
        public: false,
        params: &[],
    },
];

/// Find the route for a request path (trailing slashes ignored)
pub fn match_route(path: &str) -> Option<&'static Route> {
    let normalized = path.trim_end_matches('/');
    ROUTES.iter().find(|route| route.path == normalized)
}

/// Decode a `key=value&...` query string
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 2;
                }
                _ => out.push(b'%'),
            },
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    fn from_error(err: &LocalizationError) -> Self {
        let status = match err {
            LocalizationError::InvalidSchemaType(_) | LocalizationError::InvalidParameter(_) => 400,
            LocalizationError::CollectionNotFound(_) => 404,
            _ => 500,
        };
        Self {
            status,
            body: json!({ "error": err.to_string() }).to_string(),
        }
    }
}

/// Run an endpoint. `open` is only called for endpoints that read the database.
pub fn dispatch<F>(
    endpoint: Endpoint,
    params: &HashMap<String, String>,
    config: &Config,
    open: F,
) -> ApiResponse
where
    F: FnOnce() -> Result<Connection>,
{
    let result = match endpoint {
        Endpoint::ApiEndpoints => Ok(api_endpoints(false).to_string()),
        Endpoint::ApiSchema => open().and_then(|conn| api_schema(&conn, params, config)),
        Endpoint::SchemaLocalization => open().and_then(|conn| schema_localization(&conn, params, config)),
        Endpoint::SchemaLanguages => open().and_then(|conn| schema_languages(&conn, params, config)),
    };

    match result {
        Ok(body) => ApiResponse::ok(body),
        Err(err) => ApiResponse::from_error(&err),
    }
}

fn collection_id(params: &HashMap<String, String>, config: &Config) -> Result<i64> {
    match params.get("collectionid") {
        Some(raw) => raw.trim().parse().map_err(|_| {
            LocalizationError::InvalidParameter(format!("collectionid must be an integer, got '{}'", raw))
        }),
        None => config.default_collection_id.ok_or_else(|| {
            LocalizationError::InvalidParameter("collectionid is required".to_string())
        }),
    }
}

fn schema_localization(conn: &Connection, params: &HashMap<String, String>, config: &Config) -> Result<String> {
    let collection = SchemaRepository::new(conn).find_collection(collection_id(params, config)?)?;
    let schema_type: SchemaType = params.get("schematype").map(String::as_str).unwrap_or("0").parse()?;
    let lang = params.get("lang").map(String::as_str).unwrap_or("en");

    get_schema_localization(conn, &collection, schema_type, lang, config.locale_scope)
}

fn schema_languages(conn: &Connection, params: &HashMap<String, String>, config: &Config) -> Result<String> {
    let collection = SchemaRepository::new(conn).find_collection(collection_id(params, config)?)?;
    let languages = LocaleRepository::new(conn).schema_languages(config.locale_scope, collection.discipline_id)?;
    Ok(serde_json::to_string(&languages)?)
}

fn api_schema(conn: &Connection, params: &HashMap<String, String>, config: &Config) -> Result<String> {
    let collection = SchemaRepository::new(conn).find_collection(collection_id(params, config)?)?;
    let schema_type: SchemaType = params.get("schematype").map(String::as_str).unwrap_or("0").parse()?;
    let lang = params.get("lang").map(String::as_str).unwrap_or("en");

    let containers = load_schema_localization(conn, &collection, schema_type, lang, config.locale_scope)?;
    Ok(schema_document(&containers).to_string())
}

/// OpenAPI `components.schemas` map with one object schema per container
pub fn schema_document(containers: &SchemaLocalization) -> Value {
    let mut schemas = serde_json::Map::new();
    for (container_name, container) in containers {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for (item_key, item) in &container.items {
            let mut property = json_type(item.kind.as_deref());
            property.insert("title".to_string(), json!(item.name));
            property.insert("description".to_string(), json!(item.description));
            if item.is_hidden {
                property.insert("x-hidden".to_string(), json!(true));
            }
            if let Some(pick_list) = &item.pick_list_name {
                property.insert("x-picklist".to_string(), json!(pick_list));
            }
            properties.insert(item_key.clone(), Value::Object(property));

            if item.is_required {
                required.push(json!(item_key));
            }
        }

        schemas.insert(
            container_name.clone(),
            json!({
                "type": "object",
                "title": container.name,
                "description": container.description,
                "properties": Value::Object(properties),
                "required": required,
            }),
        );
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Schema localization data model",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {},
        "components": { "schemas": Value::Object(schemas) },
    })
}

// Field types are stored as Java class names
fn json_type(kind: Option<&str>) -> serde_json::Map<String, Value> {
    let (ty, format) = match kind.unwrap_or_default() {
        "java.lang.Integer" | "java.lang.Short" | "java.lang.Long" | "java.lang.Byte" => ("integer", None),
        "java.lang.Float" | "java.lang.Double" | "java.math.BigDecimal" => ("number", None),
        "java.lang.Boolean" => ("boolean", None),
        "java.util.Calendar" | "java.util.Date" => ("string", Some("date")),
        "java.sql.Timestamp" => ("string", Some("date-time")),
        _ => ("string", None),
    };

    let mut property = serde_json::Map::new();
    property.insert("type".to_string(), json!(ty));
    if let Some(format) = format {
        property.insert("format".to_string(), json!(format));
    }
    property
}

/// OpenAPI-style description of the routing table
pub fn api_endpoints(include_internal: bool) -> Value {
    let mut paths = serde_json::Map::new();
    for route in ROUTES.iter().filter(|r| include_internal || r.public) {
        let parameters: Vec<Value> = route
            .params
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "in": "query",
                    "required": p.required,
                    "description": p.description,
                    "schema": { "type": "string" },
                })
            })
            .collect();

        paths.insert(
            route.path.to_string(),
            json!({
                "get": {
                    "summary": route.summary,
                    "parameters": parameters,
                    "responses": {
                        "200": { "description": "OK", "content": { "application/json": {} } }
                    }
                }
            }),
        );
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Schema localization API",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": Value::Object(paths),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::seeded_db;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_match_route() {
        assert_eq!(
            match_route("/context/schema/language/").map(|r| r.endpoint),
            Some(Endpoint::SchemaLanguages)
        );
        assert_eq!(
            match_route("/context/schema_localization.json").map(|r| r.endpoint),
            Some(Endpoint::SchemaLocalization)
        );
        assert_eq!(match_route("/api/schema/").map(|r| r.endpoint), Some(Endpoint::ApiSchema));
        assert_eq!(match_route("/api/endpoints/").map(|r| r.endpoint), Some(Endpoint::ApiEndpoints));
        assert!(match_route("/context/api_endpoints.json").is_none());
        assert!(match_route("/context/nope.json").is_none());
    }

    #[test]
    fn test_parse_query() {
        let q = parse_query("lang=es-MX&collectionid=4&name=a+b%20c&flag");
        assert_eq!(q["lang"], "es-MX");
        assert_eq!(q["collectionid"], "4");
        assert_eq!(q["name"], "a b c");
        assert_eq!(q["flag"], "");
    }

    #[test]
    fn test_docs_do_not_open_the_database() {
        let response = dispatch(Endpoint::ApiEndpoints, &HashMap::new(), &Config::default(), || {
            panic!("docs must not touch the database")
        });
        assert_eq!(response.status, 200);

        let doc: Value = serde_json::from_str(&response.body).unwrap();
        assert!(doc["paths"]["/context/schema_localization.json"].is_object());
        assert!(doc["paths"]["/context/schema/language"].is_object());
        assert!(doc["paths"]["/api/endpoints"].is_null());
        assert!(doc["paths"]["/api/schema"].is_null());

        let all = api_endpoints(true);
        assert_eq!(all["paths"].as_object().unwrap().len(), ROUTES.len());
    }

    #[test]
    fn test_schema_document_from_containers() {
        let response = dispatch(
            Endpoint::ApiSchema,
            &params(&[("collectionid", "4")]),
            &Config::default(),
            || Ok(seeded_db()),
        );
        assert_eq!(response.status, 200);

        let doc: Value = serde_json::from_str(&response.body).unwrap();
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        let names: Vec<&str> = schemas.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Accession", "Collectionobject"]);

        let co = &schemas["Collectionobject"];
        assert_eq!(co["type"], json!("object"));
        assert_eq!(co["title"], json!("Collection Object"));
        assert_eq!(co["description"], json!("Collectionobject"));
        assert_eq!(co["required"], json!(["catalognumber"]));
        assert_eq!(co["properties"]["catalognumber"]["title"], json!("Catalog #"));
        assert_eq!(co["properties"]["catalognumber"]["type"], json!("string"));
        assert_eq!(co["properties"]["remarks"]["x-hidden"], json!(true));
        assert_eq!(
            schemas["Accession"]["properties"]["accessionnumber"]["x-picklist"],
            json!("AccessionStatus")
        );
    }

    #[test]
    fn test_localization_endpoint() {
        let response = dispatch(
            Endpoint::SchemaLocalization,
            &params(&[("lang", "es-MX"), ("collectionid", "4")]),
            &Config::default(),
            || Ok(seeded_db()),
        );
        assert_eq!(response.status, 200);
        let doc: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(doc["Collectionobject"]["name"], json!("Objeto de colección (MX)"));
    }

    #[test]
    fn test_error_statuses() {
        let config = Config::default();

        let missing = dispatch(Endpoint::SchemaLocalization, &HashMap::new(), &config, || Ok(seeded_db()));
        assert_eq!(missing.status, 400);

        let bad_type = dispatch(
            Endpoint::SchemaLocalization,
            &params(&[("collectionid", "4"), ("schematype", "9")]),
            &config,
            || Ok(seeded_db()),
        );
        assert_eq!(bad_type.status, 400);

        let unknown = dispatch(
            Endpoint::SchemaLanguages,
            &params(&[("collectionid", "404")]),
            &config,
            || Ok(seeded_db()),
        );
        assert_eq!(unknown.status, 404);
    }

    #[test]
    fn test_default_collection_from_config() {
        let config = Config {
            default_collection_id: Some(9),
            ..Config::default()
        };
        let response = dispatch(Endpoint::SchemaLanguages, &HashMap::new(), &config, || Ok(seeded_db()));
        assert_eq!(response.status, 200);
        let languages: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(languages.as_array().unwrap().len(), 5);
    }
}
