use schema_localization::config::Config;
use schema_localization::db::{open_connection, open_read_only, LocaleRepository, SchemaRepository};
use schema_localization::localization::{get_schema_localization, SchemaType};
use schema_localization::migrations::MigrationRunner;
use schema_localization::routes::{api_endpoints, ROUTES};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-l10n")]
#[command(about = "Localized schema labels for collection databases")]
#[command(version)]
struct Args {
    /// Path to the SQLite database (or set DATABASE_PATH)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the localization document for a collection
    Localize {
        /// Collection id (or set DEFAULT_COLLECTION_ID)
        #[arg(short, long)]
        collection: Option<i64>,

        /// Requested locale, e.g. en-US or fr
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Schema type: 0/core or 1/workbench
        #[arg(short, long, default_value = "0")]
        schema_type: String,

        /// Pretty-print the JSON document
        #[arg(long)]
        pretty: bool,
    },
    /// List the locales available for a collection's discipline
    Languages {
        /// Collection id (or set DEFAULT_COLLECTION_ID)
        #[arg(short, long)]
        collection: Option<i64>,
    },
    /// Apply pending schema migrations
    Migrate,
    /// Print the routing table documentation
    Routes {
        /// Include internal routes
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    match args.command {
        Commands::Localize {
            collection,
            lang,
            schema_type,
            pretty,
        } => {
            let conn = open_read_only(&config.database_path)?;
            let collection = SchemaRepository::new(&conn).find_collection(collection_or_default(collection, &config)?)?;
            let schema_type: SchemaType = schema_type.parse()?;

            let json = get_schema_localization(&conn, &collection, schema_type, &lang, config.locale_scope)?;
            if pretty {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", json);
            }
        }
        Commands::Languages { collection } => {
            let conn = open_read_only(&config.database_path)?;
            let collection = SchemaRepository::new(&conn).find_collection(collection_or_default(collection, &config)?)?;

            let languages = LocaleRepository::new(&conn).schema_languages(config.locale_scope, collection.discipline_id)?;
            for tag in languages {
                println!("{}", tag);
            }
        }
        Commands::Migrate => {
            info!("Migrating {}", config.database_path.display());
            let mut conn = open_connection(&config.database_path)?;
            let applied = MigrationRunner::new(&mut conn).apply_pending()?;
            if applied.is_empty() {
                println!("No migrations to apply.");
            } else {
                for name in applied {
                    println!("Applied {}", name);
                }
            }
        }
        Commands::Routes { all } => {
            for route in ROUTES.iter().filter(|r| all || r.public) {
                info!("{} -> {:?}", route.path, route.endpoint);
            }
            println!("{}", serde_json::to_string_pretty(&api_endpoints(all))?);
        }
    }

    Ok(())
}

fn collection_or_default(collection: Option<i64>, config: &Config) -> Result<i64> {
    collection
        .or(config.default_collection_id)
        .ok_or_else(|| anyhow::anyhow!("no collection given; pass --collection or set DEFAULT_COLLECTION_ID"))
}
