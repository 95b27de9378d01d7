use anyhow::Result;
use kintree::db::{migrate, Db};
use kintree::http::HttpServer;
use kintree::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "verify" => {
            run_schema_verification().await?;
        }
        "serve" | _ => {
            run_server().await?;
        }
    }

    Ok(())
}

/// Open the database and bring the schema up to date
async fn init_db(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;
    Ok(db)
}

/// Run the HTTP server
async fn run_server() -> Result<()> {
    log::info!("Starting Kintree v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Database path: {}", config.db_path().display());

    let db = init_db(&config).await?;
    log::info!("Database initialized successfully");

    let server = HttpServer::new(db, &config);
    server.run(config.server.port).await?;

    Ok(())
}

/// Run database schema verification
async fn run_schema_verification() -> Result<()> {
    log::info!("Verifying Kintree database schema");

    let config = Config::load()?;
    let db = init_db(&config).await?;

    verify_database_schema(&db).await?;

    log::info!("Database ready");
    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use kintree::error::KintreeError;

    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for table in ["persons", "relationships", "schema_migrations"] {
            if !tables.iter().any(|t| t == table) {
                return Err(KintreeError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("Table exists: {}", table);
        }

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index in ["idx_relationships_parent", "idx_relationships_child"] {
            if !indexes.iter().any(|i| i == index) {
                return Err(KintreeError::Config(format!("Missing index: {}", index)));
            }
            log::debug!("Index exists: {}", index);
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(KintreeError::Config(format!(
                "Journal mode is not WAL: {}",
                journal_mode
            )));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(KintreeError::Config(format!(
                "Database integrity check failed: {}",
                integrity
            )));
        }
        log::info!("Database integrity: OK");

        Ok(())
    })
    .await?;

    Ok(())
}
