use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use kintree::db::{migrate, Db};
use kintree::error::KintreeError;
use kintree::store::{self, PersonInput};
use kintree::Config;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Load a family definition JSON into the Kintree database")]
struct Args {
    /// Path to the family JSON file
    #[arg(short, long)]
    file: PathBuf,

    /// Delete existing persons and relationships first
    #[arg(long)]
    reset: bool,
}

/// Seed file layout: persons are inserted in order (ids are assigned
/// sequentially on a fresh database), relations reference those ids.
#[derive(Debug, Deserialize)]
struct SeedFile {
    persons: Vec<SeedPerson>,
    #[serde(default)]
    relations: Vec<SeedRelation>,
}

#[derive(Debug, Deserialize)]
struct SeedPerson {
    first_name: String,
    last_name: String,
    gender: String,
    dob: String,
}

#[derive(Debug, Deserialize)]
struct SeedRelation {
    parent_id: i64,
    child_id: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    if args.reset {
        log::info!("Resetting existing persons and relationships");
        db.with_connection(|conn| {
            conn.execute("DELETE FROM relationships", [])?;
            conn.execute("DELETE FROM persons", [])?;
            Ok(())
        })
        .await?;
    }

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read seed file: {}", args.file.display()))?;
    let seed: SeedFile = serde_json::from_str(&raw).context("Failed to parse seed file")?;

    for person in seed.persons {
        let dob = NaiveDate::parse_from_str(&person.dob, "%Y-%m-%d").with_context(|| {
            format!(
                "Invalid dob '{}' for {} {}",
                person.dob, person.first_name, person.last_name
            )
        })?;
        let inserted = store::insert_person(
            &db,
            PersonInput {
                first_name: person.first_name,
                last_name: person.last_name,
                gender: person.gender,
                dob,
            },
        )
        .await?;
        log::info!(
            "Seeded person {} {} as id {}",
            inserted.first_name,
            inserted.last_name,
            inserted.id
        );
    }

    let mut linked = 0;
    let mut skipped = 0;
    for relation in seed.relations {
        if store::person_by_id(&db, relation.parent_id).await?.is_none()
            || store::person_by_id(&db, relation.child_id).await?.is_none()
        {
            log::warn!(
                "Skipping relation {} -> {}: endpoint missing",
                relation.parent_id,
                relation.child_id
            );
            skipped += 1;
            continue;
        }
        match store::insert_relation(&db, relation.parent_id, relation.child_id).await {
            Ok(_) => linked += 1,
            Err(KintreeError::RelationExists { .. }) => {
                log::warn!(
                    "Skipping duplicate relation {} -> {}",
                    relation.parent_id,
                    relation.child_id
                );
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("Seeding complete: {} relations created, {} skipped", linked, skipped);
    Ok(())
}
