use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use catalog_lookup::db::{self, PgSectionStore};
use catalog_lookup::{report, Catalog, CatalogConfig};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "catalog-lookup")]
#[command(about = "Course catalog search and professor rating lookup", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CatalogConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Search courses by keyword, course code or subject
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Also write the results as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Also write a markdown report
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Resolve a professor name to an instructor rating
    #[command(group(
        ArgGroup::new("scope")
            .args(["subject", "course"])
            .multiple(false)
    ))]
    Professor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Best-rated instructor for each course code
    Ratings {
        #[arg(required = true)]
        codes: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// List subject prefixes in the catalog
    Subjects {
        #[arg(long)]
        json: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.config.validate().context("invalid catalog configuration")?;

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the course catalog Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.config.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = Arc::new(PgSectionStore::new(pool.clone()));
    let catalog = Catalog::new(store, &cli.config)?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Search {
            query,
            subject,
            limit,
            csv,
            report: report_path,
            json,
        } => {
            let response = catalog
                .search_courses(query.as_deref(), subject.as_deref(), limit)
                .await?;
            info!(
                count = response.count,
                strategy = response.strategy.as_str(),
                "search complete"
            );

            if let Some(path) = &csv {
                report::write_csv(&response, path)?;
                println!("CSV written to {}.", path.display());
            }
            if let Some(path) = &report_path {
                let markdown = report::build_search_report(&response, chrono::Utc::now());
                std::fs::write(path, markdown)?;
                println!("Report written to {}.", path.display());
            }

            if json {
                print_json(&response)?;
            } else if response.courses.is_empty() {
                println!("No courses matched this search.");
            } else {
                println!("Matching courses:");
                for course in &response.courses {
                    println!("- {}", report::course_line(course));
                }
            }
        }
        Commands::Professor {
            name,
            subject,
            course,
            json,
        } => {
            let lookup = match &course {
                Some(code) => catalog.resolve_professor_for_course(&name, code).await?,
                None => catalog.resolve_professor_by_name(&name, subject.as_deref()).await?,
            };

            if json {
                print_json(&lookup)?;
            } else {
                println!("{}", report::professor_line(&lookup));
            }
        }
        Commands::Ratings { codes, json } => {
            let ratings = catalog.resolve_professors_bulk(&codes).await?;
            if json {
                print_json(&ratings)?;
            } else {
                for line in report::bulk_lines(&ratings) {
                    println!("- {line}");
                }
            }
        }
        Commands::Subjects { json } => {
            let subjects = catalog.list_subjects().await?;
            if json {
                print_json(&subjects)?;
            } else {
                println!("{} subjects: {}", subjects.count, subjects.subjects.join(", "));
            }
        }
    }

    for stats in catalog.cache_stats() {
        debug!(
            cache = stats.name,
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            "cache statistics"
        );
    }

    Ok(())
}
