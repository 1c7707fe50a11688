//! turnstile CLI
//!
//! Command-line interface over the Database facade: execute statements,
//! run queries, and filter tables with the JSON filter syntax.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use turnstile::{Database, NamedParams, Row, SelectOptions};

/// Ordered query construction and scheduling over embedded SQLite
#[derive(Parser)]
#[command(name = "turnstile")]
#[command(about = "Ordered query construction and scheduling over embedded SQLite", long_about = None)]
#[command(version)]
struct Cli {
    /// Database path (overrides TURNSTILE_DB_PATH)
    #[arg(long, env = "TURNSTILE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Print rows as JSON lines instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a DML/DDL statement
    Exec {
        /// SQL statement
        sql: String,
    },

    /// Run a query and print its rows
    Query {
        /// SQL query
        sql: String,
    },

    /// Select rows from a table with an optional JSON filter
    Select {
        /// Table name
        table: String,

        /// Filter tree, e.g. '{"age":{"operator":">=","value":18}}'
        #[arg(long)]
        filter: Option<String>,

        /// Comma-separated projection
        #[arg(long)]
        columns: Option<String>,

        /// Raw ORDER BY term, e.g. "age DESC"
        #[arg(long)]
        order_by: Option<String>,

        /// Row limit
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Insert a JSON object as a row
    Insert {
        /// Table name
        table: String,

        /// Row data as a JSON object
        data: String,
    },

    /// Count rows matching an optional JSON filter
    Count {
        /// Table name
        table: String,

        /// Filter tree
        #[arg(long)]
        filter: Option<String>,
    },

    /// Execute a multi-statement SQL script file
    Script {
        /// Path to a .sql file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = cli
        .db_path
        .clone()
        .unwrap_or_else(turnstile::config::default_db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let db = Database::open(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;

    match cli.command {
        Commands::Exec { sql } => {
            let affected = db.execute(sql, NamedParams::new()).await?;
            println!("{affected} row(s) affected");
        }
        Commands::Query { sql } => {
            let rows = db.query(sql, NamedParams::new()).await?;
            print_rows(&rows, cli.json);
        }
        Commands::Select {
            table,
            filter,
            columns,
            order_by,
            limit,
        } => {
            let mut opts = SelectOptions::default();
            if let Some(filter) = filter {
                let value: Value =
                    serde_json::from_str(&filter).context("parsing --filter JSON")?;
                opts = opts.filter(value);
            }
            if let Some(columns) = columns {
                opts = opts.columns(columns.split(',').map(str::trim));
            }
            if let Some(order_by) = order_by {
                opts = opts.order_by(order_by);
            }
            if let Some(limit) = limit {
                opts = opts.limit(limit);
            }
            let rows = db.select(&table, &opts)?.await?;
            print_rows(&rows, cli.json);
        }
        Commands::Insert { table, data } => {
            let row: Value = serde_json::from_str(&data).context("parsing row JSON")?;
            let rowid = db.insert(&table, &row)?.await?;
            println!("inserted rowid {rowid}");
        }
        Commands::Count { table, filter } => {
            let filter = match filter {
                Some(text) => {
                    Some(serde_json::from_str::<Value>(&text).context("parsing --filter JSON")?)
                }
                None => None,
            };
            let n = db.count(&table, filter.as_ref())?.await?;
            println!("{n}");
        }
        Commands::Script { file } => {
            db.execute_script_file(&file)
                .with_context(|| format!("reading {}", file.display()))?
                .await?;
            println!("script executed");
        }
    }

    Ok(())
}

/// Print rows as an aligned table, or as JSON lines with `--json`.
fn print_rows(rows: &[Row], json: bool) {
    if json {
        for row in rows {
            println!("{}", Value::Object(row.clone()));
        }
        return;
    }
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }

    let columns: Vec<&String> = rows[0].keys().collect();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let text = match row.get(*column) {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    };
                    widths[i] = widths[i].max(text.len());
                    text
                })
                .collect()
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    println!("{}", header.join("  "));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
    println!("({} row(s))", rows.len());
}
