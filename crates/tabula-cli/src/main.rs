//! Tabula CLI - Probe and query tables behind a locator

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datafusion::prelude::SessionContext;
use tabula_connectors::{default_registry, register_adapter, AdapterRegistry, FetchConfig};
use tabula_core::{conditions_to_bounds, Bounds, FilterCondition, RequestedOrder};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Query HTML tables as typed, filterable data")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every adapter whether it can serve a locator
    Probe {
        /// Locator, e.g. https://example.com/page#1
        uri: String,

        /// Only run the cheap check (no network access)
        #[arg(long)]
        fast: bool,
    },

    /// Print the queryable columns of a table
    Columns {
        uri: String,
    },

    /// Print matching rows as JSON lines
    Query {
        uri: String,

        /// Filter condition as JSON, e.g. '{"column":"price","op":"gt","value":10}'
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Sort key as col, col:asc or col:desc (repeatable, most significant first)
        #[arg(short, long = "order")]
        orders: Vec<String>,

        /// Stop after this many rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run SQL over the table, registered as `t`
    Sql {
        uri: String,

        /// Query text
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = FetchConfig::from_env()?;
    let registry = default_registry(config)?;

    match cli.command {
        Commands::Probe { uri, fast } => {
            probe(&registry, &uri, fast).await;
        }
        Commands::Columns { uri } => {
            show_columns(&registry, &uri).await?;
        }
        Commands::Query {
            uri,
            filters,
            orders,
            limit,
        } => {
            run_query(&registry, &uri, &filters, &orders, limit).await?;
        }
        Commands::Sql { uri, query } => {
            run_sql(&registry, &uri, &query).await?;
        }
    }

    Ok(())
}

async fn probe(registry: &AdapterRegistry, uri: &str, fast: bool) {
    for factory in registry.factories() {
        let support = factory.supports(uri, fast).await;
        let (source, index) = factory.parse_uri(uri);
        println!(
            "{}",
            serde_json::json!({
                "adapter": factory.name(),
                "support": support,
                "source": source,
                "table": index,
            })
        );
    }
}

async fn show_columns(registry: &AdapterRegistry, uri: &str) -> Result<()> {
    let adapter = registry.open(uri).await?;
    let columns = adapter.get_columns();
    println!("{}", serde_json::to_string_pretty(columns)?);
    Ok(())
}

async fn run_query(
    registry: &AdapterRegistry,
    uri: &str,
    filters: &[String],
    orders: &[String],
    limit: Option<usize>,
) -> Result<()> {
    let conditions = parse_conditions(filters)?;
    let order = orders
        .iter()
        .map(String::as_str)
        .map(parse_order)
        .collect::<Result<Vec<_>>>()?;

    let adapter = registry.open(uri).await?;
    let bounds = conditions_to_bounds(&conditions, adapter.get_columns())?;
    info!(
        "Querying with {} filter(s), estimated cost {}",
        bounds.len(),
        adapter.get_cost(&bounds, &order)
    );

    let rows = adapter.get_data(&bounds, &order)?;
    for row in rows.take(limit.unwrap_or(usize::MAX)) {
        println!("{}", serde_json::to_string(&row)?);
    }
    Ok(())
}

async fn run_sql(registry: &AdapterRegistry, uri: &str, query: &str) -> Result<()> {
    let adapter = registry.open(uri).await?;
    let ctx = SessionContext::new();
    register_adapter(&ctx, "t", adapter.as_ref(), &Bounds::new(), &[]).await?;
    let df = ctx.sql(query).await?;
    df.show().await?;
    Ok(())
}

fn parse_conditions(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters
        .iter()
        .map(|f| {
            serde_json::from_str(f).with_context(|| format!("Invalid filter condition: {}", f))
        })
        .collect()
}

/// `col`, `col:asc` or `col:desc`. A suffix that is not a direction is part
/// of the column name.
fn parse_order(spec: &str) -> Result<(String, RequestedOrder)> {
    if let Some((column, direction)) = spec.rsplit_once(':') {
        if let Ok(direction) = direction.parse::<RequestedOrder>() {
            if column.is_empty() {
                anyhow::bail!("Missing column in order spec: {}", spec);
            }
            return Ok((column.to_string(), direction));
        }
    }
    if spec.is_empty() {
        anyhow::bail!("Empty order spec");
    }
    Ok((spec.to_string(), RequestedOrder::Ascending))
}
