use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rustmapper::memory::{MemoryClient, TableDef};
use rustmapper::{DbMap, DialectKind, MapperConfig, Record, SqlExecutor, SqlExecutorExt, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rustmapper")]
#[command(about = "Inspect generated statements and try the mapper against the in-memory driver")]
struct Cli {
    /// Log every statement sent to the driver
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the statements generated for a sample versioned table
    Plan {
        #[arg(long, default_value = "sqlite")]
        dialect: String,
    },
    /// Run an optimistic locking walkthrough
    Demo,
}

#[derive(Debug, Default, Clone, Record)]
struct Person {
    id: i64,
    #[record(column = "first_name")]
    fname: String,
    #[record(column = "last_name")]
    lname: String,
    version: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.trace { "rustmapper=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Command::Plan { dialect } => print_plans(&dialect, cli.trace),
        Command::Demo => run_demo(cli.trace).await,
    }
}

fn person_map(client: Arc<MemoryClient>, config: MapperConfig) -> Result<DbMap> {
    let mut dbmap = DbMap::with_config(client, config);
    dbmap
        .add_table_with_name::<Person>("persons")
        .set_keys(true, &["id"])?
        .set_version_col("version")?;
    Ok(dbmap)
}

fn print_plans(dialect: &str, trace: bool) -> Result<()> {
    let kind: DialectKind = dialect
        .parse()
        .with_context(|| format!("Unsupported dialect '{}'", dialect))?;
    let config = MapperConfig::new(kind).trace_statements(trace);
    let dbmap = person_map(Arc::new(MemoryClient::new()), config)?;

    let table = dbmap.table::<Person>()?;
    let dialect = dbmap.dialect();
    println!("-- {} ({})", table.table_name(), kind);
    println!("insert: {}", table.insert_plan(dialect).query());
    println!("update: {}", table.update_plan(dialect).query());
    println!("delete: {}", table.delete_plan(dialect).query());
    println!("get:    {}", table.get_plan(dialect).query());
    Ok(())
}

async fn run_demo(trace: bool) -> Result<()> {
    let client = Arc::new(MemoryClient::new());
    client.create_table(
        TableDef::new("persons")
            .auto_increment("id")
            .columns(["first_name", "last_name", "version"]),
    )?;

    let config = MapperConfig::new(DialectKind::Sqlite).trace_statements(trace);
    let dbmap = person_map(Arc::clone(&client), config)?;

    let mut person = Person {
        fname: "Ada".into(),
        lname: "Lovelace".into(),
        ..Default::default()
    };
    dbmap.insert(&mut [&mut person]).await?;
    println!("inserted {:?}", person);

    let mut first = dbmap
        .get_one::<Person>(&[Value::Integer(person.id)])
        .await?
        .context("inserted person not found")?;
    let mut second = first.clone();

    first.lname = "King".into();
    let count = dbmap.update(&mut [&mut first]).await?;
    println!("first copy updated {} row(s), now at version {}", count, first.version);

    second.lname = "Byron".into();
    match dbmap.update(&mut [&mut second]).await {
        Err(err) if err.is_optimistic_lock() => println!("second copy rejected: {}", err),
        Err(err) => return Err(err.into()),
        Ok(_) => bail!("stale update was accepted"),
    }

    let count = dbmap.delete(&mut [&mut first]).await?;
    println!("deleted {} row(s)", count);

    match dbmap.delete(&mut [&mut first]).await {
        Err(err) if err.is_optimistic_lock() => println!("second delete rejected: {}", err),
        Err(err) => return Err(err.into()),
        Ok(_) => bail!("delete of a vanished row was accepted"),
    }

    let mut other = Person {
        fname: "Charles".into(),
        lname: "Babbage".into(),
        ..Default::default()
    };
    dbmap.insert(&mut [&mut other]).await?;
    dbmap
        .query("select * from persons order by id", &[])
        .await?
        .print();

    println!("statements run:");
    for sql in client.statement_log() {
        println!("  {}", sql);
    }
    Ok(())
}
