//! `QueryBench` CLI
//!
//! Interactive query builder over a SQL RPC endpoint.
//!
//! ## Usage
//!
//! ```bash
//! # REPL against the configured endpoint
//! cargo run --bin querybench
//!
//! # One-shot raw SQL
//! cargo run --bin querybench -- --sql "SELECT now()"
//!
//! # Explicit config file and endpoint
//! cargo run --bin querybench -- --config ./querybench.toml --url http://localhost:54321/rest/v1/rpc/exec_sql
//! ```
//!
//! Tracing is off by default. `QB_TRACE=1` writes to `qb_trace.log`
//! (override with `QB_TRACE_FILE`); `QB_TRACE_LEVEL` and `QB_TRACE_JSON`
//! fall back to the `[logging]` section.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use querybench::config::LoggingConfig;
use querybench::descriptor::{FilterQuery, OrderDirection, QueryDescriptor};
use querybench::filter::{FilterClause, FilterSet, Operator};
use querybench::history::HistoryOutcome;
use querybench::session::{EmptyState, QuerySession, ResultState};
use querybench::value::Row;
use querybench::{Config, ExecutionResult, HttpEndpoint, TracingNotifier};

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Widest a result cell is printed before truncation
const MAX_CELL_WIDTH: usize = 40;

/// Interactive query builder for a SQL RPC endpoint
#[derive(Parser, Debug)]
#[command(name = "querybench")]
#[command(version)]
#[command(about = "Build, run and save queries against a SQL RPC endpoint", long_about = None)]
struct Cli {
    /// Configuration file (default: config.toml + config.local.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Endpoint URL, overrides `endpoint.url`
    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// API key, overrides `endpoint.api_key`
    #[arg(long = "api-key")]
    api_key: Option<String>,

    /// Execute raw SQL, print the result and exit
    #[arg(short = 's', long = "sql")]
    sql: Option<String>,
}

/// The query `.run` executes
#[derive(Debug, Clone)]
enum Draft {
    Filter(FilterQuery),
    Raw(String),
}

struct ReplState {
    session: QuerySession<HttpEndpoint>,
    draft: Option<Draft>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).with_context(|| format!("Failed to load config '{path}'"))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(url) = cli.url {
        config.endpoint.url = url;
    }
    if let Some(key) = cli.api_key {
        config.endpoint.api_key = Some(key);
    }

    init_tracing(&config.logging);

    let endpoint = Arc::new(HttpEndpoint::new(&config.endpoint).context("Invalid endpoint configuration")?);
    let session = QuerySession::new(config, endpoint, Arc::new(TracingNotifier))?;

    if let Some(sql) = cli.sql {
        let result = session.run(QueryDescriptor::raw(sql)).await;
        print_result(&session, &result);
        if result.failure().is_some() {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("QueryBench");
    println!("==========");
    println!("Endpoint: {}", session.config().endpoint.url);
    println!("Type .help for commands.");
    println!();

    let mut state = ReplState { session, draft: None };
    run_repl(&mut state).await
}

fn init_tracing(logging_config: &LoggingConfig) {
    let enabled = env::var("QB_TRACE").ok().is_some_and(|v| v != "0");
    if !enabled {
        return;
    }

    let log_path = env::var("QB_TRACE_FILE").unwrap_or_else(|_| "qb_trace.log".to_string());

    let json = env::var("QB_TRACE_JSON")
        .ok()
        .map_or_else(|| logging_config.format == "json", |v| v != "0");

    let level = env::var("QB_TRACE_LEVEL")
        .ok()
        .unwrap_or_else(|| logging_config.level.clone());

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("ERROR: Unable to open QB_TRACE_FILE '{log_path}': {e}");
            return;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let _ = TRACE_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking.clone())
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run_repl(state: &mut ReplState) -> Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to start line editor")?;

    loop {
        let prompt = match &state.draft {
            Some(Draft::Filter(q)) => format!("querybench:{}> ", q.table),
            _ => "querybench> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match handle_command(state, line).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Use .quit to exit");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }
    Ok(())
}

/// Run one REPL line. Returns false to exit.
async fn handle_command(state: &mut ReplState, line: &str) -> Result<bool> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let session = &state.session;

    match command {
        ".quit" | ".exit" | ".q" => return Ok(false),
        ".help" => print_help(),
        ".tables" => {
            if let Ok(tables) = session.tables().await {
                for table in tables {
                    println!("  {}", table.name);
                }
            }
        }
        ".columns" => {
            let table = required(rest, ".columns <table>")?;
            match session.columns(table).await {
                Ok(columns) => {
                    for col in columns.iter() {
                        let nullable = if col.is_nullable { "" } else { " NOT NULL" };
                        let default = col
                            .default_expr
                            .as_deref()
                            .map(|d| format!(" DEFAULT {d}"))
                            .unwrap_or_default();
                        println!("  {} {}{nullable}{default}", col.name, col.data_type);
                    }
                }
                Err(e) => println!("Failed to load columns for '{table}': {e}"),
            }
        }
        ".refresh" => {
            if rest.is_empty() {
                session.catalog().invalidate_all();
                if let Ok(tables) = session.refresh_tables().await {
                    println!("{} tables", tables.len());
                }
            } else {
                match session.refresh_columns(rest).await {
                    Ok(columns) => println!("{} columns", columns.len()),
                    Err(e) => println!("Failed to load columns for '{rest}': {e}"),
                }
            }
        }
        ".filter" => {
            let (table, clauses) = match rest.split_once(char::is_whitespace) {
                Some((t, c)) => (t, c.trim()),
                None => (required(rest, ".filter <table> [col op value; ...]")?, ""),
            };
            let filters = parse_filters(clauses)?;
            let query = session.filter_query(table, &filters);
            println!("{}", QueryDescriptor::from(query.clone()));
            state.draft = Some(Draft::Filter(query));
        }
        ".limit" => {
            let limit: u32 = required(rest, ".limit <n>")?.parse().context("Limit must be a non-negative integer")?;
            draft_filter(&mut state.draft)?.limit = limit;
        }
        ".offset" => {
            let offset: u64 = required(rest, ".offset <n>")?.parse().context("Offset must be a non-negative integer")?;
            draft_filter(&mut state.draft)?.offset = offset;
        }
        ".order" => {
            let mut parts = required(rest, ".order <column> [asc|desc]")?.split_whitespace();
            let column = parts.next().unwrap_or_default().to_string();
            let direction = match parts.next() {
                Some(d) => d.parse::<OrderDirection>().map_err(anyhow::Error::msg)?,
                None => OrderDirection::Asc,
            };
            let query = draft_filter(&mut state.draft)?;
            query.order_by = Some(column);
            query.order_direction = direction;
        }
        ".run" => {
            let descriptor = match &state.draft {
                Some(Draft::Filter(q)) => QueryDescriptor::from(q.clone()),
                Some(Draft::Raw(sql)) => QueryDescriptor::raw(sql.clone()),
                None => bail!("Nothing to run; use .filter or .sql first"),
            };
            let result = session.run(descriptor).await;
            print_result(session, &result);
        }
        ".sql" => {
            let sql = required(rest, ".sql <text>")?.to_string();
            let result = session.run(QueryDescriptor::raw(sql.clone())).await;
            print_result(session, &result);
            state.draft = Some(Draft::Raw(sql));
        }
        ".where" => {
            let (column, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            required(column, ".where <column> <text>")?;
            session.set_column_filter(column, text);
            print_visible(session);
        }
        ".sort" => {
            let column = required(rest, ".sort <column>")?;
            let sort = session.toggle_sort(column);
            println!("Sorted by {} {}", sort.column, sort.direction.as_sql());
            print_visible(session);
        }
        ".history" => {
            let history = session.history();
            if history.is_empty() {
                println!("No history");
            }
            for (i, entry) in history.iter().enumerate() {
                let outcome = match &entry.outcome {
                    HistoryOutcome::Success { row_count } => format!("{row_count} rows"),
                    HistoryOutcome::Failure { message, .. } => format!("error: {message}"),
                };
                println!(
                    "  {:>3}  {}  {}  ({outcome})",
                    i + 1,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.descriptor
                );
            }
        }
        ".clear-history" => session.clear_history(),
        ".save" => {
            let saved = session.save_current(rest)?;
            println!("Saved '{}' ({})", saved.name, saved.id);
        }
        ".saved" => {
            let saved = session.saved_queries();
            if saved.is_empty() {
                println!("No saved queries");
            }
            for (i, q) in saved.iter().enumerate() {
                println!("  {:>3}  {}  {}  {}", i + 1, q.id, q.name, q.descriptor);
            }
        }
        ".load" => {
            let id = resolve_saved_id(session, required(rest, ".load <id|#>")?)?;
            let Some(descriptor) = session.load_saved(id) else {
                bail!("No saved query with id {id}");
            };
            println!("{descriptor}");
            state.draft = Some(match descriptor {
                QueryDescriptor::Filter(q) => Draft::Filter(q),
                QueryDescriptor::Raw(q) => Draft::Raw(q.sql),
            });
        }
        ".delete" => {
            let id = resolve_saved_id(session, required(rest, ".delete <id|#>")?)?;
            if !session.delete_saved(id)? {
                println!("No saved query with id {id}");
            }
        }
        other => bail!("Unknown command '{other}'. Type .help for commands."),
    }
    Ok(true)
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str> {
    if arg.is_empty() {
        bail!("Usage: {usage}");
    }
    Ok(arg)
}

fn draft_filter(draft: &mut Option<Draft>) -> Result<&mut FilterQuery> {
    match draft {
        Some(Draft::Filter(q)) => Ok(q),
        _ => bail!("No filter query; use .filter <table> first"),
    }
}

/// `col op value; col op value; ...`
fn parse_filters(input: &str) -> Result<FilterSet> {
    let mut filters = FilterSet::new();
    for part in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let mut tokens = part.splitn(3, char::is_whitespace);
        let column = tokens.next().unwrap_or_default();
        let Some(op) = tokens.next() else {
            bail!("Expected 'column operator [value]', got '{part}'");
        };
        let operator: Operator = op.parse()?;
        let value = tokens
            .next()
            .map(|v| unquote(v.trim()).to_string())
            .filter(|v| operator.takes_value() || !v.is_empty());
        filters.push(FilterClause::new(column, operator, value));
    }
    Ok(filters)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .unwrap_or(value)
}

/// Accepts a UUID or a 1-based position from `.saved`
fn resolve_saved_id(session: &QuerySession<HttpEndpoint>, arg: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(arg) {
        return Ok(id);
    }
    let index: usize = arg.parse().with_context(|| format!("'{arg}' is neither an id nor a position"))?;
    session
        .saved_queries()
        .get(index.wrapping_sub(1))
        .map(|q| q.id)
        .with_context(|| format!("No saved query at position {index}"))
}

fn print_result(session: &QuerySession<HttpEndpoint>, result: &ExecutionResult) {
    match result {
        ExecutionResult::Rows(_) => print_visible(session),
        ExecutionResult::Failure(failure) => println!("Error: {failure}"),
    }
}

fn print_visible(session: &QuerySession<HttpEndpoint>) {
    match session.empty_state() {
        Some(EmptyState::NothingExecuted) => println!("No query executed yet"),
        Some(EmptyState::NoResults) => println!("Query returned no rows"),
        Some(EmptyState::NoMatches) => println!("No rows match the column filters"),
        None => {
            if let ResultState::Failed(failure) = session.result_state() {
                println!("Error: {failure}");
                return;
            }
            let columns = session.result_columns();
            let rows = session.visible_rows();
            print_table(&columns, &rows);
            println!("({} rows)", rows.len());
        }
    }
}

fn print_table(columns: &[String], rows: &[Row]) {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| truncate(&row.get(c).map(ToString::to_string).unwrap_or_default()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns.iter().zip(&widths).map(|(c, w)| format!("{c:<w$}")).collect();
    println!("{}", header.join(" | "));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("-+-"));
    for row in &cells {
        let line: Vec<String> = row.iter().zip(&widths).map(|(v, w)| format!("{v:<w$}")).collect();
        println!("{}", line.join(" | "));
    }
}

fn truncate(text: &str) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= MAX_CELL_WIDTH {
        return single_line;
    }
    let mut out: String = single_line.chars().take(MAX_CELL_WIDTH - 1).collect();
    out.push('…');
    out
}

fn print_help() {
    println!("Catalog:");
    println!("  .tables                         List tables");
    println!("  .columns <table>                Show a table's columns");
    println!("  .refresh [table]                Reload tables, or one table's columns");
    println!();
    println!("Building:");
    println!("  .filter <table> [col op value; ...]");
    println!("                                  Start a filter query (operators: {})", operator_names());
    println!("  .limit <n>  .offset <n>         Page the filter query");
    println!("  .order <column> [asc|desc]      Order the filter query");
    println!("  .run                            Execute the current query");
    println!("  .sql <text>                     Execute raw SQL as written");
    println!();
    println!("Results:");
    println!("  .where <column> <text>          Filter displayed rows (blank text clears)");
    println!("  .sort <column>                  Cycle sort asc/desc on a column");
    println!();
    println!("History & saved queries:");
    println!("  .history  .clear-history");
    println!("  .save <name>  .saved  .load <id|#>  .delete <id|#>");
    println!();
    println!("  .help  .quit");
}

fn operator_names() -> String {
    Operator::ALL.iter().map(|op| op.as_str()).collect::<Vec<_>>().join(", ")
}
