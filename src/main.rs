use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use backoffice::auth::{AuthorizationProvider, Principal};
use backoffice::config::Config;
use backoffice::consts::{ROOT_ROLE, default_db_path, format_number};
use backoffice::entity::IntoDto;
use backoffice::modules::fixtures;
use backoffice::modules::{
    DataSet, EntityQueries, GetByIdQuery, Log, Modules, ProjectInstance, Sources, Translation,
    build_registry,
};
use backoffice::query::{
    Cancellation, EqualsFilter, ListRequest, OrderDirection, PaginationParameters, QueryOptions,
    RangeFilter, SearchFilter, cancellation,
};
use backoffice::source::sqlite::SqliteSource;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EntityKind {
    Logs,
    ProjectInstances,
    Translations,
    DataSets,
}

#[derive(Parser)]
#[command(name = "backoffice", version, about = "Query back-office data.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database path (default: ~/.backoffice/backoffice.db)
    #[arg(short, long, global = true)]
    db: Option<String>,

    /// Caller user name
    #[arg(short, long, global = true, default_value = "cli")]
    user: String,

    /// Caller roles (repeatable)
    #[arg(long = "role", global = true)]
    roles: Vec<String>,

    /// Shorthand for `--role root`
    #[arg(long, global = true, default_value_t = false)]
    root: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create tables and insert sample rows
    Seed {
        #[arg(long, default_value_t = 55)]
        logs: usize,
        #[arg(long, default_value_t = 12)]
        project_instances: usize,
        #[arg(long, default_value_t = 30)]
        translations: usize,
        #[arg(long, default_value_t = 8)]
        data_sets: usize,
    },
    /// List one page of an entity
    List {
        #[arg(value_enum)]
        entity: EntityKind,

        /// Free-text search over the entity's searchable fields
        #[arg(short, long)]
        search: Option<String>,

        /// Equality filter, `field=value` (repeatable)
        #[arg(short = 'w', long = "where", value_parser = parse_assignment)]
        equals: Vec<(String, String)>,

        /// Inclusive lower bound, `field=value` (repeatable)
        #[arg(long, value_parser = parse_assignment)]
        from: Vec<(String, String)>,

        /// Inclusive upper bound, `field=value` (repeatable)
        #[arg(long, value_parser = parse_assignment)]
        to: Vec<(String, String)>,

        /// Field to order by
        #[arg(short, long)]
        order_by: Option<String>,

        /// Order direction
        #[arg(long, default_value = "asc")]
        direction: String,

        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: u64,

        /// Rows per page (0 = configured default)
        #[arg(long, default_value_t = 0)]
        page_size: u64,

        /// Skip this many rows instead of addressing by page
        #[arg(long, conflicts_with = "page")]
        skip: Option<u64>,
    },
    /// Show one row by id
    Get {
        #[arg(value_enum)]
        entity: EntityKind,
        id: String,
    },
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected `field=value`, got `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let db = resolve_db(cli.db.as_deref())?;
    let config = Config::open(&db)?;

    match cli.command {
        Command::Config { action } => handle_config(&config, action),
        Command::Seed {
            logs,
            project_instances,
            translations,
            data_sets,
        } => handle_seed(&db, logs, project_instances, translations, data_sets),
        Command::List {
            entity,
            search,
            equals,
            from,
            to,
            order_by,
            direction,
            page,
            page_size,
            skip,
        } => {
            let mut options = QueryOptions::new().no_tracking();
            if let Some(term) = search {
                options = options.filter(SearchFilter::new(term));
            }
            for (field, value) in equals {
                options = options.filter(EqualsFilter::new(field, value));
            }
            for (field, value) in from {
                options = options.filter(RangeFilter::new(field).from(value));
            }
            for (field, value) in to {
                options = options.filter(RangeFilter::new(field).to(value));
            }
            if let Some(field) = order_by {
                options = options.order_by(field, OrderDirection::from_str(&direction)?);
            }
            let pagination = match skip {
                Some(skip) => PaginationParameters::offset(skip, page_size),
                None => PaginationParameters::page(page, page_size),
            };
            let request = ListRequest::new(options, pagination);

            let modules = open_modules(&db, &config, caller(&cli.user, cli.roles, cli.root))?;
            let cancel = cancel_on_ctrl_c();
            match entity {
                EntityKind::Logs => print_list(&modules.logs, &request, &cancel).await,
                EntityKind::ProjectInstances => {
                    print_list(&modules.project_instances, &request, &cancel).await
                }
                EntityKind::Translations => {
                    print_list(&modules.translations, &request, &cancel).await
                }
                EntityKind::DataSets => print_list(&modules.data_sets, &request, &cancel).await,
            }
        }
        Command::Get { entity, id } => {
            let modules = open_modules(&db, &config, caller(&cli.user, cli.roles, cli.root))?;
            let cancel = cancel_on_ctrl_c();
            match entity {
                EntityKind::Logs => print_one(&modules.logs, &id, &cancel).await,
                EntityKind::ProjectInstances => {
                    print_one(&modules.project_instances, &id, &cancel).await
                }
                EntityKind::Translations => print_one(&modules.translations, &id, &cancel).await,
                EntityKind::DataSets => print_one(&modules.data_sets, &id, &cancel).await,
            }
        }
    }
}

fn resolve_db(db: Option<&str>) -> anyhow::Result<String> {
    if let Some(db) = db {
        return Ok(db.to_string());
    }
    let path = default_db_path().context("cannot determine home directory, pass --db")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(path.to_string_lossy().into_owned())
}

fn caller(user: &str, mut roles: Vec<String>, root: bool) -> Arc<dyn AuthorizationProvider> {
    if root {
        roles.push(ROOT_ROLE.to_string());
    }
    let principal = roles
        .into_iter()
        .fold(Principal::new(user), Principal::with_role);
    Arc::new(principal)
}

fn open_modules(
    db: &str,
    config: &Config,
    caller: Arc<dyn AuthorizationProvider>,
) -> anyhow::Result<Modules> {
    let registry = Arc::new(build_registry().context("filter registry is misconfigured")?);
    let sources = Sources {
        logs: Arc::new(SqliteSource::<Log>::open(db)?),
        project_instances: Arc::new(SqliteSource::<ProjectInstance>::open(db)?),
        translations: Arc::new(SqliteSource::<Translation>::open(db)?),
        data_sets: Arc::new(SqliteSource::<DataSet>::open(db)?),
    };
    Ok(Modules::new(
        &sources,
        registry,
        caller,
        config.query_settings()?,
    ))
}

/// Ctrl+C cancels the in-flight query, not the process.
fn cancel_on_ctrl_c() -> Cancellation {
    let (handle, cancel) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    cancel
}

async fn print_list<E: IntoDto>(
    queries: &EntityQueries<E>,
    request: &ListRequest,
    cancel: &Cancellation,
) -> anyhow::Result<()> {
    let page = queries.list(request, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    eprintln!(
        "{} of {} {} (page {} of {})",
        page.items.len(),
        format_number(page.total_items),
        E::NAME,
        page.page_number,
        page.total_pages.max(1)
    );
    Ok(())
}

async fn print_one<E: IntoDto>(
    queries: &EntityQueries<E>,
    raw_id: &str,
    cancel: &Cancellation,
) -> anyhow::Result<()>
where
    E::Key: FromStr,
    <E::Key as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let id = raw_id
        .trim()
        .parse()
        .with_context(|| format!("invalid {} id `{raw_id}`", E::NAME))?;
    match queries.get_by_id(GetByIdQuery::new(id), cancel).await? {
        Some(dto) => {
            println!("{}", serde_json::to_string_pretty(&dto)?);
            Ok(())
        }
        None => bail!("{} `{raw_id}` not found", E::NAME),
    }
}

fn handle_seed(
    db: &str,
    logs: usize,
    project_instances: usize,
    translations: usize,
    data_sets: usize,
) -> anyhow::Result<()> {
    let inserted = SqliteSource::<Log>::open(db)?.insert_all(&fixtures::sample_logs(logs))?;
    info!(inserted, "seeded logs");
    SqliteSource::<ProjectInstance>::open(db)?
        .insert_all(&fixtures::sample_project_instances(project_instances))?;
    SqliteSource::<Translation>::open(db)?
        .insert_all(&fixtures::sample_translations(translations))?;
    SqliteSource::<DataSet>::open(db)?.insert_all(&fixtures::sample_data_sets(data_sets))?;
    println!(
        "seeded {logs} logs, {project_instances} project instances, \
         {translations} translations, {data_sets} data sets into {db}"
    );
    Ok(())
}

fn handle_config(config: &Config, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(&key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            let previous = config.get(&key)?;
            config.set(&key, &value)?;
            // Roll back values that would break every later query.
            if let Err(err) = config.query_settings() {
                match previous {
                    Some(previous) => config.set(&key, &previous)?,
                    None => config.remove(&key)?,
                }
                return Err(err);
            }
        }
        ConfigAction::Unset { key } => config.remove(&key)?,
    }
    Ok(())
}
