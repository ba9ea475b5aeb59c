mod error;

use crate::error::{ErrorKind, Result};
use castdex_config::Config;
use castdex_fetch::{FetcherHandle, HttpFetcher};
use castdex_library::catalog::ROOT_URI;
use castdex_library::{Catalog, FeedCache, Query, RefreshContext, RefreshHandle, RefreshScheduler, RssLoader};
use castdex_store::{Database, Repository};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Keep a searchable local index of podcast feeds.
#[derive(Parser, Debug)]
#[command(name = "castdex", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "CASTDEX_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Log debug messages (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh every feed once, then exit.
    Update,
    /// Keep refreshing feeds on the configured interval until interrupted.
    Watch,
    /// List podcasts, or the episodes of one podcast.
    List {
        #[arg(default_value = ROOT_URI)]
        uri: String,
    },
    /// Show the tracks of a podcast, or a single track.
    Lookup { uri: String },
    /// Search podcasts and episodes, e.g. `search album=Example`.
    Search {
        /// Match values exactly instead of searching their text.
        #[arg(long)]
        exact: bool,
        #[arg(required = true, value_parser = parse_term)]
        terms: Vec<(String, String)>,
    },
    /// List the distinct values of a field (track, artist, albumartist,
    /// album, date or genre) among matching entries.
    Distinct {
        field: String,
        #[arg(long)]
        exact: bool,
        #[arg(value_parser = parse_term)]
        terms: Vec<(String, String)>,
    },
    /// Show the images of podcasts or episodes.
    Images {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Print the media URI of an episode.
    Play { uri: String },
}

fn parse_term(term: &str) -> std::result::Result<(String, String), String> {
    term.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{term}`"))
}

/// Values given for the same field accumulate into one term.
fn query(exact: bool, terms: Vec<(String, String)>) -> Query {
    let mut query = Query::new(exact);
    for (field, value) in terms {
        match query.terms.iter_mut().find(|term| term.field == field) {
            Some(term) => term.values.push(value),
            None => query = query.with(field, [value]),
        }
    }
    query
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::Output)?;
    println!("{json}");
    Ok(())
}

struct App {
    config: Config,
    cache: Arc<FeedCache>,
    repository: Repository,
    _db: Database,
}

impl App {
    async fn new(file: Option<PathBuf>) -> Result<Self> {
        let file = file.or_else(|| Config::default_file().filter(|path| path.is_file()));
        let config = Config::load(file.as_deref()).or_raise(|| ErrorKind::Config)?;

        let path = config.database_path().or_raise(|| ErrorKind::Config)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).or_raise(|| ErrorKind::Database)?;
        }
        let db = Database::connect(&path).await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(path = %path.display(), "opened index database");

        let fetcher: FetcherHandle = Arc::new(HttpFetcher::new().or_raise(|| ErrorKind::Fetch)?);
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        let cache = Arc::new(FeedCache::new(Arc::new(RssLoader::new(fetcher)), capacity, config.ttl()));
        let repository = Repository::from(&db);
        Ok(Self { config, cache, repository, _db: db })
    }

    fn scheduler(&self) -> RefreshHandle {
        RefreshScheduler::start(RefreshContext {
            feeds: self.config.feeds.clone(),
            import_dir: self.config.import_dir.clone(),
            interval: self.config.interval(),
            cache: Arc::clone(&self.cache),
            repository: self.repository.clone(),
        })
    }

    fn catalog(&self) -> Catalog {
        Catalog::new(Arc::clone(&self.cache), self.repository.clone(), &self.config)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new(cli.config).await?;
    match cli.command {
        Command::Update => {
            let scheduler = app.scheduler();
            let mut reports = scheduler.reports();
            let report = reports.wait_for(Option::is_some).await.map(|report| report.clone());
            scheduler.stop().await;
            if let Ok(Some(report)) = report {
                println!(
                    "{} feeds: {} updated, {} unchanged, {} failed ({:.1?})",
                    report.feeds, report.updated, report.unchanged, report.failed, report.elapsed
                );
            }
        },
        Command::Watch => {
            let scheduler = app.scheduler();
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for interrupts");
            }
            tracing::info!("interrupted, stopping");
            scheduler.stop().await;
        },
        Command::List { uri } => print(&app.catalog().browse(&uri).await.or_raise(|| ErrorKind::Catalog)?)?,
        Command::Lookup { uri } => print(&app.catalog().lookup(&uri).await.or_raise(|| ErrorKind::Catalog)?)?,
        Command::Search { exact, terms } => {
            let result = app.catalog().search(&query(exact, terms)).await.or_raise(|| ErrorKind::Catalog)?;
            print(&result)?;
        },
        Command::Distinct { field, exact, terms } => {
            let values =
                app.catalog().distinct(&field, &query(exact, terms)).await.or_raise(|| ErrorKind::Catalog)?;
            print(&values)?;
        },
        Command::Images { uris } => print(&app.catalog().images(&uris).await)?,
        Command::Play { uri } => {
            if let Some(media) = app.catalog().translate_uri(&uri).await.or_raise(|| ErrorKind::Catalog)? {
                println!("{media}");
            }
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_term() {
        assert_eq!(parse_term("album=A = B").unwrap(), ("album".to_string(), "A = B".to_string()));
        assert!(parse_term("album").is_err());
    }

    #[test]
    fn test_repeated_fields_accumulate() {
        let terms = vec![
            ("album".to_string(), "One".to_string()),
            ("artist".to_string(), "Jane".to_string()),
            ("album".to_string(), "Two".to_string()),
        ];
        let query = query(true, terms);
        assert!(query.exact);
        assert_eq!(query.terms.len(), 2);
        assert_eq!(query.terms[0].values, vec!["One", "Two"]);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
