use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use marquee::app::{App, AppEvent};
use marquee::auth::{
    AuthError, AuthSession, AuthState, FirebaseIdentity, Route, SignInForm, SignUpForm,
};
use marquee::browse::{self, render, BrowseOptions};
use marquee::catalog::{CatalogError, ListKind, Listing, MediaSummary, MediaType, TmdbClient};
use marquee::collection::{ApplyOutcome, PaginatedCollectionCache};
use marquee::config::{Config, TMDB_API_KEY_ENV};
use marquee::storage::{Database, DatabaseError};

/// Password source for non-interactive use.
const PASSWORD_ENV: &str = "MARQUEE_PASSWORD";

/// Get the config directory path (~/.config/marquee/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("marquee");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(
    name = "marquee",
    about = "Browse popular movies, search TMDB and manage your account"
)]
struct Args {
    /// Config file (default: ~/.config/marquee/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive browser (default)
    Browse {
        /// Browse without signing in
        #[arg(long)]
        guest: bool,
    },
    /// Print popular movies
    Popular {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Print top rated movies
    TopRated {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search movies and TV shows
    Search {
        query: String,
    },
    /// Show the details of one movie or TV show
    Detail {
        id: u64,
        /// The id refers to a TV show
        #[arg(long)]
        tv: bool,
    },
    /// Sign in with email and password (password from $MARQUEE_PASSWORD or stdin)
    SignIn {
        #[arg(long)]
        email: String,
    },
    /// Create an account (password from $MARQUEE_PASSWORD or stdin)
    SignUp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session
    SignOut,
    /// Show the signed-in account
    Whoami,
    /// List persisted collections
    Snapshots {
        /// Delete them instead
        #[arg(long)]
        clear: bool,
    },
    /// Delete the stored session and all persisted collections
    ResetDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries program output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        eprintln!("Created config directory: {}", config_dir.display());
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Loaded configuration");

    let db = open_database(&config_dir.join("marquee.db")).await?;

    match args.command.unwrap_or(Commands::Browse { guest: false }) {
        Commands::Browse { guest } => run_browse(&config, db, guest).await,
        Commands::Popular { pages } => print_list(&config, ListKind::Popular, pages).await,
        Commands::TopRated { pages } => print_list(&config, ListKind::TopRated, pages).await,
        Commands::Search { query } => {
            let client = catalog_client(&config)?;
            let results = client.search(&query).await.context("Search failed")?;
            print!(
                "{}",
                render::render_search(Some(&query), &results, browse::output_width())
            );
            Ok(())
        }
        Commands::Detail { id, tv } => {
            let client = catalog_client(&config)?;
            let media_type = if tv { MediaType::Tv } else { MediaType::Movie };
            let detail = client
                .fetch_detail(id, media_type)
                .await
                .with_context(|| format!("Failed to load {media_type} {id}"))?;
            print!("{}", render::render_detail(&detail, browse::output_width()));
            Ok(())
        }
        Commands::SignIn { email } => {
            let session = auth_session(&config, db).await?;
            let password = read_password("Password: ")?;
            let user = session
                .sign_in(&SignInForm::new(email, password))
                .await
                .map_err(auth_failure)?;
            println!("Signed in as {}", user.email);
            Ok(())
        }
        Commands::SignUp { name, email } => {
            let session = auth_session(&config, db).await?;
            let password = read_password("Password: ")?;
            let confirm = match std::env::var(PASSWORD_ENV) {
                Ok(_) => password.clone(),
                Err(_) => read_password("Confirm password: ")?,
            };
            let user = session
                .sign_up(&SignUpForm::new(name, email, password, confirm))
                .await
                .map_err(auth_failure)?;
            println!("Account created for {}", user.email);
            Ok(())
        }
        Commands::SignOut => {
            let session = AuthSession::open(db).await.map_err(auth_failure)?;
            session.sign_out().await.map_err(auth_failure)?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => {
            let session = AuthSession::open(db).await.map_err(auth_failure)?;
            match session.current() {
                AuthState::SignedIn { uid } => println!("Signed in (user {uid})"),
                AuthState::SignedOut => println!("Not signed in"),
            }
            Ok(())
        }
        Commands::Snapshots { clear } => {
            if clear {
                let removed = db.clear_snapshots().await?;
                println!("Removed {removed} saved lists.");
                return Ok(());
            }
            let infos = db.snapshot_info().await?;
            if infos.is_empty() {
                println!("No saved lists.");
            }
            for info in infos {
                println!(
                    "{:<12} {:>5} items  page {}/{}  saved {} UTC",
                    info.list_id, info.item_count, info.current_page, info.total_pages, info.saved_at
                );
            }
            Ok(())
        }
        Commands::ResetDb => {
            db.reset().await.context("Failed to reset database")?;
            println!("Database reset.");
            Ok(())
        }
    }
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of marquee appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn catalog_client(config: &Config) -> Result<TmdbClient> {
    match TmdbClient::new(config.catalog_settings()) {
        Ok(client) => Ok(client),
        Err(CatalogError::MissingApiKey) => {
            eprintln!("Error: No TMDB API key configured.");
            eprintln!();
            eprintln!("Set {TMDB_API_KEY_ENV} or add tmdb_api_key to config.toml.");
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Failed to create catalog client"),
    }
}

async fn auth_session(config: &Config, db: Database) -> Result<AuthSession<Database>> {
    let identity = FirebaseIdentity::new(config.firebase_settings()).map_err(|e| match e {
        AuthError::NotConfigured => anyhow::anyhow!(
            "Accounts are not configured: set FIREBASE_API_KEY or firebase_api_key in config.toml"
        ),
        other => anyhow::anyhow!(other.user_message()),
    })?;
    let session = AuthSession::open(db).await.map_err(auth_failure)?;
    Ok(session.with_identity(Arc::new(identity)))
}

fn auth_failure(e: AuthError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

/// Password from `$MARQUEE_PASSWORD`, else one line of stdin.
fn read_password(prompt: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    eprint!("{prompt}");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Load `pages` pages of a listing through a collection cache and print it.
async fn print_list(config: &Config, list: ListKind, pages: u32) -> Result<()> {
    let client = catalog_client(config)?;
    let listing = Listing::new(&client, list);
    let mut cache: PaginatedCollectionCache<MediaSummary> = PaginatedCollectionCache::new();

    cache.refresh_from(&listing).await;
    for _ in 1..pages.max(1) {
        match cache.load_more_from(&listing).await {
            Some(ApplyOutcome::Applied) if cache.last_error().is_none() => {}
            _ => break,
        }
    }

    print!(
        "{}",
        render::render_list(
            render::list_title(list),
            &cache.snapshot(),
            browse::output_width()
        )
    );
    if let Some(error) = cache.last_error() {
        anyhow::bail!("Failed to load {}: {error}", list.id());
    }
    Ok(())
}

async fn run_browse(config: &Config, db: Database, guest: bool) -> Result<()> {
    if !guest {
        let session = AuthSession::open(db.clone()).await.map_err(auth_failure)?;
        if session.initial_route().await.map_err(auth_failure)? == Route::Auth {
            eprintln!("Not signed in.");
            eprintln!();
            eprintln!("  marquee sign-in --email you@example.com");
            eprintln!("  marquee sign-up --name You --email you@example.com");
            eprintln!();
            eprintln!("Or browse without an account: marquee browse --guest");
            std::process::exit(1);
        }
    }

    let client = catalog_client(config)?;
    let mut app = App::new(Arc::new(client), Some(db));

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    let options = BrowseOptions {
        search_debounce: config.search_debounce(),
        ..BrowseOptions::default()
    };
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    browse::run(&mut app, stdin, &mut stdout, options, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
