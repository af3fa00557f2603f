//! permit-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `PERMIT_*` environment variables, opens the SQLite store, and serves the
//! registry's JSON API over HTTP.
//!
//! # Bootstrap administrator
//!
//! Set `bootstrap_admin_email` and `bootstrap_admin_password_hash` to create
//! the first active administrator on startup. Generate the hash with:
//!
//! ```text
//! cargo run -p permit-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use permit_engine::{Authenticator, Engine, hash_password};
use permit_server::{AppState, ServerConfig, files::DiskFileStore};
use permit_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Permit registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).context("failed to hash password")?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PERMIT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let upload_dir = expand_tilde(&server_cfg.upload_dir);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tokio::fs::create_dir_all(&upload_dir)
    .await
    .with_context(|| format!("failed to create upload directory {upload_dir:?}"))?;

  let auth = Authenticator::new(server_cfg.token_secret.as_bytes())
    .context("invalid token_secret")?;
  let engine = Engine::new(Arc::new(store), auth, server_cfg.engine_config());

  if let (Some(email), Some(hash)) = (
    server_cfg.bootstrap_admin_email.as_deref(),
    server_cfg.bootstrap_admin_password_hash.clone(),
  ) {
    let created = engine
      .bootstrap_admin(email, hash)
      .await
      .context("failed to create bootstrap administrator")?;
    if created.is_none() {
      tracing::debug!(%email, "bootstrap administrator already present");
    }
  }

  let state = AppState {
    engine: Arc::new(engine),
    files:  Arc::new(DiskFileStore::new(upload_dir)),
  };

  let app = permit_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
