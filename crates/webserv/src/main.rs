//! `webserv` serves a site directory over HTTP for local development:
//! static files with sensible content types, `index.html` at the root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use simplerr_http::{
    App, Config, HttpError, Method, Request, Route, View, resolve_addr, serve,
};
use tracing_subscriber::EnvFilter;

/// Site directory served when none is given, relative to the cwd.
const DEFAULT_SITE: &str = "website";

#[derive(Debug, Parser)]
#[command(name = "webserv", version, about = "Serve a site directory over HTTP")]
struct Args {
    /// Site directory to serve
    #[arg(default_value = DEFAULT_SITE)]
    site: PathBuf,

    /// Address to bind (default 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (default 3200)
    #[arg(long)]
    port: Option<u16>,

    /// Secret key enabling signed-cookie sessions
    #[arg(long, env = "SIMPLERR_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Enable debug mode (error detail in responses, verbose logging)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so SIMPLERR_* and RUST_LOG are visible.
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Config::default picks up SIMPLERR_DEBUG; the flag overrides it.
    let mut config = Config::default();
    if args.debug {
        config.debug = true;
    }
    config.secret_key = args.secret_key;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let site = resolve_site(&args.site)?;
    tracing::info!("serving {}", site.display());

    let addr = resolve_addr(&config, args.host.as_deref(), args.port)
        .context("could not resolve the bind address")?;

    let mut app = App::new(&site).with_config(config);
    app.route(
        Route::new("/", |_: Request| async {
            Ok::<View, HttpError>(View::from("index.html"))
        })
        .file(true)
        .methods(vec![Method::GET]),
    )?;
    app.route(
        Route::new("/<path:filename>", |request: Request| async move {
            let filename = request
                .view_arg("filename")
                .map(ToString::to_string)
                .unwrap_or_default();
            Ok::<View, HttpError>(View::from(filename))
        })
        .file(true)
        .methods(vec![Method::GET]),
    )?;

    serve(Arc::new(app), addr)
        .await
        .with_context(|| format!("server failed on {addr}"))
}

/// Canonicalize and validate the site directory.
fn resolve_site(site: &Path) -> anyhow::Result<PathBuf> {
    let resolved = site
        .canonicalize()
        .with_context(|| format!("site directory {} does not exist", site.display()))?;
    if !resolved.is_dir() {
        bail!("{} is not a directory", resolved.display());
    }
    Ok(resolved)
}
