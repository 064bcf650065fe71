//! sitecache - offline cache worker for a static portfolio site.
//!
//! Precaches the site's assets into a versioned cache generation, serves
//! intercepted GETs cache-first with background revalidation, and carries
//! the two external clients the site uses: GitHub project listing and
//! contact form delivery.

mod api;
mod cache;
mod config;
mod models;
mod worker;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api::{ContactClient, ContactMessage, GithubClient};
use cache::CacheStorage;
use config::Config;
use models::language_color;
use worker::{should_intercept, Fetcher, HttpFetcher, Worker, WorkerConfig};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() {
    eprintln!("Usage: sitecache <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  install                      precache the site and activate the new generation");
    eprintln!("  fetch <url>                  resolve one GET through the worker");
    eprintln!("  status                       list cache generations and entry ages");
    eprintln!("  projects [username]          list GitHub projects for the portfolio");
    eprintln!("  send <name> <email> <msg..>  deliver a contact message");
    eprintln!("  config <key> <value>         set origin, github_username or formspree_id");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("install") => cmd_install().await,
        Some("fetch") => match args.get(2) {
            Some(url) => cmd_fetch(url).await,
            None => {
                usage();
                Ok(())
            }
        },
        Some("status") => cmd_status(),
        Some("projects") => cmd_projects(args.get(2).map(String::as_str)).await,
        Some("send") => cmd_send(&args[2..]).await,
        Some("config") => cmd_config(args.get(2), args.get(3)),
        _ => {
            usage();
            Ok(())
        }
    }
}

fn site_origin(config: &Config) -> Result<String> {
    if let Ok(origin) = std::env::var("SITECACHE_ORIGIN") {
        return Ok(origin);
    }
    config
        .origin
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No site origin configured; run `sitecache config origin <url>`"))
}

async fn cmd_install() -> Result<()> {
    let config = Config::load()?;
    let origin = site_origin(&config)?;

    let storage = CacheStorage::new(Config::cache_dir()?)?;
    let fetcher = HttpFetcher::new(&origin)?;

    let mut worker = Worker::new(fetcher, storage, WorkerConfig::default());
    worker.install().await?;
    if worker.config().skip_waiting {
        worker.activate()?;
    }

    info!(tag = %worker.config().version_tag, state = %worker.state(), "Install complete");
    println!(
        "Installed {} ({} assets precached, now {})",
        worker.config().version_tag,
        worker.config().precache.len(),
        worker.state()
    );
    Ok(())
}

async fn cmd_fetch(url: &str) -> Result<()> {
    let config = Config::load()?;
    let origin = site_origin(&config)?;
    let fetcher = HttpFetcher::new(&origin)?;

    // Excluded requests never touch the worker
    if !should_intercept("GET", url) {
        let response = fetcher.fetch(url).await?;
        println!("{} {} bytes (passed through)", response.status, response.body.len());
        return Ok(());
    }

    let storage = CacheStorage::new(Config::cache_dir()?)?;
    let mut worker = Worker::new(fetcher, storage, WorkerConfig::default());
    worker.resume()?;

    let response = worker.handle(url).await?;
    println!(
        "{} {} bytes (cached {})",
        response.status,
        response.body.len(),
        response.age_display()
    );
    Ok(())
}

fn cmd_status() -> Result<()> {
    let storage = CacheStorage::new(Config::cache_dir()?)?;
    let tags = storage.tags()?;
    if tags.is_empty() {
        println!("No cache generations installed");
        return Ok(());
    }

    for tag in tags {
        let store = storage.open(&tag)?;
        let current = if tag == worker::CACHE_VERSION { " (current)" } else { "" };
        let age = store.newest_age().unwrap_or_else(|| "empty".to_string());
        println!("{}{}: {} entries, newest {}", tag, current, store.len(), age);
    }
    Ok(())
}

async fn cmd_projects(username: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let username = match username {
        Some(u) => u.to_string(),
        None => config.github_username.clone().ok_or_else(|| {
            anyhow::anyhow!("No GitHub username configured; run `sitecache config github_username <name>`")
        })?,
    };

    let client = GithubClient::new()?;
    let projects = client.list_projects(&username).await?;

    for project in &projects {
        let stars = if project.stars > 0 {
            format!("  *{}", project.stars)
        } else {
            String::new()
        };
        println!(
            "{} {:20} [{}] {} ({}){}",
            project.icon,
            project.name,
            project.category,
            project.description,
            language_color(&project.language),
            stars
        );
    }
    println!(
        "{} project{} found via GitHub API",
        projects.len(),
        if projects.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

async fn cmd_send(args: &[String]) -> Result<()> {
    let (name, email, rest) = match args {
        [name, email, rest @ ..] if !rest.is_empty() => (name, email, rest),
        _ => {
            usage();
            return Ok(());
        }
    };

    let config = Config::load()?;
    let form_id = config.formspree_id.clone().ok_or_else(|| {
        anyhow::anyhow!("No form id configured; run `sitecache config formspree_id <id>`")
    })?;

    let message = ContactMessage {
        name: name.clone(),
        email: email.clone(),
        message: rest.join(" "),
    };

    ContactClient::new()?.send(&form_id, &message).await?;
    println!("Message sent");
    Ok(())
}

fn cmd_config(key: Option<&String>, value: Option<&String>) -> Result<()> {
    let (Some(key), Some(value)) = (key, value) else {
        usage();
        return Ok(());
    };

    let mut config = Config::load()?;
    match key.as_str() {
        "origin" => config.origin = Some(value.clone()),
        "github_username" => config.github_username = Some(value.clone()),
        "formspree_id" => config.formspree_id = Some(value.clone()),
        other => anyhow::bail!("Unknown config key: {}", other),
    }
    config.save()?;
    println!("Set {}", key);
    Ok(())
}
