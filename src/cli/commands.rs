//! CLI commands implementation.

use std::sync::Arc;

use anyhow::Context;
use console::style;
use tracing::info;
use url::Url;

use super::{Cli, Commands};
use crate::client::{HttpClient, StatusSource};
use crate::config::{load_settings, Settings};
use crate::display::{IndicatorDisplay, LogDisplay, TerminalDisplay};
use crate::page::{default_progress_url, HtmlPage, Page, StaticPage};
use crate::poller::{parse_report, render, shutdown_channel, IndicatorState, StatusReport, Watcher};

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_settings().await;
    apply_cli_overrides(&cli, &mut settings);

    let client = HttpClient::new(&settings.client_config())?;

    match cli.command {
        Commands::Watch {
            ref page_url,
            ref progress_url,
            ref marker_class,
        } => {
            if let Some(class) = marker_class {
                settings.marker_class = class.clone();
            }
            let shared = match progress_url.as_ref().or(settings.progress_path.as_ref()) {
                Some(path) => resolve_against(page_url, path)?,
                None => default_progress_url(page_url)?,
            };
            login_if_configured(&client, &cli, &settings, page_url).await?;

            let page = HtmlPage::new(
                client.clone(),
                page_url.clone(),
                shared,
                settings.marker_class.clone(),
            );
            cmd_watch(page, client, &cli, &settings).await
        }
        Commands::Poll { ref urls } => {
            if let Some(first) = urls.first() {
                login_if_configured(&client, &cli, &settings, first).await?;
            }
            let page = StaticPage::from_urls(urls.iter().cloned());
            cmd_watch(page, client, &cli, &settings).await
        }
        Commands::Status { ref url } => {
            login_if_configured(&client, &cli, &settings, url).await?;
            cmd_status(&client, url).await
        }
    }
}

fn apply_cli_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(interval) = cli.interval_ms {
        settings.poll_interval_ms = interval;
    }
    if let Some(ref username) = cli.username {
        settings.username = Some(username.clone());
    }
    if let Some(ref password) = cli.password {
        settings.password = Some(password.clone());
    }
}

/// Resolve a possibly relative URL against another one.
fn resolve_against(base: &str, path: &str) -> anyhow::Result<String> {
    let base = Url::parse(base).with_context(|| format!("Invalid URL: {}", base))?;
    let resolved = base
        .join(path)
        .with_context(|| format!("Invalid URL: {}", path))?;
    Ok(resolved.to_string())
}

async fn login_if_configured(
    client: &HttpClient,
    cli: &Cli,
    settings: &Settings,
    server_url: &str,
) -> anyhow::Result<()> {
    let Some((username, password)) = settings.credentials() else {
        return Ok(());
    };
    let login_url = match cli.login_url {
        Some(ref url) => url.clone(),
        None => resolve_against(server_url, &settings.login_path)?,
    };
    client
        .login(&login_url, username, password)
        .await
        .with_context(|| format!("Login at {} failed", login_url))
}

fn make_display(plain: bool) -> anyhow::Result<Arc<dyn IndicatorDisplay>> {
    if plain || !console::Term::stderr().is_term() {
        Ok(Arc::new(LogDisplay::new()))
    } else {
        Ok(Arc::new(TerminalDisplay::new()?))
    }
}

async fn cmd_watch<P: Page>(
    page: P,
    client: HttpClient,
    cli: &Cli,
    settings: &Settings,
) -> anyhow::Result<()> {
    let display = make_display(cli.plain)?;
    let source: Arc<dyn StatusSource> = Arc::new(client);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
        }
        let _ = shutdown_tx.send(true);
    });

    let watcher = Watcher::new(page, source, display.clone(), settings.poll_interval());
    let reloads = watcher.run(shutdown_rx).await;
    display.reset();

    info!("Stopped after {} page reload(s)", reloads);
    Ok(())
}

async fn cmd_status(client: &HttpClient, url: &str) -> anyhow::Result<()> {
    let body = client.fetch_status(url).await?;
    let report = parse_report(&body)?;

    println!("\n{}", style(format!("Progress: {}", url)).bold());
    println!("{}", "-".repeat(40));

    match report {
        StatusReport::Empty => {
            println!("{} Nothing reported", style("!").yellow());
        }
        StatusReport::Single(status) => {
            print_state(url, &render(&status));
        }
        StatusReport::Global {
            running_count,
            indexes,
        } => {
            println!("{:<20} {}", "Running:", running_count);
            for (key, status) in &indexes {
                print_state(key, &render(status));
            }
        }
    }

    Ok(())
}

fn print_state(key: &str, state: &IndicatorState) {
    let marker = if state.active {
        style("▶").cyan()
    } else {
        style("✓").green()
    };
    println!("  {} {:<20} {}", marker, key, state.label);
}
