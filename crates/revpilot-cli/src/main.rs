//! RevPilot - live coding-suggestion panel for clinical notes
//!
//! Polls the RevenuePilot backend for code, compliance, differential,
//! and prevention suggestions while a note is being written, and prints
//! the panel state as it changes.

use anyhow::{Context, Result};
use clap::Parser;
use revpilot_adapters::config::Config;
use revpilot_adapters::http::{create_client, ApiTransport};
use revpilot_core::state::CategoryStatus;
use revpilot_core::suggest::SuggestionCategory;
use revpilot_engine::{HttpSuggestClient, PollConfig, SuggestionPanel};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "revpilot",
    about = "Live coding-suggestion panel for clinical notes",
    version
)]
struct Args {
    /// Path to the note text to analyze
    #[arg(value_name = "NOTE")]
    note: Option<PathBuf>,

    /// Backend base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Codes already added to the session, repeatable
    #[arg(long = "code", value_name = "CODE")]
    codes: Vec<String>,

    /// Poll until every active category settles, print once, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revpilot=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }

    let note_text = match &args.note {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read note at {}", path.display()))?,
        None => String::new(),
    };

    let poll = PollConfig::from_config(&config);
    let client = create_client(poll.request_timeout)?;
    let transport = ApiTransport::new(client, &config.base_url, config.get_api_token())?;
    let mut panel = SuggestionPanel::new(
        Arc::new(HttpSuggestClient::new(transport)),
        poll,
    );

    for code in &args.codes {
        panel.add_code(code);
    }
    panel.start();
    panel.set_note_text(&note_text);

    if args.once {
        run_once(&mut panel, &note_text).await;
        return Ok(());
    }

    tracing::info!(base_url = %config.base_url, "polling, Ctrl-C to stop");
    loop {
        if panel.apply_next().await {
            render(&panel);
        }
    }
}

/// Wait for every category that is actually polling to reach a settled
/// status, then print the panel once.
async fn run_once(panel: &mut SuggestionPanel, note_text: &str) {
    let active: Vec<SuggestionCategory> = SuggestionCategory::ALL
        .iter()
        .copied()
        .filter(|c| !c.content_dependent() || !note_text.trim().is_empty())
        .collect();

    while !active.iter().all(|&category| {
        matches!(
            panel.state(category).status,
            CategoryStatus::Online | CategoryStatus::Degraded
        )
    }) {
        panel.apply_next().await;
    }

    render(panel);
    panel.shutdown();
}

fn render(panel: &SuggestionPanel) {
    let snapshot = panel.snapshot();
    println!();
    for view in &snapshot.categories {
        let badge = view
            .badge
            .as_deref()
            .map(|b| format!(" [{}]", b))
            .unwrap_or_default();
        println!("{}{}", view.category.label(), badge);
        if let Some(error) = &view.error {
            println!("  ! {}", error);
        }
        if view.items.is_empty() {
            println!("  (no suggestions)");
            continue;
        }
        for item in &view.items {
            match item.confidence {
                Some(pct) => println!("  {} ({}%) {}", item.code, pct, item.description),
                None => println!("  {} {}", item.code, item.description),
            }
        }
    }
}
