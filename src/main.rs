//! Command-line front end for the translation service.
//!
//! Usage:
//!   media-translate <FILE> [LANGUAGE]          # Upload FILE and print both texts
//!   media-translate <FILE> [LANGUAGE] --save   # Also write translation_<session>.txt
//!   media-translate --languages                # List selectable languages
//!   media-translate --history                  # Show recent translations
//!   media-translate --health                   # Check that the service is up
//!
//! Optional environment variables:
//! - TRANSLATOR_API_URL (defaults to http://localhost:5000)
//! - UPLOAD_TIMEOUT_MS (defaults to 120000)
//! - CATALOG_TIMEOUT_MS (defaults to 10000)
//! - ALLOWED_EXTENSIONS (defaults to mp3,wav,mp4,avi,mov,m4a,ogg)
//! - MAX_FILE_BYTES (defaults to 52428800)
//! - DEFAULT_LANGUAGE (defaults to hi)

use anyhow::{Context, Result};
use media_translate_client::{
    config::Config, service, CandidateFile, ResultPresenter, SessionState, TextView,
    UploadOrchestrator,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("media_translate_client=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    info!("Using translation service at {}", config.base_url);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let save = args.iter().any(|a| a == "--save");

    if args.iter().any(|a| a == "--health") {
        let client = reqwest::Client::new();
        let status = service::check_health(&client, &config).await?;
        println!("{} ({})", status.message, status.status);
        return Ok(());
    }

    if args.iter().any(|a| a == "--history") {
        let client = reqwest::Client::new();
        let history = service::fetch_history(&client, &config).await?;
        print_history(&history);
        return Ok(());
    }

    let orchestrator = UploadOrchestrator::new(config)?;

    if args.iter().any(|a| a == "--languages") {
        let resolution = orchestrator.load_catalog().await;
        if resolution.degraded {
            println!("(service unavailable, showing built-in languages)");
        }
        for (code, name) in resolution.catalog.iter() {
            match resolution.catalog.native_name(code) {
                Some(native) => println!("{:>4}  {} ({})", code, name, native),
                None => println!("{:>4}  {}", code, name),
            }
        }
        return Ok(());
    }

    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let file_path = positional
        .first()
        .context("Usage: media-translate <FILE> [LANGUAGE] [--save]")?;

    let resolution = orchestrator.load_catalog().await;
    if let Some(warning) = &resolution.warning {
        warn!("Language list unavailable ({}), using built-in list", warning);
    }
    if let Some(language) = positional.get(1) {
        orchestrator.select_language(language.as_str());
    }

    let candidate = CandidateFile::from_path(file_path.as_str()).await?;

    let mut state_rx = orchestrator.subscribe();
    let progress_log = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            match state {
                SessionState::Transferring { progress } => info!("Upload progress: {}%", progress),
                ref s if s.is_terminal() => break,
                _ => {}
            }
        }
    });

    let outcome = orchestrator.submit(candidate).await;
    progress_log.abort();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            anyhow::bail!("Translation session failed [{}]: {}", e.kind(), e);
        }
    };

    let mut presenter = ResultPresenter::new(result);
    print_view(&presenter);
    presenter.show(TextView::Translated);
    print_view(&presenter);

    if presenter.result().audio_available {
        println!("🔊 Translated audio is available on the service.");
    }

    if save {
        let file_name = presenter.export_file_name();
        tokio::fs::write(&file_name, presenter.export_text())
            .await
            .with_context(|| format!("Failed to write {}", file_name))?;
        println!("💾 Saved to: {}", file_name);
    }

    Ok(())
}

fn print_view(presenter: &ResultPresenter) {
    println!();
    println!("--- {} ---", presenter.view_label());
    println!("{}", presenter.visible_text());
}

fn print_history(history: &[service::HistoryEntry]) {
    if history.is_empty() {
        println!("No translations yet.");
        return;
    }

    for entry in history {
        let when = entry
            .created_at_utc()
            .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        println!(
            "{}  {} -> {}  ({})",
            when, entry.original_filename, entry.target_language, entry.session_id
        );
    }
}
