use std::sync::Arc;

use futures::StreamExt;

use cadre_survey::channels::{Channel, CliChannel, TelegramChannel};
use cadre_survey::config::Config;
use cadre_survey::intake::IntakeClient;
use cadre_survey::survey::SurveyEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: INTAKE_AUTH_URL, INTAKE_SUBMIT_URL, INTAKE_USERNAME, INTAKE_PASSWORD");
        eprintln!("  optional: SURVEY_BOT_TOKEN (CLI mode without it), SURVEY_ALLOWED_USERS,");
        eprintln!("            INTAKE_VERIFY_TLS, INTAKE_TIMEOUT_SECS, SURVEY_MAX_TEXT_LEN");
        std::process::exit(1);
    });

    eprintln!("📋 Cadre Survey v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Intake: {}", config.intake.submit_url);

    let intake = Arc::new(IntakeClient::new(config.intake.clone())?);
    let engine = Arc::new(SurveyEngine::new(config.survey.clone(), intake));

    let channel: Arc<dyn Channel> = match config.bot_token.clone() {
        Some(token) => {
            eprintln!("   Channel: telegram");
            Arc::new(TelegramChannel::new(token, config.allowed_users.clone()))
        }
        None => {
            eprintln!("   Channel: cli (SURVEY_BOT_TOKEN not set)");
            eprintln!("   Type /start to begin. Ctrl+D to exit.\n");
            Arc::new(CliChannel::new())
        }
    };

    let mut events = channel.start().await?;

    // One task per event: different respondents proceed in parallel,
    // while the per-session lock in the store serializes each respondent.
    while let Some(event) = events.next().await {
        let engine = Arc::clone(&engine);
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            let prompts = engine.handle_event(event.clone()).await;
            if let Err(e) = channel.present(&event, &prompts).await {
                tracing::error!(error = %e, "failed to deliver prompts");
            }
        });
    }

    tracing::info!("event stream closed; shutting down");
    Ok(())
}
