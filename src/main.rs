//! Session probe
//!
//! Runs the startup bootstrap once against a civic API and reports the
//! screen graph the app would mount.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use civic_session::{
    config::Args, AuthStateStore, BootstrapPhase, Credential, FileTokenStore, GateView,
    HttpApiClient, NavigationGate, RehydrationGate, SessionController, TokenStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("civic_session={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("API: {}", args.api_url);
    let session_config = args.session_config();
    info!("Token file: {}", session_config.token_file().display());
    info!("Restore timeout: {}ms", args.restore_timeout_ms);

    let store = AuthStateStore::new();
    let tokens = Arc::new(FileTokenStore::from_config(&session_config));
    let api = Arc::new(HttpApiClient::new(args.api_config(), store.clone())?);
    let gate = RehydrationGate::new();

    let controller = Arc::new(SessionController::new(
        store,
        tokens.clone(),
        api,
        gate.clone(),
        session_config,
    ));
    let navigation = NavigationGate::bind(&controller);

    // Rehydrate before anything reads the token file
    match tokens.rehydrate().await {
        Ok(token) => info!(present = token.is_some(), "Stored credential loaded"),
        Err(e) => warn!("Token file unreadable, bootstrap will report it: {}", e),
    }

    if args.sign_out {
        controller.store().sign_out(tokens.as_ref()).await?;
        info!("Stored credential cleared");
        return Ok(());
    }

    if let Some(token) = &args.token {
        tokens.set_token(&Credential::new(token.as_str())).await?;
        info!("Stored credential replaced from --token");
    }

    gate.complete();

    let phase = controller.start().await;
    let view = navigation.view();
    info!(%phase, "Bootstrap settled");

    match &view {
        GateView::Graph(graph) => {
            println!("{}", view);
            if let Some(profile) = controller.store().get().profile() {
                println!("signed in as {} (id {})", profile.username, profile.id);
            }
            println!("entry screen: {}", graph.entry_screen());
        }
        GateView::Error { message } => {
            println!("bootstrap failed: {}", message);
        }
        GateView::Loading => {
            println!("bootstrap did not settle");
        }
    }

    if phase == BootstrapPhase::Failed {
        std::process::exit(2);
    }
    Ok(())
}
