//! Compass - loads the configured data layer and reports what it finds.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use compass_client::stores::FetchOutcome;
use compass_client::{App, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root so `cargo run -p compass-client` picks it up.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compass_client=debug,compass_domain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    tracing::info!(environment = ?config.environment, "Starting Compass");

    let app = App::build(config).await?;

    let user_outcome = app.stores.user.hydrate().await;
    let rulesets_outcome = app.stores.rulesets.load().await;
    if let FetchOutcome::Failed(e) = &rulesets_outcome {
        tracing::warn!(error = %e, "Rulesets unavailable");
    }

    let current_user = app.stores.user.current_user();
    let collection = app.stores.rulesets.state().data;
    tracing::info!(
        user = current_user.as_ref().map(|u| u.username.as_str()).unwrap_or("<none>"),
        user_lookup = ?user_outcome,
        rulesets = collection.rulesets.len(),
        modules = collection.modules.len(),
        last_viewed = ?app.stores.rulesets.last_viewed(),
        api_endpoint = app.api_endpoint().as_deref().unwrap_or("<unset>"),
        "Compass ready"
    );

    if let Some(user) = current_user {
        let completed = app.stores.onboarding.has_completed(user.id()).await;
        tracing::info!(username = %user.username, completed, "Onboarding status");
    }

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
