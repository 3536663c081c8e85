use anyhow::Result;
use siteapi::{AppState, router};
use siteapi_core::Settings;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let settings = Settings::load()?;
    let state = AppState::from_settings(&settings)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(addr = %settings.bind, calendar = %settings.calendar_url, "siteapi listening");

    axum::serve(listener, app).await?;

    Ok(())
}
