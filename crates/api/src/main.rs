use anyhow::Context;

use stockshift_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockshift_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let app = stockshift_api::app::build_app(&settings)
        .await
        .context("failed to wire services")?;

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
