mod app;
mod entity;
mod helper;
mod router;
mod service;

#[cfg(test)]
mod test;

fn enable_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // axum logs rejections from built-in extractors with the `axum::rejection`
            // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
            "productisation_auth=debug,tower_http=debug,axum::rejection=trace".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
pub(crate) fn enable_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("productisation_auth=debug")
        .with_test_writer()
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    enable_tracing();

    let config = app::Config::from_env()?;
    let app = config.build()?;
    app.run().await?;

    Ok(())
}
