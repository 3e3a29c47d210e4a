use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}{}", mock_server::API_PREFIX);
    mock_server::run(listener).await?;
    Ok(())
}
