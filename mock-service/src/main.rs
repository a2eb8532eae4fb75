use clap::Parser;
use mock_service::{MockBehavior, StatusCode};
use std::net::SocketAddr;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// In-memory users API with optional fault injection.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    #[arg(default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Status returned by `GET /health`.
    #[arg(long, default_value_t = 200)]
    health_status: u16,

    /// Delay before answering `GET /health`, e.g. `2s`.
    #[arg(long)]
    health_delay: Option<humantime::Duration>,

    /// Answer every `POST /users` with this status instead of creating.
    #[arg(long)]
    create_status: Option<u16>,

    /// Delay every Nth `POST /users`.
    #[arg(long)]
    slow_create_every: Option<usize>,

    #[arg(long, default_value = "1s")]
    slow_create_delay: humantime::Duration,

    /// Reply to creations without an `id` field.
    #[arg(long)]
    omit_id: bool,
}

impl Args {
    fn behavior(&self) -> anyhow::Result<MockBehavior> {
        Ok(MockBehavior {
            health_status: StatusCode::from_u16(self.health_status)?,
            health_delay: self.health_delay.map(Into::into),
            create_status: self.create_status.map(StatusCode::from_u16).transpose()?,
            slow_create_every: self.slow_create_every,
            slow_create_delay: self.slow_create_delay.into(),
            omit_id: self.omit_id,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=debug,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    let behavior = args.behavior()?;

    tracing::info!("mock users API listening on {} with {behavior:?}", args.addr);
    mock_service::run(args.addr, behavior).await
}
