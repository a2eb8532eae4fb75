use anyhow::Context;
use mock_service::{MockBehavior, MockServer};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("loadprobe=debug,mock_service=info")
            .with_test_writer()
            .try_init();
    });
}

#[allow(unused)]
pub async fn mock(behavior: MockBehavior) -> anyhow::Result<MockServer> {
    MockServer::start(behavior)
        .await
        .context("unable to start mock service")
}

/// A local address with nothing listening on it.
#[allow(unused)]
pub fn dead_addr() -> anyhow::Result<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?)
}
