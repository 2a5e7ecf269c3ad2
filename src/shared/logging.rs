use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pos_sync_lib=debug,sync=debug,offline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
