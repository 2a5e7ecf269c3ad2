use anyhow::{Context, Result, bail};
use pos_sync_lib::{AppConfig, AppState, Credentials, init_logging};
use std::env;

fn login_credentials() -> Option<Credentials> {
    let email = env::var("POS_LOGIN_EMAIL").ok()?;
    let password = env::var("POS_LOGIN_PASSWORD").ok()?;
    Some(Credentials { email, password })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AppConfig::from_env();
    let state = AppState::new(config)
        .await
        .context("failed to initialize application state")?;

    let session = match state.session.restore().await? {
        Some(session) => session,
        None => {
            let Some(credentials) = login_credentials() else {
                bail!("no stored session; set POS_LOGIN_EMAIL and POS_LOGIN_PASSWORD");
            };
            state
                .session
                .login(&credentials)
                .await
                .context("login failed")?
        }
    };
    tracing::info!(user = %session.name, role = %session.role, "signed in");

    let handle = state.start_sync();
    if handle.is_none() {
        if let Some(report) = state.sync.run_once().await {
            tracing::info!(
                synced = report.synced_count(),
                errors = report.error_count(),
                "single sync pass complete"
            );
        }
        state.shutdown().await;
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");

    if let Some(handle) = handle {
        handle.cancel();
        handle.join().await;
    }
    state.shutdown().await;
    Ok(())
}
