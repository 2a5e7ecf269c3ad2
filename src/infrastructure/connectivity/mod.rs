use crate::application::ports::ConnectivityProbe;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Considers the device online when the API host answers at all, whatever the status.
pub struct HttpConnectivityProbe {
    client: Client,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(target: "offline::fallback", url = %self.url, error = %err, "connectivity probe failed");
                false
            }
        }
    }
}

/// Connectivity flag driven by the host platform's online/offline events, fed
/// through `AppState::set_online`.
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Returns the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConnectivityProbe for ManualConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn observe(&self, online: bool) {
        self.set_online(online);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_flag_toggles() {
        let probe = ManualConnectivity::default();
        assert!(probe.is_online().await);
        assert!(probe.set_online(false));
        assert!(!probe.is_online().await);

        probe.observe(true);
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn unreachable_host_is_offline() {
        // Port 9 (discard) on localhost is closed in test environments.
        let probe = HttpConnectivityProbe::new("http://127.0.0.1:9/", Duration::from_millis(500));
        assert!(!probe.is_online().await);
    }
}
