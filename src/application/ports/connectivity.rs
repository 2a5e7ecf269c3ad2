use async_trait::async_trait;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;

    /// Feeds an online/offline event reported by the host platform. Probes that
    /// measure connectivity themselves ignore it.
    fn observe(&self, _online: bool) {}
}
