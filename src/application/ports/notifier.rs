use crate::domain::entities::Notice;

/// Sink for toast-style notices shown by the presentation layer.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
