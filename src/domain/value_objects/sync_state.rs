use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SyncState {
    #[serde(rename = "synced")]
    Synced,
    #[serde(rename = "unsynced")]
    Unsynced,
    #[serde(rename = "pending_offline")]
    PendingOffline,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Synced => "synced",
            SyncState::Unsynced => "unsynced",
            SyncState::PendingOffline => "pending_offline",
        }
    }

    pub fn from_value(value: &str) -> Result<Self, String> {
        match value {
            "synced" => Ok(SyncState::Synced),
            "unsynced" => Ok(SyncState::Unsynced),
            "pending_offline" => Ok(SyncState::PendingOffline),
            other => Err(format!("Unknown sync state: {other}")),
        }
    }

    /// Local changes the server has not confirmed yet.
    pub fn is_dirty(&self) -> bool {
        !matches!(self, SyncState::Synced)
    }
}
