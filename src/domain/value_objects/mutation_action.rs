use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MutationAction {
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "update")]
    Update,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::Update => "update",
        }
    }

    pub fn from_value(value: &str) -> Result<Self, String> {
        match value {
            "create" => Ok(MutationAction::Create),
            "update" => Ok(MutationAction::Update),
            other => Err(format!("Unknown mutation action: {other}")),
        }
    }
}
