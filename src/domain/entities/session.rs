use crate::domain::value_objects::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub token: String,
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: String, name: String, role: Role, token: String) -> Self {
        Self {
            user_id,
            name,
            role,
            token,
            logged_in_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
