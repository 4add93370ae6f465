//! Activity to append to the audit trail.

use super::action_type::ActionType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(rename = "action_type")]
    pub action: ActionType,
    pub table_name: String,
    #[serde(default)]
    pub record_id: Option<i64>,
    #[serde(default)]
    pub old_data: Option<Value>,
    #[serde(default)]
    pub new_data: Option<Value>,
    #[serde(default)]
    pub changes_summary: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ActivityEntry {
    pub fn new(action: ActionType, table_name: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: None,
            user_role: None,
            action,
            table_name: table_name.into(),
            record_id: None,
            old_data: None,
            new_data: None,
            changes_summary: None,
            ip_address: None,
            user_agent: None,
            session_id: None,
        }
    }
}
