//! Activity row read back from `tbl_tarl_user_activities`.

use super::activity_entry::ActivityEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    #[serde(flatten)]
    pub entry: ActivityEntry,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}
