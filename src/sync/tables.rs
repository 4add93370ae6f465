//! Tables eligible for replication.

/// Replicated tables, parents before children.
///
/// A full sync truncates with `CASCADE`, so a parent must be copied before
/// any table that references it or the cascade would empty the child again.
pub const SYNC_TABLES: &[&str] = &[
    "tbl_tarl_countries",
    "tbl_tarl_provinces",
    "tbl_tarl_districts",
    "tbl_tarl_clusters",
    "tbl_tarl_schools",
    "tbl_tarl_teachers",
    "tbl_tarl_classes",
    "tbl_tarl_students",
    "tbl_tarl_student_assessments",
    "tbl_tarl_observations",
    "tbl_tarl_observation_activities",
    "tbl_tarl_training_sessions",
    "tbl_tarl_training_participants",
    "tbl_tarl_training_feedback",
    "tbl_tarl_transcripts",
];

/// Never replicated: credentials, sessions, the local audit trail and
/// local-only settings.
pub const EXCLUDED_TABLES: &[&str] = &[
    "tbl_tarl_users",
    "tbl_tarl_user_sessions",
    "tbl_tarl_user_activities",
    "tbl_tarl_password_resets",
    "tbl_tarl_permissions",
    "tbl_tarl_settings",
];

pub fn is_syncable(table: &str) -> bool {
    SYNC_TABLES.contains(&table)
}

pub fn is_excluded(table: &str) -> bool {
    EXCLUDED_TABLES.contains(&table)
}
