pub mod schema_comparison;
pub mod sync_log_entry;
pub mod sync_operation;
pub mod sync_status;
pub mod table_sync_result;
