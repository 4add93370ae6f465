pub mod action_type;
pub mod activity_entry;
pub mod activity_record;
