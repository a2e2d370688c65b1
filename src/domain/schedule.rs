pub mod schedule_patch;
pub mod schedule_state;
