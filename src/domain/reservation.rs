pub mod constraint_tracker;
pub mod request;
pub mod reservation;
pub mod timeline;
