pub mod planner;
pub mod reservation;
pub mod scenario;
pub mod schedule;
pub mod traffic;
pub mod utils;
