pub mod conflict_oracle;
pub mod memory_view;
pub mod negotiation_table;
pub mod route;
pub mod route_validator;
pub mod schedule_view;
