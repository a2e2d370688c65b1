pub mod id;

/// Instant on the shared schedule clock, in seconds.
pub type Time = i64;

/// Span on the shared schedule clock, in seconds.
pub type Duration = i64;
