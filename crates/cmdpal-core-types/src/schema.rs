//! Canonical schema constants for structured logging and events
//!
//! The logging macros emit these event names; the test capture layer
//! reads the field keys back.

// Field keys read back from captured events
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_PASS_ID: &str = "pass_id";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
