//! Periodic task implementations

pub mod expired_tokens;
