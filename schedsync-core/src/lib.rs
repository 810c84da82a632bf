//! Reconciliation engine for mirroring a class schedule into a calendar.
//!
//! - [`mapper`] turns sessions into event drafts with identity keys
//! - [`diff`] compares drafts with existing events and builds a plan
//! - [`executor`] applies the plan with retries, rate limiting and a worker pool
//! - [`sync`] ties fetching, planning and executing into one run

pub mod cancel;
pub mod config;
pub mod date_range;
pub mod diff;
pub mod error;
pub mod event;
pub mod executor;
pub mod identity;
pub mod mapper;
pub mod rate_limit;
pub mod remote;
pub mod report;
pub mod retry;
pub mod session;
pub mod source;
pub mod store;
pub mod sync;
