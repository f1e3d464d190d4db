//! Infrastructure layer - storage backends, services and runtime plumbing

pub mod auth;
pub mod budget;
pub mod logging;
pub mod observability;
pub mod storage;
pub mod usage;
