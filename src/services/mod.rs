//! Service layer for business logic
//!
//! Shared between the HTTP API and the CLI.

mod link_service;
pub mod plan;

pub use link_service::*;
pub use plan::{PlanPolicy, PlanTier};
