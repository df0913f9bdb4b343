//! Compliance aggregation and eligibility-window engine for RTO document
//! tracking: role-scoped dashboard counts, learner-license eligibility merged
//! across the legacy and registry tables, expiry windows over seven vehicle
//! document types, and deduplicated global search.

pub mod compliance;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
