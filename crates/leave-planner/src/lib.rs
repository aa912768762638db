//! Single-day leave requests, approval workflow, and project conflict hints.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
