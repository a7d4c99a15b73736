//! Tip-pool reconciliation engine.
//!
//! Collected tips and service-charge gratuities earned by contributing
//! employees are partially redistributed to receiving employees entitled
//! to a negotiated percentage, net of per-person deductions, producing an
//! auditable, approvable payout schedule. This crate holds the pure
//! allocation math and the edit-session/approval lifecycle around it;
//! schedule data and persistence live behind the [`store`] traits.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod models;
pub mod session;
pub mod store;
pub mod utils;
