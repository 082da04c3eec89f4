//! cadence - an outbound drip-campaign delivery engine
//!
//! This crate provides the core functionality for the cadence campaign
//! engine: a scheduler that drives multi-step email sequences across a
//! contact list under warmup, deliverability, and business-hours
//! constraints, with asynchronous delivery-status reconciliation feeding
//! blacklisting, follow-up suppression, and CRM updates.

pub mod config;
pub mod dns;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
