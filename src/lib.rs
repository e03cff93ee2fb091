//! Spending analytics for KPLC prepaid electricity tokens
//!
//! The core turns a meter's purchase history into daily, weekly, monthly and
//! yearly rollups in Nairobi local time (see [`services::Aggregator`]). Around
//! it sit a JSON-lines bill store and a client for the KPLC self-service API.

pub mod config;
pub mod services;
pub mod types;
