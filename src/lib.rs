//! Itafeed Backend Library
//!
//! Client for the Tachibana e-shiten market-data API: session login,
//! fixed-cadence board polling during the trading session, and PostgreSQL
//! persistence of the collected snapshots plus the instrument master table.
//!
//! Exposes core modules for use by binaries and tests.

pub mod api;
pub mod calendar;
pub mod collector;
pub mod config;
pub mod db;
pub mod master;
pub mod models;
