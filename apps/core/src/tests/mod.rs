//! Test Module
//!
//! Crate-level test suite for the ERPChat backend.
//!
//! ## Test Categories
//! - `fixtures`: in-memory stores, scripted generators and temp databases
//! - `brain_tests`: resolver stages, proactive evaluation, pipeline properties
//! - `provider_tests`: wire formats of every provider against a mock server
//! - `database_tests`: record store CRUD, settings, operational aggregates, seeds
//! - `supervisor_tests`: outer request handler and the supervisor actor
//! - `integration_tests`: end-to-end scenarios through the supervisor

pub mod provider_tests;
pub mod supervisor_tests;
