//! Daily check-in runner for session-cookie websites.
//!
//! A run walks a fixed registry of targets, checks in to every target that
//! has a credential and has not been checked in today, scrapes a handful of
//! account fields, persists per-target state, and sends one report.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod extract;
pub mod fetch;
pub mod grammar;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod storage;

#[cfg(test)]
mod testing;
