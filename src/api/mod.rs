//! JIRA API client and types.
//!
//! This module provides the interface for communicating with the JIRA REST API.

mod auth;
mod client;
mod error;
mod types;

pub use client::JiraClient;
pub use error::ApiError;
