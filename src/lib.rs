//! LabSense Library
//!
//! Core functionality for lab-report analysis, report composition, and PDF export.

pub mod build_info;
pub mod db;
pub mod error;
pub mod history;
pub mod mcp;
pub mod models;
pub mod providers;
pub mod report;
pub mod session;
pub mod tools;
