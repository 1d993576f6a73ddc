//! Service tooling

pub mod status;
