//! Command implementations

pub mod classify;
pub mod resolve;
pub mod run;
pub mod scan;
