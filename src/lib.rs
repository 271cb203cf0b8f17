//! Covscope - module discovery and coverage filtering for binary coverage tools
//!
//! This library provides the front end of a coverage run: discovering every
//! module reachable from an entry module, and deciding per module and per class
//! whether it is in scope for instrumentation.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod filter;
pub mod scope;
