//! Command-line interface for treeload.

pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod scan;
