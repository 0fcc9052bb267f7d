//! Treeload - directory scan and batched load
//!
//! The binary is a thin shell over [`cli`]; the work happens in
//! `treeload_scout` (discovery and loading) and `treeload_sinks` (storage).

pub mod cli;

pub use treeload_protocol as protocol;
pub use treeload_scout as scout;
pub use treeload_sinks as sinks;
