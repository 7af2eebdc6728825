//! The silo daemon: CLI shell and FUSE bridge over the mount operations.

pub mod cli;

#[cfg(feature = "fuse")]
pub mod fuse;
