//! FUSE filesystem integration for silo
//!
//! This module bridges kernel filesystem requests to mount operations.
//!
//! # Architecture
//!
//! - `SiloFs`: FUSE filesystem implementation using fuser
//! - `InodeTable`: bidirectional inode ↔ object-key mapping
//!
//! The kernel addresses entries by inode number while mount operations work
//! on bucket-relative keys, so the table is the only state the bridge keeps
//! across requests. Nodes themselves are rebuilt from their key per request;
//! there is no node or content cache.

mod inode_table;
mod silo_fs;

pub use inode_table::InodeTable;
pub use silo_fs::SiloFs;
