//! Filesystem semantics over a flat object namespace.
//!
//! An object store has no directories. This crate closes that gap: the
//! [`resolve`] module infers whether a key names an object, a directory-like
//! prefix, or nothing, and the [`mount`] module maps filesystem operations
//! (lookup, listing, whole-file read/write, create, remove) onto the four
//! gateway primitives. Nodes are per-request values identified purely by
//! their key string; nothing is cached between requests.

pub mod error;
pub mod mount;
pub mod node;
pub mod resolve;

pub use error::MountError;
pub use mount::Mount;
pub use node::{AttrKind, Attributes, DirEntry, Node, NodeKind};
pub use resolve::{resolve, Resolved};
