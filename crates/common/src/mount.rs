//! Mount operations: the filesystem contract over the gateway.
//!
//! Each operation runs on per-request node values and issues its own
//! gateway calls; the only shared state is the gateway handle itself,
//! immutable after construction, so concurrent requests need no
//! coordination. Every operation that touches the store takes a
//! cancellation token: in-flight gateway calls are never aborted, but a
//! raised token discards the completed result and reports interruption
//! instead (best-effort cancellation).

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gateway::Gateway;

use crate::error::MountError;
use crate::node::{
    base_name, AttrKind, Attributes, DirEntry, Node, NodeKind, DIR_PERM, FILE_PERM,
};
use crate::resolve::{resolve, Resolved};

/// Filesystem operations over one bucket.
#[derive(Clone)]
pub struct Mount {
    gateway: Arc<dyn Gateway>,
}

impl Mount {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// The bucket root. Never fails and never touches the store.
    pub fn root(&self) -> Node {
        Node::root()
    }

    /// Synthesize metadata from an already-resolved node. Pure; the store
    /// is not consulted and the size is whatever resolution captured.
    pub fn attributes(&self, node: &Node) -> Attributes {
        match node.kind() {
            NodeKind::Directory => Attributes {
                kind: AttrKind::Directory,
                perm: DIR_PERM,
                size: 0,
            },
            NodeKind::File { size, .. } => Attributes {
                kind: AttrKind::File,
                perm: FILE_PERM,
                size: *size,
            },
            NodeKind::Unresolved => Attributes::default(),
        }
    }

    /// Resolve the child named `name` under `parent`.
    pub async fn lookup(
        &self,
        parent: &Node,
        name: &str,
        intr: &CancellationToken,
    ) -> Result<Node, MountError> {
        let key = parent.child_key(name);
        let resolved = resolve(self.gateway.as_ref(), &key).await?;
        if intr.is_cancelled() {
            return Err(MountError::Interrupted);
        }
        let node = match resolved {
            Resolved::Directory => Node::directory(&key),
            Resolved::File { size, body } => Node::file(&key, size, Some(body)),
            Resolved::Absent => return Err(MountError::NotFound(key)),
        };
        debug!(key = %node.key(), kind = %node.kind(), "lookup");
        Ok(node)
    }

    /// List the entries directly under a directory node.
    ///
    /// Pages through the listing to exhaustion before producing any result;
    /// a failed page fails the whole operation with no partial entry set.
    /// Entry order carries no contract.
    pub async fn read_directory(
        &self,
        node: &Node,
        intr: &CancellationToken,
    ) -> Result<Vec<DirEntry>, MountError> {
        if !node.is_directory() {
            return Err(MountError::NotADirectory(node.key().to_owned()));
        }

        let prefix = if node.key().is_empty() {
            String::new()
        } else {
            format!("{}/", node.key())
        };

        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        let mut marker = None;
        loop {
            let page = self.gateway.list(&prefix, "/", marker).await?;
            if intr.is_cancelled() {
                return Err(MountError::Interrupted);
            }
            // The prefix's own self-entry (an object keyed exactly like the
            // prefix) is not a child.
            objects.extend(page.objects.into_iter().filter(|key| *key != prefix));
            prefixes.extend(
                page.common_prefixes
                    .into_iter()
                    .filter(|common| *common != prefix),
            );
            match (page.is_truncated, page.next_marker) {
                (true, Some(next)) => marker = Some(next),
                _ => break,
            }
        }

        let entries: Vec<DirEntry> = objects
            .iter()
            .chain(prefixes.iter())
            .map(|key| DirEntry {
                name: base_name(key).to_owned(),
            })
            .collect();
        debug!(key = %node.key(), entries = entries.len(), "read directory");
        Ok(entries)
    }

    /// Read a file node's entire contents, consuming the node.
    ///
    /// A node handed back by the transport layer between calls carries only
    /// its key, so a missing body triggers a re-lookup of the node's own
    /// key before reading. The body handle is consumed on every exit path.
    pub async fn read_all(
        &self,
        node: Node,
        intr: &CancellationToken,
    ) -> Result<Vec<u8>, MountError> {
        let key = node.key().to_owned();
        let body = match node.into_body() {
            Some(body) => body,
            None => {
                debug!(key = %key, "no open body, re-resolving");
                match resolve(self.gateway.as_ref(), &key).await? {
                    Resolved::File { body, .. } => body,
                    Resolved::Directory => return Err(MountError::NotAFile(key)),
                    Resolved::Absent => return Err(MountError::MissingBody(key)),
                }
            }
        };

        let data = body.read_to_end().await?;
        if intr.is_cancelled() {
            return Err(MountError::Interrupted);
        }
        debug!(key = %key, bytes = data.len(), "read file");
        Ok(data)
    }

    /// Create the child named `name` under `parent`.
    ///
    /// A directory is implicit: nothing is written, and it stays invisible
    /// to listings until it holds at least one object. A file is
    /// established with a zero-length put.
    pub async fn create(
        &self,
        parent: &Node,
        name: &str,
        is_directory: bool,
        intr: &CancellationToken,
    ) -> Result<Node, MountError> {
        let key = parent.child_key(name);
        let node = if is_directory {
            Node::directory(&key)
        } else {
            self.gateway.put(&key, Bytes::new()).await?;
            Node::file(&key, 0, None)
        };
        if intr.is_cancelled() {
            return Err(MountError::Interrupted);
        }
        debug!(key = %key, kind = %node.kind(), "created");
        Ok(node)
    }

    /// Delete the child named `name` under `parent`. No existence check:
    /// removing an already-absent entry succeeds.
    pub async fn remove(
        &self,
        parent: &Node,
        name: &str,
        intr: &CancellationToken,
    ) -> Result<(), MountError> {
        let key = parent.child_key(name);
        self.gateway.delete(&key).await?;
        if intr.is_cancelled() {
            return Err(MountError::Interrupted);
        }
        debug!(key = %key, "removed");
        Ok(())
    }

    /// Replace a file node's contents with `data`, whole-object.
    pub async fn write_all(
        &self,
        node: &Node,
        data: Bytes,
        intr: &CancellationToken,
    ) -> Result<(), MountError> {
        if !node.is_file() {
            return Err(MountError::NotAFile(node.key().to_owned()));
        }
        let size = data.len();
        self.gateway.put(node.key(), data).await?;
        if intr.is_cancelled() {
            return Err(MountError::Interrupted);
        }
        debug!(key = %node.key(), bytes = size, "wrote file");
        Ok(())
    }
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount").finish_non_exhaustive()
    }
}
