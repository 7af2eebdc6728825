//! Value-typed filesystem nodes.
//!
//! A node is the in-memory representation of one filesystem entry during
//! one request. It is constructed fresh per operation and identified purely
//! by its key, a slash-joined path relative to the bucket with no leading
//! separator; the empty key is the bucket root. Nodes move, they are never
//! shared or mutated across requests.

use std::fmt;

use gateway::ObjectBody;

/// Permission bits reported for directories.
pub const DIR_PERM: u16 = 0o755;
/// Permission bits reported for regular files.
pub const FILE_PERM: u16 = 0o644;

/// Classification of a node, carrying only the fields valid for it.
#[derive(Debug, Default)]
pub enum NodeKind {
    /// Not yet classified. Nodes rebuilt from a bare key between transport
    /// calls start here; resolution moves them to a terminal kind exactly
    /// once.
    #[default]
    Unresolved,
    Directory,
    File {
        size: u64,
        /// Open body from the get that resolved this node. Present only
        /// immediately after such a lookup; a node reconstructed for a
        /// write has none.
        body: Option<ObjectBody>,
    },
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Unresolved => "unresolved",
            NodeKind::Directory => "directory",
            NodeKind::File { .. } => "file",
        })
    }
}

/// One filesystem entry, valid for the duration of one request.
#[derive(Debug)]
pub struct Node {
    key: String,
    kind: NodeKind,
}

impl Node {
    /// The bucket root: empty key, always a directory.
    pub fn root() -> Self {
        Self::directory("")
    }

    pub fn directory(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: NodeKind::Directory,
        }
    }

    pub fn file(key: impl Into<String>, size: u64, body: Option<ObjectBody>) -> Self {
        Self {
            key: key.into(),
            kind: NodeKind::File { size, body },
        }
    }

    /// A node rebuilt from a bare key, not yet classified.
    pub fn unresolved(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: NodeKind::Unresolved,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Key of the child named `name` under this node. The root joins
    /// without a separator.
    pub fn child_key(&self, name: &str) -> String {
        if self.key.is_empty() {
            name.to_owned()
        } else {
            format!("{}/{}", self.key, name)
        }
    }

    /// Detach the open body, if any, consuming the node.
    pub fn into_body(self) -> Option<ObjectBody> {
        match self.kind {
            NodeKind::File { body, .. } => body,
            _ => None,
        }
    }
}

/// One name in a directory listing, for real objects and inferred
/// sub-prefixes alike. Whether the name is a file or a directory is not
/// known until it is itself resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
}

/// Entry kind as reported in synthesized attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttrKind {
    /// Defensive fallback for an unresolved node; should not occur after a
    /// successful lookup.
    #[default]
    Unknown,
    Directory,
    File,
}

/// Synthesized filesystem metadata. Directories report a fixed mode and
/// zero size; files report a fixed mode and the size captured at
/// resolution, which is not kept fresh afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub kind: AttrKind,
    pub perm: u16,
    pub size: u64,
}

/// Last path segment of a key or prefix: `"docs/sub/"` yields `"sub"`.
pub fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_directory_with_empty_key() {
        let root = Node::root();
        assert_eq!(root.key(), "");
        assert!(root.is_directory());
    }

    #[test]
    fn test_child_key_joins_without_leading_slash() {
        assert_eq!(Node::root().child_key("docs"), "docs");
        assert_eq!(Node::directory("docs").child_key("sub"), "docs/sub");
        assert_eq!(
            Node::directory("docs/sub").child_key("note.txt"),
            "docs/sub/note.txt"
        );
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("readme.txt"), "readme.txt");
        assert_eq!(base_name("docs/readme.txt"), "readme.txt");
        assert_eq!(base_name("docs/sub/"), "sub");
        assert_eq!(base_name("docs/"), "docs");
    }

    #[test]
    fn test_into_body_only_for_files() {
        assert!(Node::directory("d").into_body().is_none());
        assert!(Node::unresolved("u").into_body().is_none());
        assert!(Node::file("f", 0, None).into_body().is_none());
    }
}
