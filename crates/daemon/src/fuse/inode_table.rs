//! Bidirectional inode ↔ object-key mapping for the FUSE bridge
//!
//! FUSE uses 64-bit inode numbers to identify files and directories, while
//! every mount operation works on a bucket-relative key. This table keeps
//! the two in sync; it carries no other node state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bidirectional mapping between inodes and object keys
#[derive(Debug)]
pub struct InodeTable {
    /// Key to inode mapping
    key_to_inode: HashMap<String, u64>,
    /// Inode to key mapping
    inode_to_key: HashMap<u64, String>,
    /// Next available inode number (starts at 2, as 1 is reserved for root)
    next_inode: AtomicU64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Root inode number (always 1 in FUSE); maps to the empty key.
    pub const ROOT_INODE: u64 = 1;

    /// Create a new inode table with root pre-registered
    pub fn new() -> Self {
        let mut table = Self {
            key_to_inode: HashMap::new(),
            inode_to_key: HashMap::new(),
            next_inode: AtomicU64::new(2),
        };

        table.key_to_inode.insert(String::new(), Self::ROOT_INODE);
        table.inode_to_key.insert(Self::ROOT_INODE, String::new());

        table
    }

    /// Get or create an inode for a key
    pub fn get_or_create(&mut self, key: &str) -> u64 {
        let normalized = Self::normalize_key(key);

        if let Some(&inode) = self.key_to_inode.get(&normalized) {
            return inode;
        }

        let inode = self.next_inode.fetch_add(1, Ordering::SeqCst);
        self.key_to_inode.insert(normalized.clone(), inode);
        self.inode_to_key.insert(inode, normalized);
        inode
    }

    /// Get the inode for a key if it exists
    pub fn get_inode(&self, key: &str) -> Option<u64> {
        let normalized = Self::normalize_key(key);
        self.key_to_inode.get(&normalized).copied()
    }

    /// Get the key for an inode if it exists
    pub fn get_key(&self, inode: u64) -> Option<&str> {
        self.inode_to_key.get(&inode).map(String::as_str)
    }

    /// Remove by key and return the inode
    pub fn remove_by_key(&mut self, key: &str) -> Option<u64> {
        let normalized = Self::normalize_key(key);
        if let Some(inode) = self.key_to_inode.remove(&normalized) {
            self.inode_to_key.remove(&inode);
            Some(inode)
        } else {
            None
        }
    }

    /// Normalize a key to a consistent format: no leading or trailing
    /// separators; the root is the empty key.
    fn normalize_key(key: &str) -> String {
        key.trim_matches('/').to_owned()
    }

    /// Key of the parent directory of `key` (empty for top-level keys).
    pub fn parent_key(key: &str) -> &str {
        match key.rfind('/') {
            Some(pos) => &key[..pos],
            None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_inode() {
        let table = InodeTable::new();
        assert_eq!(table.get_inode(""), Some(InodeTable::ROOT_INODE));
        assert_eq!(table.get_key(InodeTable::ROOT_INODE), Some(""));
    }

    #[test]
    fn test_get_or_create() {
        let mut table = InodeTable::new();

        let inode1 = table.get_or_create("docs/readme.txt");
        let inode2 = table.get_or_create("docs/readme.txt");
        let inode3 = table.get_or_create("docs");

        assert_eq!(inode1, inode2);
        assert_ne!(inode1, inode3);
        assert_ne!(inode1, InodeTable::ROOT_INODE);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(InodeTable::normalize_key(""), "");
        assert_eq!(InodeTable::normalize_key("/"), "");
        assert_eq!(InodeTable::normalize_key("docs"), "docs");
        assert_eq!(InodeTable::normalize_key("docs/"), "docs");
        assert_eq!(InodeTable::normalize_key("/docs/sub"), "docs/sub");
    }

    #[test]
    fn test_parent_key() {
        assert_eq!(InodeTable::parent_key(""), "");
        assert_eq!(InodeTable::parent_key("docs"), "");
        assert_eq!(InodeTable::parent_key("docs/sub"), "docs");
        assert_eq!(InodeTable::parent_key("docs/sub/note.txt"), "docs/sub");
    }

    #[test]
    fn test_remove_by_key() {
        let mut table = InodeTable::new();
        let inode = table.get_or_create("docs/readme.txt");

        assert_eq!(table.remove_by_key("docs/readme.txt"), Some(inode));
        assert!(table.get_inode("docs/readme.txt").is_none());
        assert!(table.get_key(inode).is_none());
        assert_eq!(table.remove_by_key("docs/readme.txt"), None);
    }
}
