//! In-memory gateway backend.
//!
//! Used by tests and local experimentation. Pagination is real: listings
//! are cut into pages of `page_size` rows with marker semantics matching
//! the S3 contract, so callers that fail to drain a truncated listing
//! misbehave here the same way they would against the real store.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::body::ObjectBody;
use crate::error::GatewayError;
use crate::{Gateway, ListPage};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Gateway over an in-memory key/value map.
#[derive(Debug)]
pub struct MemoryGateway {
    objects: RwLock<BTreeMap<String, Bytes>>,
    page_size: usize,
}

/// One row of a merged listing: objects and grouped sub-prefixes share a
/// single lexicographic order, and the page marker walks that order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Row {
    Object(String),
    Prefix(String),
}

impl Row {
    fn sort_key(&self) -> &str {
        match self {
            Row::Object(key) => key,
            Row::Prefix(prefix) => prefix,
        }
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A gateway whose listings hold at most `page_size` rows per page.
    /// Tests use small sizes to force multi-page listings.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Seed an object directly, bypassing the trait.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(key.into(), data.into());
    }

    /// True when an object with this exact key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// All rows under `prefix`, in listing order. Keys iterate sorted, and
    /// every key grouped under one sub-prefix is contiguous, so duplicate
    /// prefix rows are adjacent and collapse as they are produced.
    fn rows(&self, prefix: &str, delimiter: &str) -> Vec<Row> {
        let objects = self.objects.read();
        let mut rows = Vec::new();
        for key in objects.keys() {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            let row = if delimiter.is_empty() {
                Row::Object(key.clone())
            } else {
                match rest.find(delimiter) {
                    Some(pos) => {
                        Row::Prefix(format!("{prefix}{}", &rest[..pos + delimiter.len()]))
                    }
                    None => Row::Object(key.clone()),
                }
            };
            if rows.last() != Some(&row) {
                rows.push(row);
            }
        }
        rows
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Gateway for MemoryGateway {
    async fn get(&self, key: &str) -> Result<Option<(u64, ObjectBody)>, GatewayError> {
        let objects = self.objects.read();
        Ok(objects
            .get(key)
            .map(|data| (data.len() as u64, ObjectBody::from_bytes(key, data.clone()))))
    }

    async fn list(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: Option<String>,
    ) -> Result<ListPage, GatewayError> {
        let rows = self.rows(prefix, delimiter);
        let start = match marker {
            Some(marker) => rows
                .iter()
                .position(|row| row.sort_key() > marker.as_str())
                .unwrap_or(rows.len()),
            None => 0,
        };
        let end = rows.len().min(start + self.page_size);
        let is_truncated = end < rows.len();

        let mut page = ListPage {
            is_truncated,
            next_marker: is_truncated
                .then(|| rows[end - 1].sort_key().to_owned()),
            ..ListPage::default()
        };
        for row in &rows[start..end] {
            match row {
                Row::Object(key) => page.objects.push(key.clone()),
                Row::Prefix(common) => page.common_prefixes.push(common.clone()),
            }
        }
        Ok(page)
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), GatewayError> {
        self.objects.write().insert(key.to_owned(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.objects.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(page_size: usize, keys: &[&str]) -> MemoryGateway {
        let store = MemoryGateway::with_page_size(page_size);
        for key in keys {
            store.insert(*key, Bytes::from_static(b"x"));
        }
        store
    }

    #[tokio::test]
    async fn test_get_roundtrip_and_miss() {
        let store = MemoryGateway::new();
        store.insert("a/b.txt", Bytes::from_static(b"hello"));

        let (size, body) = store.get("a/b.txt").await.unwrap().unwrap();
        assert_eq!(size, 5);
        assert_eq!(body.read_to_end().await.unwrap(), b"hello");

        assert!(store.get("a/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryGateway::new();
        store.insert("k", Bytes::new());

        store.delete("k").await.unwrap();
        assert!(!store.contains("k"));
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_groups_prefixes() {
        let store = seeded(1000, &["docs/readme.txt", "docs/sub/note.txt", "top.txt"]);

        let page = store.list("", "/", None).await.unwrap();
        assert_eq!(page.objects, vec!["top.txt"]);
        assert_eq!(page.common_prefixes, vec!["docs/"]);
        assert!(!page.is_truncated);
        assert!(page.next_marker.is_none());

        let page = store.list("docs/", "/", None).await.unwrap();
        assert_eq!(page.objects, vec!["docs/readme.txt"]);
        assert_eq!(page.common_prefixes, vec!["docs/sub/"]);
    }

    #[tokio::test]
    async fn test_list_dedupes_shared_prefix() {
        let store = seeded(1000, &["a/1", "a/2", "a/3", "b"]);

        let page = store.list("", "/", None).await.unwrap();
        assert_eq!(page.common_prefixes, vec!["a/"]);
        assert_eq!(page.objects, vec!["b"]);
    }

    #[tokio::test]
    async fn test_list_paginates_with_marker_resume() {
        let store = seeded(2, &["a", "b", "c", "d", "e"]);

        let mut collected = Vec::new();
        let mut marker = None;
        let mut pages = 0;
        loop {
            let page = store.list("", "/", marker).await.unwrap();
            pages += 1;
            collected.extend(page.objects);
            if !page.is_truncated {
                assert!(page.next_marker.is_none());
                break;
            }
            marker = page.next_marker;
            assert!(marker.is_some());
        }

        assert_eq!(pages, 3);
        assert_eq!(collected, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_list_mixed_rows_paginate_in_order() {
        let store = seeded(1, &["a/x", "b", "c/y", "d"]);

        let first = store.list("", "/", None).await.unwrap();
        assert_eq!(first.common_prefixes, vec!["a/"]);
        assert!(first.is_truncated);

        let second = store
            .list("", "/", first.next_marker)
            .await
            .unwrap();
        assert_eq!(second.objects, vec!["b"]);
        assert!(second.is_truncated);
    }

    #[tokio::test]
    async fn test_list_includes_self_key_object() {
        // An object whose key equals the listed prefix shows up as a row;
        // filtering it out is the caller's concern.
        let store = seeded(1000, &["docs/", "docs/a.txt"]);

        let page = store.list("docs/", "/", None).await.unwrap();
        assert_eq!(page.objects, vec!["docs/", "docs/a.txt"]);
    }
}
