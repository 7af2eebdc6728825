//! Key classification against the object store.
//!
//! The store has no "does this directory exist" primitive. A prefix is
//! confirmed to exist only by appearing as a common prefix in its parent's
//! delimiter-bounded listing, so classifying a key takes one exact get and
//! zero or more listing pages.

use gateway::{Gateway, GatewayError, ObjectBody};
use tracing::debug;

/// Outcome of classifying a key.
#[derive(Debug)]
pub enum Resolved {
    Directory,
    File { size: u64, body: ObjectBody },
    /// Neither an object nor a confirmed prefix. Not an error at this
    /// layer; callers turn it into their missing-entry signal.
    Absent,
}

/// Classify `key` as an object, a directory-like prefix, or absent.
///
/// The exact-key get runs first: an object match always wins over a prefix
/// match, even when a same-named prefix exists in the parent listing. The
/// prefix check pages through the parent's listing until the store reports
/// no further pages; an absent verdict is only reached after the final
/// page.
pub async fn resolve(gateway: &dyn Gateway, key: &str) -> Result<Resolved, GatewayError> {
    if key.is_empty() {
        // The root always exists and never touches the store.
        return Ok(Resolved::Directory);
    }

    if let Some((size, body)) = gateway.get(key).await? {
        debug!(key = %key, size, "resolved as object");
        return Ok(Resolved::File { size, body });
    }

    let parent = parent_prefix(key);
    let candidate = format!("{key}/");
    debug!(key = %key, parent = %parent, "checking for prefix match");

    let mut marker = None;
    loop {
        let page = gateway.list(&parent, "/", marker).await?;
        if page.common_prefixes.iter().any(|prefix| *prefix == candidate) {
            debug!(key = %key, "resolved as prefix");
            return Ok(Resolved::Directory);
        }
        match (page.is_truncated, page.next_marker) {
            (true, Some(next)) => marker = Some(next),
            _ => break,
        }
    }

    debug!(key = %key, "neither object nor prefix");
    Ok(Resolved::Absent)
}

/// Listing prefix for the parent of `key`: the directory portion with its
/// trailing separator, or the empty prefix for a top-level key.
fn parent_prefix(key: &str) -> String {
    match key.rfind('/') {
        Some(pos) => key[..=pos].to_owned(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use gateway::MemoryGateway;

    use super::*;

    #[tokio::test]
    async fn test_empty_key_is_always_a_directory() {
        let store = MemoryGateway::new();
        assert!(matches!(
            resolve(&store, "").await.unwrap(),
            Resolved::Directory
        ));
    }

    #[tokio::test]
    async fn test_object_resolves_as_file_with_body() {
        let store = MemoryGateway::new();
        store.insert("docs/readme.txt", Bytes::from_static(b"hello world"));

        match resolve(&store, "docs/readme.txt").await.unwrap() {
            Resolved::File { size, body } => {
                assert_eq!(size, 11);
                assert_eq!(body.read_to_end().await.unwrap(), b"hello world");
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prefix_resolves_as_directory() {
        let store = MemoryGateway::new();
        store.insert("docs/sub/note.txt", Bytes::new());

        assert!(matches!(
            resolve(&store, "docs").await.unwrap(),
            Resolved::Directory
        ));
        assert!(matches!(
            resolve(&store, "docs/sub").await.unwrap(),
            Resolved::Directory
        ));
    }

    #[tokio::test]
    async fn test_exact_object_wins_over_prefix() {
        let store = MemoryGateway::new();
        store.insert("report", Bytes::from_static(b"object"));
        store.insert("report/2024.txt", Bytes::new());

        match resolve(&store, "report").await.unwrap() {
            Resolved::File { size, .. } => assert_eq!(size, 6),
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let store = MemoryGateway::new();
        store.insert("docs/readme.txt", Bytes::new());

        assert!(matches!(
            resolve(&store, "docs/other.txt").await.unwrap(),
            Resolved::Absent
        ));
        assert!(matches!(
            resolve(&store, "nowhere").await.unwrap(),
            Resolved::Absent
        ));
    }

    #[tokio::test]
    async fn test_prefix_found_on_a_later_page() {
        // One row per page: the prefix check must keep following markers
        // past the first page to find "z".
        let store = MemoryGateway::with_page_size(1);
        store.insert("a/1", Bytes::new());
        store.insert("m", Bytes::new());
        store.insert("z/leaf", Bytes::new());

        assert!(matches!(
            resolve(&store, "z").await.unwrap(),
            Resolved::Directory
        ));
    }

    #[tokio::test]
    async fn test_absent_only_after_all_pages() {
        let store = MemoryGateway::with_page_size(1);
        for key in ["a/1", "b/1", "c/1", "d/1", "e"] {
            store.insert(key, Bytes::new());
        }

        assert!(matches!(
            resolve(&store, "zzz").await.unwrap(),
            Resolved::Absent
        ));
    }
}
