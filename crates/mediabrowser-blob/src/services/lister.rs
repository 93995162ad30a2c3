//! Delimited object listing

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::backend::{ListingQuery, ObjectBackend, RawEntry};
use crate::error::BlobError;
use crate::services::file::File;

enum PageCursor {
    First,
    Next(String),
    Exhausted,
}

struct EntryState<'a> {
    backend: &'a dyn ObjectBackend,
    query: &'a ListingQuery,
    buffered: VecDeque<RawEntry>,
    cursor: PageCursor,
}

/// Lazily walk every page of a delimited listing, in backend order.
///
/// The stream fetches the next page only once the buffered entries of the
/// previous one are consumed, and ends after the page without a token.
pub fn object_entries<'a>(
    backend: &'a dyn ObjectBackend,
    query: &'a ListingQuery,
) -> BoxStream<'a, Result<RawEntry, BlobError>> {
    let state = EntryState {
        backend,
        query,
        buffered: VecDeque::new(),
        cursor: PageCursor::First,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(entry) = state.buffered.pop_front() {
                return Ok(Some((entry, state)));
            }

            let token = match &state.cursor {
                PageCursor::Exhausted => return Ok(None),
                PageCursor::First => None,
                PageCursor::Next(token) => Some(token.clone()),
            };

            let page = state
                .backend
                .list_page(state.query, token.as_deref())
                .await?;

            state.cursor = match page.next_page_token {
                Some(token) if !token.is_empty() => PageCursor::Next(token),
                _ => PageCursor::Exhausted,
            };
            state.buffered.extend(page.entries);
        }
    })
    .boxed()
}

/// Lists one directory level of the bucket
pub struct ObjectLister {
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectLister {
    pub fn new(backend: Arc<dyn ObjectBackend>) -> Self {
        Self { backend }
    }

    /// List the subdirectories and files directly under `prefix`.
    ///
    /// The whole listing is drained before returning; a failure on any page
    /// fails the call.
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<File>, BlobError> {
        let query = ListingQuery::directory(prefix);
        debug!("Requesting objects matching {:?}", prefix);

        let mut entries = object_entries(self.backend.as_ref(), &query);
        let mut files = Vec::new();

        while let Some(entry) = entries.try_next().await.map_err(BlobError::into_storage)? {
            match entry {
                RawEntry::Prefix(subdirectory) => files.push(File::directory(&subdirectory)),
                RawEntry::Object(attrs) if attrs.name != query.prefix => {
                    files.push(File::object(attrs))
                }
                RawEntry::Object(_) => {}
            }
        }

        debug!("Listed {} entries under {:?}", files.len(), prefix);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{attrs, InMemoryBackend};

    #[tokio::test]
    async fn test_lists_directories_and_files() {
        let backend = InMemoryBackend::with_objects(&["a/b.txt", "a/c/d.txt"]);
        let lister = ObjectLister::new(Arc::new(backend));

        let files = lister.list_objects("a/").await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0], File::directory("a/c/"));
        assert_eq!(files[0].name, "c/");
        assert_eq!(files[0].path, "/a/c/");
        assert!(files[0].is_directory);
        assert_eq!(files[1].name, "b.txt");
        assert_eq!(files[1].path, "/a/b.txt");
        assert!(!files[1].is_directory);
    }

    #[tokio::test]
    async fn test_skips_directory_marker() {
        let backend = InMemoryBackend::with_objects(&["a/", "a/b.txt"]);
        let lister = ObjectLister::new(Arc::new(backend));

        let files = lister.list_objects("a/").await.unwrap();

        assert_eq!(files.len(), 1);
        assert!(files.iter().all(|f| f.path != "/a/"));
    }

    #[tokio::test]
    async fn test_empty_prefix_lists_root() {
        let backend = InMemoryBackend::with_objects(&["top.txt", "a/b.txt", "z/y.txt"]);
        let lister = ObjectLister::new(Arc::new(backend));

        let files = lister.list_objects("").await.unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["/a/", "/z/", "/top.txt"]);
    }

    #[tokio::test]
    async fn test_walks_all_pages_in_backend_order() {
        let backend = InMemoryBackend::paged(vec![
            vec![RawEntry::Object(attrs("p/2.txt"))],
            vec![RawEntry::Prefix("p/q/".to_string())],
            vec![RawEntry::Object(attrs("p/1.txt"))],
        ]);
        let lister = ObjectLister::new(Arc::new(backend));

        let files = lister.list_objects("p/").await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["2.txt", "q/", "1.txt"]);
    }

    #[tokio::test]
    async fn test_mid_listing_failure_returns_no_partial_results() {
        let backend = InMemoryBackend::paged(vec![
            vec![RawEntry::Object(attrs("p/1.txt"))],
            vec![RawEntry::Object(attrs("p/2.txt"))],
        ])
        .failing_on_page(1);
        let lister = ObjectLister::new(Arc::new(backend));

        let result = lister.list_objects("p/").await;

        assert!(matches!(result, Err(BlobError::Storage(_))));
    }

    #[tokio::test]
    async fn test_backend_not_found_surfaces_as_storage_error() {
        let backend = InMemoryBackend::paged(vec![vec![]]).failing_with_not_found();
        let lister = ObjectLister::new(Arc::new(backend));

        let result = lister.list_objects("").await;

        assert!(matches!(result, Err(BlobError::Storage(_))));
    }

    #[tokio::test]
    async fn test_stream_fetches_pages_lazily() {
        let backend = InMemoryBackend::paged(vec![
            vec![RawEntry::Object(attrs("p/1.txt"))],
            vec![RawEntry::Object(attrs("p/2.txt"))],
        ]);
        let query = ListingQuery::directory("p/");

        {
            let mut entries = object_entries(&backend, &query);
            let first = entries.try_next().await.unwrap();
            assert!(first.is_some());
        }

        assert_eq!(backend.pages_requested(), 1);
    }
}
