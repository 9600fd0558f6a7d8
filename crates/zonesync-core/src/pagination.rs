//! Cursor-based pagination
//!
//! Providers return a fixed page size per call. [`paginate`] walks any such
//! collection until the provider stops handing out a next cursor, so zone
//! listing and record listing share one traversal.

use crate::error::{Error, Result};
use std::future::Future;
use tracing::debug;

/// Opaque page cursor handed back by the provider
pub type Cursor = String;

/// One page of a paginated collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in provider order
    pub items: Vec<T>,
    /// Cursor for the next page, `None` on the last page
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    /// A page followed by another one
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next }
    }

    /// The final page
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// A page fetch failed part way through the collection
#[derive(Debug)]
pub struct PaginationError<T> {
    /// Items gathered from the pages fetched before the failure
    pub items: Vec<T>,
    /// 1-based number of the page that failed
    pub page: usize,
    /// The failure
    pub error: Error,
}

impl<T> PaginationError<T> {
    /// Drop the partial items and keep the failure
    pub fn into_error(self) -> Error {
        self.error
    }
}

/// Fetch every page of a collection, starting from the empty cursor
///
/// Items are concatenated in response order. An empty page that still carries
/// a next cursor is valid and paging continues. The first failing page stops
/// the walk; the error is returned along with everything gathered so far.
pub async fn paginate<T, F, Fut>(mut fetch: F) -> std::result::Result<Vec<T>, PaginationError<T>>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all_items = Vec::new();
    let mut cursor: Option<Cursor> = None;
    let mut page_count = 0;

    loop {
        page_count += 1;
        let requested = cursor.clone();

        let page = match fetch(cursor.take()).await {
            Ok(page) => page,
            Err(error) => {
                return Err(PaginationError {
                    items: all_items,
                    page: page_count,
                    error,
                });
            }
        };

        let item_count = page.items.len();
        all_items.extend(page.items);

        debug!(
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page"
        );

        match page.next {
            Some(next) if requested.as_deref() == Some(next.as_str()) => {
                return Err(PaginationError {
                    items: all_items,
                    page: page_count,
                    error: Error::Other(format!(
                        "provider returned cursor {next} for its own page"
                    )),
                });
            }
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!(
        total_pages = page_count,
        total_items = all_items.len(),
        "Completed paginated list"
    );

    Ok(all_items)
}
