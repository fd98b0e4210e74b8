//! Page enumeration
//!
//! A [`Pager`] is a cursor over a paginated listing: it says whether another
//! page is available and fetches it. [`collect_pages`] drains a pager into a
//! single ordered `Vec`, stopping at the first failed fetch.

use std::future::Future;

/// Cursor over a paginated listing
pub trait Pager {
    /// Record type carried by each page
    type Item;
    /// Error produced by a failed page fetch
    type Error;

    /// Whether another page can be fetched
    fn more(&self) -> bool;

    /// Fetch the next page
    fn next_page(&mut self) -> impl Future<Output = Result<Vec<Self::Item>, Self::Error>> + Send;
}

/// Fetch every remaining page and concatenate the records in order.
///
/// Pages are requested one at a time. The first failed fetch ends the loop and
/// its error is returned as-is; records gathered before it are dropped.
pub async fn collect_pages<P: Pager>(pager: &mut P) -> Result<Vec<P::Item>, P::Error> {
    let mut items = Vec::new();
    let mut pages = 0usize;

    while pager.more() {
        let page = pager.next_page().await?;
        pages += 1;
        tracing::debug!("Page {} returned {} records", pages, page.len());
        items.extend(page);
    }

    tracing::debug!("Collected {} records from {} pages", items.len(), pages);
    Ok(items)
}
