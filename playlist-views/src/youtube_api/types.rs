//! Shared types and the pagination machinery used by every list endpoint.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of results: the items it carried and the token for the page after it, if any.
pub type Page<T> = (VecDeque<T>, Option<String>);

type PendingPage<'a, F, T> = Pin<Box<dyn Future<Output = eyre::Result<(F, Page<T>)>> + 'a + Send>>;

/// A lazily paginated listing.
///
/// The stream is driven by a page fetcher, `Fn(Option<String>) -> Future<Output = Page<T>>`,
/// which is first called with `None` and then with each continuation token the previous page
/// returned. Items are yielded one by one and the next page is only requested once the current
/// one has been drained. The listing ends after a page without a continuation token, or right
/// after the first error, which is yielded as the final item.
///
/// Every call that builds a `PagedStream` starts over from the first page.
pub struct PagedStream<'a, T, F> {
    /// Items of the most recently fetched page that have not been yielded yet.
    buffered: VecDeque<T>,
    /// The in-flight page request, if any.
    pending: Option<PendingPage<'a, F, T>>,
    /// Number of pages received so far.
    pages: usize,
    exhausted: bool,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Creates a listing whose first page is requested on the first poll.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
    {
        let first_page = async move {
            let page = fetcher(None).await?;
            Ok((fetcher, page))
        };
        Self {
            buffered: VecDeque::new(),
            pending: Some(Box::pin(first_page)),
            pages: 0,
            exhausted: false,
        }
    }

    /// How many pages have been fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }
}

impl<T: Unpin, F> Unpin for PagedStream<'_, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
            if self.exhausted {
                return Poll::Ready(None);
            }

            let Some(pending) = self.pending.as_mut() else {
                self.exhausted = true;
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => {
                    self.pending = None;
                    self.exhausted = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Ok((fetcher, (items, next_page_token)))) => {
                    self.pages += 1;
                    self.buffered.extend(items);
                    match next_page_token {
                        // queued, but not polled until the buffered items are gone
                        Some(token) => {
                            self.pending = Some(Box::pin(async move {
                                let page = fetcher(Some(token)).await?;
                                Ok((fetcher, page))
                            }));
                        }
                        None => {
                            self.pending = None;
                            self.exhausted = true;
                        }
                    }
                }
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}
