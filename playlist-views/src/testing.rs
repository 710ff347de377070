//! An in-memory channel for exercising the pipeline.
//!
//! Listings are served through [`PagedStream`] with numeric continuation tokens, so tests go
//! through the same paging path as the real client.

use crate::source::{ChannelSource, PlaylistSummary, UploadedVideo};
use crate::youtube_api::analytics::{DateRange, VideoViews};
use crate::youtube_api::types::PagedStream;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio_stream::Stream;

#[derive(Debug, Default)]
pub(crate) struct FakeChannel {
    pub uploads: Vec<Vec<UploadedVideo>>,
    pub playlists: Vec<Vec<PlaylistSummary>>,
    pub members: HashMap<String, Vec<Vec<String>>>,
    /// Rows the analytics query returns for the ids it is asked about.
    pub views: Vec<VideoViews>,
    /// Rows the analytics query returns no matter what it is asked about.
    pub stray_views: Vec<VideoViews>,
    /// Every analytics query issued, as the list of requested ids.
    pub queries: Mutex<Vec<Vec<String>>>,
    pub fail_uploads_at_page: Option<usize>,
    pub fail_members_of: Option<String>,
    pub fail_views: bool,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `videos` as the channel's uploads, `per_page` at a time.
    pub fn with_uploads(mut self, videos: &[(&str, &str)], per_page: usize) -> Self {
        let videos = videos
            .iter()
            .map(|&(id, title)| UploadedVideo {
                video_id: id.to_string(),
                title: title.to_string(),
            })
            .collect();
        self.uploads = paginate(videos, per_page);
        self
    }

    /// Adds a playlist (listed after the ones added before it) with the given members.
    pub fn with_playlist(
        mut self,
        id: &str,
        title: &str,
        members: &[&str],
        per_page: usize,
    ) -> Self {
        let summary = PlaylistSummary {
            playlist_id: id.to_string(),
            title: title.to_string(),
        };
        // one playlist per listing page, so the playlist listing is paged too
        self.playlists.push(vec![summary]);
        self.members.insert(
            id.to_string(),
            paginate(members.iter().map(|m| m.to_string()).collect(), per_page),
        );
        self
    }

    pub fn with_views(mut self, video_id: &str, views: u64, average_view_percentage: f64) -> Self {
        self.views.push(VideoViews {
            video_id: video_id.to_string(),
            views,
            average_view_percentage,
        });
        self
    }

    pub fn queries(&self) -> Vec<Vec<String>> {
        self.queries.lock().unwrap().clone()
    }
}

pub(crate) fn paginate<T>(items: Vec<T>, per_page: usize) -> Vec<Vec<T>> {
    let mut pages = vec![Vec::new()];
    for item in items {
        if pages.last().is_some_and(|p| p.len() == per_page) {
            pages.push(Vec::new());
        }
        pages.last_mut().expect("never empty").push(item);
    }
    pages
}

fn serve<T>(
    pages: &[Vec<T>],
    fail_at_page: Option<usize>,
) -> impl Stream<Item = eyre::Result<T>> + '_
where
    T: Clone + Send + Sync + Unpin,
{
    PagedStream::new(move |token: Option<String>| {
        let index = token.map_or(0, |t| t.parse::<usize>().expect("tokens are page indices"));
        let page = if fail_at_page == Some(index) {
            Err(eyre::eyre!("HTTP 503 while fetching page {index}"))
        } else {
            let items: VecDeque<T> = pages.get(index).cloned().unwrap_or_default().into();
            let next = (index + 1 < pages.len()).then(|| (index + 1).to_string());
            Ok((items, next))
        };
        std::future::ready(page)
    })
}

impl ChannelSource for FakeChannel {
    fn uploads(&self) -> impl Stream<Item = eyre::Result<UploadedVideo>> {
        serve(&self.uploads, self.fail_uploads_at_page)
    }

    fn playlists(&self) -> impl Stream<Item = eyre::Result<PlaylistSummary>> {
        serve(&self.playlists, None)
    }

    fn playlist_members(&self, playlist_id: &str) -> impl Stream<Item = eyre::Result<String>> {
        let pages = self.members.get(playlist_id).map_or(&[][..], Vec::as_slice);
        // fail on the last page, after the earlier ones have been served
        let fail = (self.fail_members_of.as_deref() == Some(playlist_id))
            .then_some(pages.len().saturating_sub(1));
        serve(pages, fail)
    }

    async fn video_views(
        &self,
        _range: &DateRange,
        video_ids: &[&str],
    ) -> eyre::Result<Vec<VideoViews>> {
        self.queries
            .lock()
            .unwrap()
            .push(video_ids.iter().map(|id| id.to_string()).collect());
        if self.fail_views {
            eyre::bail!("YouTube API GET request failed with status 403 Forbidden: quotaExceeded");
        }
        Ok(self
            .views
            .iter()
            .filter(|row| video_ids.contains(&row.video_id.as_str()))
            .chain(&self.stray_views)
            .cloned()
            .collect())
    }
}

pub(crate) fn any_range() -> DateRange {
    DateRange::parse("2024-01-01", "2024-12-31").expect("valid range")
}
