//! The working set of channel videos the report is built from.

use crate::source::UploadedVideo;
use crate::youtube_api::analytics::VideoViews;
use eyre::Context;
use indexmap::IndexMap;
use tokio_stream::{Stream, StreamExt};

/// View metrics of one video over the report period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMetrics {
    pub views: u64,
    /// Average share of the video watched per view, in percent.
    pub average_view_percentage: f64,
    /// `views * average_view_percentage / 100`, i.e. the number of full watches the views add
    /// up to.
    pub adjusted_views: f64,
}

impl ViewMetrics {
    pub fn new(views: u64, average_view_percentage: f64) -> Self {
        Self {
            views,
            average_view_percentage,
            adjusted_views: views as f64 * average_view_percentage / 100.0,
        }
    }
}

impl From<&VideoViews> for ViewMetrics {
    fn from(row: &VideoViews) -> Self {
        Self::new(row.views, row.average_view_percentage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub title: String,
    /// `None` until analytics for the video have been merged in.
    ///
    /// Videos that nobody watched during the period never get metrics.
    pub metrics: Option<ViewMetrics>,
}

/// The channel's videos, keyed by video id, in the order the uploads listing produced them.
///
/// Videos leave the catalog once they have been credited to a playlist (see
/// [`Catalog::take_merged`]); whatever remains at the end are the videos no playlist claimed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    videos: IndexMap<String, VideoRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a video without metrics.
    ///
    /// Adding an id that is already present replaces its title in place and clears nothing
    /// else; the video keeps its original position.
    pub fn insert(&mut self, video_id: impl Into<String>, title: impl Into<String>) {
        let title = title.into();
        match self.videos.entry(video_id.into()) {
            indexmap::map::Entry::Occupied(mut entry) => {
                tracing::debug!(
                    video_id = %entry.key(),
                    title = %title,
                    "video listed twice, keeping the later title"
                );
                entry.get_mut().title = title;
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(VideoRecord {
                    title,
                    metrics: None,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn get(&self, video_id: &str) -> Option<&VideoRecord> {
        self.videos.get(video_id)
    }

    pub fn video_ids(&self) -> impl Iterator<Item = &str> {
        self.videos.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VideoRecord)> {
        self.videos.iter().map(|(id, video)| (id.as_str(), video))
    }

    /// Attaches analytics to the video `row` is about.
    ///
    /// Returns `false`, leaving the catalog untouched, if the video is not in the catalog.
    pub fn record_metrics(&mut self, row: &VideoViews) -> bool {
        match self.videos.get_mut(&row.video_id) {
            Some(video) => {
                video.metrics = Some(ViewMetrics::from(row));
                true
            }
            None => false,
        }
    }

    /// Removes a video that has metrics and returns them.
    ///
    /// Videos without metrics stay in the catalog, and unknown ids are not an error. Once taken,
    /// a video is gone for good, so no video can be taken twice.
    pub fn take_merged(&mut self, video_id: &str) -> Option<(String, ViewMetrics)> {
        let metrics = self.videos.get(video_id)?.metrics?;
        let (_, video) = self.videos.shift_remove_entry(video_id)?;
        Some((video.title, metrics))
    }

    /// Consumes the catalog, yielding only the videos that have metrics.
    pub fn into_merged(self) -> impl Iterator<Item = (String, String, ViewMetrics)> {
        self.videos
            .into_iter()
            .filter_map(|(id, video)| Some((id, video.title, video.metrics?)))
    }
}

/// Builds the catalog from the channel's uploads listing.
pub async fn build_catalog<S>(uploads: S) -> eyre::Result<Catalog>
where
    S: Stream<Item = eyre::Result<UploadedVideo>>,
{
    let mut uploads = std::pin::pin!(uploads);
    let mut catalog = Catalog::new();
    while let Some(video) = uploads.next().await {
        let video = video.context("fetch channel uploads")?;
        catalog.insert(video.video_id, video.title);
    }
    tracing::info!(videos = catalog.len(), "collected channel uploads");
    Ok(catalog)
}
