//! The listings and queries the report is computed from.
//!
//! [`ChannelSource`] is everything the aggregation pipeline knows about where its data comes
//! from. [`YouTubeClient`] implements it on top of the Data and Analytics APIs; tests use an
//! in-memory channel instead.

use crate::youtube_api::YouTubeClient;
use crate::youtube_api::analytics::{DateRange, VideoViews};
use eyre::Context;
use std::future::Future;
use tokio_stream::{Stream, StreamExt};

/// A video uploaded to the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedVideo {
    pub video_id: String,
    pub title: String,
}

/// A playlist owned by the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSummary {
    pub playlist_id: String,
    pub title: String,
}

/// Read access to one channel's videos, playlists and view analytics.
///
/// Every listing is lazy and starts from its first page each time it is called. An error item
/// ends the listing; callers abort the run when they see one.
pub trait ChannelSource {
    /// Every video uploaded to the channel.
    fn uploads(&self) -> impl Stream<Item = eyre::Result<UploadedVideo>>;

    /// The channel's playlists, in the order the API lists them.
    fn playlists(&self) -> impl Stream<Item = eyre::Result<PlaylistSummary>>;

    /// The ids of the videos in a playlist, in playlist order.
    ///
    /// Playlists may contain videos that are not (or no longer) among the channel's uploads.
    fn playlist_members(&self, playlist_id: &str) -> impl Stream<Item = eyre::Result<String>>;

    /// Views and average view percentage over `range` for at most
    /// [`MAX_VIDEOS_PER_QUERY`](crate::youtube_api::analytics::MAX_VIDEOS_PER_QUERY) videos.
    ///
    /// Videos that were not watched in the period may be missing from the result, and the result
    /// may mention videos that were not asked for.
    fn video_views(
        &self,
        range: &DateRange,
        video_ids: &[&str],
    ) -> impl Future<Output = eyre::Result<Vec<VideoViews>>>;
}

impl ChannelSource for YouTubeClient {
    fn uploads(&self) -> impl Stream<Item = eyre::Result<UploadedVideo>> {
        async_stream::stream! {
            let uploads = match self.my_channel().await {
                Ok(channel) => channel.uploads_playlist_id().to_string(),
                Err(e) => {
                    yield Err(e.wrap_err("find uploads playlist"));
                    return;
                }
            };
            tracing::debug!(playlist_id = %uploads, "listing channel uploads");

            let mut items = std::pin::pin!(self.list_playlist_items(&uploads));
            while let Some(item) = items.next().await {
                match item.context("fetch uploaded video") {
                    Ok(item) => yield Ok(UploadedVideo {
                        video_id: item.content_details.video_id,
                        title: item.snippet.title,
                    }),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    }

    fn playlists(&self) -> impl Stream<Item = eyre::Result<PlaylistSummary>> {
        self.list_my_playlists().map(|playlist| -> eyre::Result<_> {
            let playlist = playlist?;
            Ok(PlaylistSummary {
                playlist_id: playlist.id,
                title: playlist.snippet.title,
            })
        })
    }

    fn playlist_members(&self, playlist_id: &str) -> impl Stream<Item = eyre::Result<String>> {
        // the listing may outlive the caller's borrow of the id
        let playlist_id = playlist_id.to_owned();
        async_stream::stream! {
            let mut items = std::pin::pin!(self.list_playlist_items(&playlist_id));
            while let Some(item) = items.next().await {
                yield item.map(|i| i.content_details.video_id);
            }
        }
    }

    async fn video_views(
        &self,
        range: &DateRange,
        video_ids: &[&str],
    ) -> eyre::Result<Vec<VideoViews>> {
        self.query_video_views(range, video_ids).await
    }
}
