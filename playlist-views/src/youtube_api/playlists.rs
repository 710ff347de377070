//! YouTube Playlists and PlaylistItems API types.

use crate::youtube_api::types::PageInfo;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `playlists.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistListResponse {
    /// The value will be `youtube#playlistListResponse`.
    pub kind: String,
    #[serde(default)]
    pub items: VecDeque<Playlist>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `playlist` resource represents a YouTube playlist.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Playlist {
    /// The ID that YouTube uses to uniquely identify the playlist.
    pub id: String,
    pub snippet: PlaylistSnippet,
}

/// See: <https://developers.google.com/youtube/v3/docs/playlists#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    /// The playlist's title.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response structure for the `playlistItems.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemListResponse {
    /// The value will be `youtube#playlistItemListResponse`.
    pub kind: String,
    #[serde(default)]
    pub items: VecDeque<PlaylistItem>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `playlistItem` resource identifies a video that is included in a playlist.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub snippet: PlaylistItemSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistItemContentDetails,
}

impl PlaylistItem {
    pub fn video_id(&self) -> &str {
        &self.content_details.video_id
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemSnippet {
    /// The title of the video the item refers to.
    pub title: String,
    /// The order in which the item appears in the playlist, starting at 0.
    pub position: u32,
}

/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#contentDetails>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemContentDetails {
    /// The ID that YouTube uses to uniquely identify the video.
    #[serde(rename = "videoId")]
    pub video_id: String,
}
