//! YouTube Channels API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `channels.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse {
    /// Identifies the API resource's type.
    ///
    /// The value will be `youtube#channelListResponse`.
    pub kind: String,
    /// A list of channels that match the request criteria.
    ///
    /// The API leaves this out entirely when the account has no channel.
    #[serde(default)]
    pub items: VecDeque<Channel>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `channel` resource contains information about a YouTube channel.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Channel {
    /// The ID that YouTube uses to uniquely identify the channel.
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: ChannelContentDetails,
}

impl Channel {
    /// The ID of the playlist holding every video uploaded to this channel.
    pub fn uploads_playlist_id(&self) -> &str {
        &self.content_details.related_playlists.uploads
    }
}

/// Basic details about the channel.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelSnippet {
    /// The channel's title.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The date and time that the channel was created.
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
}

/// See: <https://developers.google.com/youtube/v3/docs/channels#contentDetails>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    pub related_playlists: RelatedPlaylists,
}

/// Playlists that YouTube maintains for every channel.
#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedPlaylists {
    /// The ID of the playlist that contains the channel's uploaded videos.
    ///
    /// This is the playlist `playlistItems.list` is pointed at to enumerate the channel's videos.
    pub uploads: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<String>,
}
