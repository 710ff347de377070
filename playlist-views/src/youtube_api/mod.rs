//! Client for the slice of the YouTube Data API v3 and YouTube Analytics API v2 that the
//! playlist views report needs.
//!
//! # Resources
//!
//! - [`channels::Channel`]: the authenticated user's channel. Its `uploads` related playlist
//!   lists every video the channel published.
//! - [`playlists::Playlist`] and [`playlists::PlaylistItem`]: the channel's playlists and the
//!   videos in each. The uploads listing is read through the same `playlistItems.list` call.
//! - [`analytics::VideoViews`]: one row of an Analytics `reports.query` with `dimensions=video`.
//!
//! All Data API list endpoints are paginated; [`YouTubeClient`] exposes them as
//! [`PagedStream`]s that fetch the next page only when the previous one has been consumed.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tokio_stream::StreamExt;
//! use youtube_playlist_views::youtube_api::YouTubeClient;
//!
//! # async fn example(client: YouTubeClient) -> eyre::Result<()> {
//! let mut playlists = std::pin::pin!(client.list_my_playlists());
//! while let Some(playlist) = playlists.next().await {
//!     let playlist = playlist?;
//!     println!("{} ({})", playlist.snippet.title, playlist.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod channels;
pub mod client;
pub mod playlists;
pub mod types;

pub use client::{TimeBoundAccessToken, YouTubeClient};
pub use types::{PageInfo, PagedStream};

pub use analytics::{DateRange, VideoViews};
pub use channels::{Channel, ChannelSnippet};
pub use playlists::{Playlist, PlaylistItem};
