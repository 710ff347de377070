//! Authenticated client for the YouTube Data and Analytics APIs.

use crate::oauth::OAuthManager;
use crate::youtube_api::{
    analytics::{DateRange, MAX_VIDEOS_PER_QUERY, VIDEO_VIEW_METRICS, VideoViews, VideoViewsReport},
    channels::{Channel, ChannelListResponse},
    playlists::{Playlist, PlaylistItem, PlaylistItemListResponse, PlaylistListResponse},
    types::PagedStream,
};
use eyre::Context;
use http::Method;
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

const DATA_API: &str = "https://www.googleapis.com/youtube/v3";
const ANALYTICS_API: &str = "https://youtubeanalytics.googleapis.com/v2";

/// Largest page the Data API list endpoints hand out.
const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the access token should be treated as expired (includes a safety buffer).
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token loaded from storage, forcing a refresh before first use.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Wraps a token that was just issued.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    /// Refreshes this token using the provided OAuth manager, preserving the refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token was successfully refreshed
    /// * `Ok(false)` - Refresh failed (invalid grant, no refresh token, etc.)
    /// * `Err(_)` - Network or other error occurred
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        let Some(new_token) = oauth_manager
            .refresh_token(self.token.clone())
            .await
            .context("refresh OAuth token")?
        else {
            return Ok(false);
        };

        let old_token = std::mem::replace(&mut self.token, new_token);
        // Google only hands out a refresh token on the initial exchange.
        if self.token.refresh_token().is_none() {
            tracing::trace!("new token lacks refresh token, preserving original");
            self.token
                .set_refresh_token(old_token.refresh_token().cloned());
        }
        self.expires_at = Self::calculate_token_expiry(&self.token);
        Ok(true)
    }

    /// `expires_in` minus a 5 minute buffer, or 55 minutes if the server did not say.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => now + expires_in.saturating_sub(Duration::from_secs(300)),
            None => now + Duration::from_secs(3300),
        }
    }
}

/// Client for the parts of the YouTube Data API v3 and YouTube Analytics API v2 that the
/// playlist views report reads.
///
/// Access tokens are refreshed automatically before a request is sent if they are (about to
/// be) expired.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    oauth_manager: Arc<OAuthManager>,
    client: reqwest::Client,
}

impl YouTubeClient {
    pub fn new(
        token: TimeBoundAccessToken,
        oauth_manager: Arc<OAuthManager>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager,
            client,
        }
    }

    /// Returns a clone of the current OAuth2 token, for persisting it between runs.
    pub async fn token(&self) -> BasicTokenResponse {
        self.token.lock().await.token.clone()
    }

    /// Gets a guaranteed-fresh access token, refreshing if necessary.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;
        if SystemTime::now() >= token.expires_at {
            tracing::debug!("access token expired, attempting refresh");
            if !token.refresh(&self.oauth_manager).await? {
                tracing::error!("access token refresh failed, client is unusable");
                return Err(eyre::eyre!("Unable to refresh expired access token"));
            }
            tracing::debug!("access token successfully refreshed");
        }
        Ok(token.token.access_token().secret().to_string())
    }

    /// Sends an authenticated request and fails on any non-success status.
    ///
    /// The body text of a failed response is included in the error since both APIs explain
    /// quota and permission problems there.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: &[(&str, &str)],
    ) -> eyre::Result<reqwest::Response> {
        let access_token = self.fresh_access_token().await?;

        let response = self
            .client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params)
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(eyre::eyre!(
                "YouTube API {} request failed with status {}: {}",
                method,
                status_code,
                error_text
            ));
        }

        Ok(response)
    }

    /// Checks that the token works (and has a usable scope) with a minimal `channels.list` call.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token is valid and can be used for API calls
    /// * `Ok(false)` - Token is invalid or refresh failed
    #[instrument(skip(self), ret)]
    pub async fn validate_token(&self) -> eyre::Result<bool> {
        match self.list_channels_internal(1, None).await {
            Ok(_) => {
                tracing::debug!("YouTube API token validation successful");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("YouTube API token validation failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Returns a paginated stream of the channels owned by the authenticated user.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub fn list_my_channels(&self) -> impl Stream<Item = eyre::Result<Channel>> + use<'_> {
        PagedStream::new(move |page_token| async move {
            let response = self
                .list_channels_internal(MAX_PAGE_SIZE, page_token)
                .await?;
            Ok((response.items, response.next_page_token))
        })
    }

    /// The authenticated user's channel.
    ///
    /// Accounts that manage several channels get the first one back; the report covers a single
    /// channel.
    #[instrument(skip(self))]
    pub async fn my_channel(&self) -> eyre::Result<Channel> {
        let mut channels = std::pin::pin!(self.list_my_channels());
        let channel = channels
            .next()
            .await
            .ok_or_else(|| eyre::eyre!("authenticated account has no YouTube channel"))?
            .context("fetch channel")?;
        if let Some(Ok(other)) = channels.next().await {
            tracing::warn!(
                channel_id = %channel.id,
                ignored = %other.id,
                "account manages more than one channel, only reporting on the first"
            );
        }
        tracing::info!(channel_id = %channel.id, title = %channel.snippet.title, "using channel");
        Ok(channel)
    }

    /// Returns a paginated stream of the authenticated user's playlists.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlists/list>
    #[instrument(skip(self))]
    pub fn list_my_playlists(&self) -> impl Stream<Item = eyre::Result<Playlist>> + use<'_> {
        PagedStream::new(move |page_token| async move {
            let response = self
                .list_playlists_internal(MAX_PAGE_SIZE, page_token)
                .await?;
            Ok((response.items, response.next_page_token))
        })
    }

    /// Returns a paginated stream of the items in a playlist, in playlist order.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlistItems/list>
    #[instrument(skip(self))]
    pub fn list_playlist_items<'a>(
        &'a self,
        playlist_id: &'a str,
    ) -> impl Stream<Item = eyre::Result<PlaylistItem>> + use<'a> {
        PagedStream::new(move |page_token| async move {
            let response = self
                .list_playlist_items_internal(playlist_id, MAX_PAGE_SIZE, page_token)
                .await?;
            Ok((response.items, response.next_page_token))
        })
    }

    /// Queries views and average view percentage of the given videos over `range`.
    ///
    /// Videos without any views in the period are left out of the result by the API.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/analytics/reference/reports/query>
    #[instrument(skip(self, video_ids), fields(videos = video_ids.len()))]
    pub async fn query_video_views(
        &self,
        range: &DateRange,
        video_ids: &[&str],
    ) -> eyre::Result<Vec<VideoViews>> {
        if video_ids.len() > MAX_VIDEOS_PER_QUERY {
            eyre::bail!(
                "asked for {} videos in one analytics query, at most {} are supported",
                video_ids.len(),
                MAX_VIDEOS_PER_QUERY
            );
        }

        let url = format!("{ANALYTICS_API}/reports");
        let start = range.start().to_string();
        let end = range.end().to_string();
        let filters = format!("video=={}", video_ids.join(","));
        let max_results = MAX_VIDEOS_PER_QUERY.to_string();
        let query_params = [
            ("ids", "channel==MINE"),
            ("startDate", start.as_str()),
            ("endDate", end.as_str()),
            ("metrics", VIDEO_VIEW_METRICS),
            ("dimensions", "video"),
            ("filters", filters.as_str()),
            ("maxResults", max_results.as_str()),
            ("sort", "-views"),
        ];

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let report: VideoViewsReport = response
            .json()
            .await
            .context("parse YouTube Analytics response as JSON")?;

        tracing::debug!(
            requested = video_ids.len(),
            returned_rows = report.rows.len(),
            "fetched video views"
        );

        Ok(report.rows)
    }

    async fn list_channels_internal(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> eyre::Result<ChannelListResponse> {
        let url = format!("{DATA_API}/channels");
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "id,snippet,contentDetails"),
            ("mine", "true"),
            ("maxResults", max_results_string.as_str()),
        ];
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let channels: ChannelListResponse = response
            .json()
            .await
            .context("parse YouTube channels API response as JSON")?;

        tracing::debug!(
            total_results = channels.page_info.total_results,
            returned_items = channels.items.len(),
            "fetched channels"
        );

        Ok(channels)
    }

    async fn list_playlists_internal(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> eyre::Result<PlaylistListResponse> {
        let url = format!("{DATA_API}/playlists");
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "id,snippet"),
            ("mine", "true"),
            ("maxResults", max_results_string.as_str()),
        ];
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let playlists: PlaylistListResponse = response
            .json()
            .await
            .context("parse YouTube playlists API response as JSON")?;

        tracing::debug!(
            total_results = playlists.page_info.total_results,
            returned_items = playlists.items.len(),
            "fetched playlists"
        );

        Ok(playlists)
    }

    async fn list_playlist_items_internal(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> eyre::Result<PlaylistItemListResponse> {
        let url = format!("{DATA_API}/playlistItems");
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results_string.as_str()),
        ];
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await
            .with_context(|| format!("list items of playlist {playlist_id}"))?;

        let items: PlaylistItemListResponse = response
            .json()
            .await
            .context("parse YouTube playlistItems API response as JSON")?;

        tracing::debug!(
            playlist_id,
            total_results = items.page_info.total_results,
            returned_items = items.items.len(),
            "fetched playlist items"
        );

        Ok(items)
    }
}
