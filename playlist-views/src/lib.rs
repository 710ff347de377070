//! Views per playlist for a YouTube channel.
//!
//! Reads every upload of the authenticated user's channel, attaches views and average view
//! percentage for a date range from YouTube Analytics, and credits each video's adjusted views
//! (`views * averageViewPercentage / 100`) to the first playlist that contains it. Videos in no
//! playlist are listed separately, most watched first.

use crate::oauth::{ClientSecretFile, OAuthManager};
use crate::youtube_api::client::{TimeBoundAccessToken, YouTubeClient};
use eyre::Context;
use oauth2::basic::BasicTokenResponse;
use std::sync::Arc;

pub mod attribution;
pub mod catalog;
pub mod metrics;
pub mod oauth;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod youtube_api;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::build_reports;
pub use report::Reports;
pub use source::ChannelSource;

const OAUTH_DONE: &str = include_str!("../oauth_success.html");

/// Produces an authenticated, validated API client.
///
/// `stored_token` is the JSON of a previously persisted token, or empty if there is none. A
/// stored token is refreshed right away; if that is not possible the user is sent through the
/// browser flow again. Persist [`YouTubeClient::token`] after the run to skip the browser next
/// time.
pub async fn setup_youtube_client(
    stored_token: &str,
    client_secret: ClientSecretFile,
) -> eyre::Result<YouTubeClient> {
    let oauth_manager = Arc::new(OAuthManager::new(client_secret, OAUTH_DONE));

    // ==============================================================================
    // Token Acquisition
    // ==============================================================================
    // Without a cached token, the only option is the browser flow. A cached token is
    // refreshed up front so that it is known to work before any listing starts.
    let token = if stored_token.trim().is_empty() {
        tracing::info!("no stored token, starting OAuth flow");
        let token = oauth_manager
            .authenticate()
            .await
            .context("authorize user to YouTube")?;
        TimeBoundAccessToken::new(token)
    } else {
        let token: BasicTokenResponse =
            serde_json::from_str(stored_token).context("parse stored YouTube access token")?;
        let mut token = TimeBoundAccessToken::expired(token);

        if token
            .refresh(&oauth_manager)
            .await
            .context("refresh token")?
        {
            tracing::debug!("successfully refreshed stored token");
            token
        } else {
            tracing::warn!("token refresh failed, getting new token via full OAuth");
            let token = oauth_manager
                .authenticate()
                .await
                .context("authorize user to YouTube")?;
            TimeBoundAccessToken::new(token)
        }
    };

    let client = YouTubeClient::new(token, oauth_manager, reqwest::Client::new());

    // ==============================================================================
    // Token Validation
    // ==============================================================================
    // A token that was just issued or refreshed and still fails is not something
    // another round of OAuth would fix (e.g., missing scopes or no channel access).
    if !client
        .validate_token()
        .await
        .context("validate YouTube token")?
    {
        eyre::bail!("freshly obtained YouTube token failed validation");
    }

    Ok(client)
}
