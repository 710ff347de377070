//! OAuth 2.0 for the YouTube Data and Analytics APIs.
//!
//! The report runs as an installed application: the user authorizes it once in the browser,
//! the redirect is caught by a throwaway local HTTP server, and the resulting refresh token is
//! cached so later runs do not need the browser.

use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope,
    TokenUrl,
};
use oauth2::{ClientSecret, RevocationUrl, TokenResponse, reqwest};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Used for both the initial code exchange and token refresh.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const REVOCATION_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Read access to the channel's videos and playlists, and to its analytics.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/yt-analytics.readonly",
];

/// The OAuth client file downloaded from the Google Cloud console.
///
/// Desktop clients put their credentials under `installed`, web clients under `web`.
#[derive(Debug, Deserialize)]
pub struct ClientSecretFile {
    #[serde(alias = "web")]
    installed: ClientCredentials,
}

#[derive(Debug, Deserialize)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientSecretFile {
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        serde_json::from_str(json).context("parse OAuth client secret file")
    }

    pub async fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read OAuth client secret file {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Runs the OAuth flows for one OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: String,
    client_secret: String,
    oauth_done_html: &'static str,
}

impl OAuthManager {
    /// Creates a new OAuth manager.
    ///
    /// `oauth_done_html` is shown in the browser once the authorization callback arrives.
    pub fn new(secret: ClientSecretFile, oauth_done_html: &'static str) -> Self {
        Self {
            client_id: secret.installed.client_id,
            client_secret: secret.installed.client_secret,
            oauth_done_html,
        }
    }

    /// Sends the user through the authorization-code flow (with PKCE) and returns a new token.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded OAuth endpoint URLs are malformed.
    pub async fn authenticate(&self) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_endpoint =
            AuthUrl::new(AUTH_URL.to_string()).expect("Invalid authorization endpoint URL");
        let token_endpoint =
            TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL");
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(auth_endpoint)
            .set_token_uri(token_endpoint)
            .set_redirect_uri(redirect_url)
            .set_revocation_url(
                RevocationUrl::new(REVOCATION_URL.to_string())
                    .expect("Invalid revocation endpoint URL"),
            );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // the flow runs exactly once, so the CSRF token is never reused
            .authorize_url(move || csrf.clone())
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        // printed rather than logged so the link shows up whatever RUST_LOG says
        eprintln!(
            "Opening your browser to authorize access to YouTube. \
             If it does not open, visit:\n{auth_url}"
        );
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            tracing::warn!(error = %e, "could not open browser, waiting for manual authorization");
        }
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let token = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&Self::http_client()?)
            .await
            .context("exchange authorization code with access token")?;

        Ok(token)
    }

    /// Exchanges the refresh token in `token` for a new access token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - Refresh succeeded
    /// * `Ok(None)` - No refresh token, or Google no longer accepts it; re-run
    ///   [`Self::authenticate`]
    /// * `Err(_)` - Network or other error occurred during refresh attempt
    pub async fn refresh_token(
        &self,
        token: BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");

        let token_endpoint =
            TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL");
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(token_endpoint);

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&Self::http_client()?)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    fn http_client() -> eyre::Result<reqwest::Client> {
        reqwest::ClientBuilder::new()
            // token endpoints never redirect, and following one would be an SSRF vector
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")
    }

    /// Starts a one-shot HTTP server on localhost that receives the authorization callback.
    ///
    /// Returns the redirect URL to register with the flow and a future that resolves to the
    /// authorization code once the browser has been redirected back with a matching `state`.
    async fn setup_redirect(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind to localhost")?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let oauth_done = self.oauth_done_html;
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let mut presented_state = None;
                        let mut presented_code = None;
                        for (k, v) in
                            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                        {
                            match &*k {
                                "state" => presented_state = Some(v),
                                "code" => presented_code = Some(v),
                                _ => {}
                            }
                        }
                        if presented_state.as_deref() != Some(csrf.secret().as_str()) {
                            return Err("invalid csrf token");
                        }
                        let Some(code) = presented_code else {
                            return Err("no authorization code found");
                        };
                        got.send(AuthorizationCode::new(code.into_owned()))
                            .await
                            .expect("channel won't be closed until server exit");
                        Ok(Response::new(Full::<Bytes>::from(oauth_done)))
                    }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exit prematurely");
                        }
                    }
                    code = gotten.recv() => {
                        serve.as_mut().graceful_shutdown();
                        let code = code.expect("channel won't be closed until service_fn is dropped");
                        Ok(code)
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}
