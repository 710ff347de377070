use eyre::Context;
use std::io::IsTerminal;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_playlist_views::oauth::ClientSecretFile;
use youtube_playlist_views::report::{PLAYLIST_REPORT_PATH, VIDEO_REPORT_PATH};
use youtube_playlist_views::youtube_api::DateRange;
use youtube_playlist_views::{build_reports, setup_youtube_client};

const CLIENT_SECRET_PATH: &str = "client_secret.json";
const TOKEN_PATH: &str = "tokens.json";

async fn prompt(input: &mut Lines<BufReader<Stdin>>, question: &str) -> eyre::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(question.as_bytes())
        .await
        .context("write prompt")?;
    stdout.flush().await.context("flush prompt")?;
    input
        .next_line()
        .await
        .context("read answer")?
        .ok_or_else(|| eyre::eyre!("stdin closed before an answer to '{}'", question.trim()))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    // dates are checked before anything touches the network
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let start = prompt(&mut input, "Start date (YYYY-MM-DD format): ").await?;
    let end = prompt(&mut input, "End date (YYYY-MM-DD format): ").await?;
    let range = DateRange::parse(&start, &end)?;

    let client_secret = ClientSecretFile::load(CLIENT_SECRET_PATH).await?;
    let mut stored_token = String::new();
    if tokio::fs::try_exists(TOKEN_PATH)
        .await
        .context("look for stored token")?
    {
        stored_token = tokio::fs::read_to_string(TOKEN_PATH)
            .await
            .context("read stored token")?;
    }
    let yt = setup_youtube_client(&stored_token, client_secret).await?;

    // persist right away so a failed run does not cost another browser round trip
    let token = serde_json::to_string(&yt.token().await).context("serialize OAuth token")?;
    tokio::fs::write(TOKEN_PATH, &token)
        .await
        .context("store OAuth token")?;

    let reports = build_reports(&yt, &range).await?;

    // render both before writing either, so a failure leaves no half-written report behind
    let videos = reports.videos_csv()?;
    let playlists = reports.playlists_csv()?;
    tokio::fs::write(VIDEO_REPORT_PATH, videos)
        .await
        .with_context(|| format!("write {VIDEO_REPORT_PATH}"))?;
    tokio::fs::write(PLAYLIST_REPORT_PATH, playlists)
        .await
        .with_context(|| format!("write {PLAYLIST_REPORT_PATH}"))?;

    // the client may have refreshed the token during a long run
    let token = serde_json::to_string(&yt.token().await).context("serialize OAuth token")?;
    tokio::fs::write(TOKEN_PATH, &token)
        .await
        .context("store OAuth token")?;

    tracing::info!(
        videos = reports.videos.len(),
        video_report = VIDEO_REPORT_PATH,
        playlist_report = PLAYLIST_REPORT_PATH,
        "wrote reports"
    );
    Ok(())
}
