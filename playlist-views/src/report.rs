//! The two reports and their CSV rendering.

use crate::attribution::Attribution;
use crate::catalog::Catalog;
use eyre::Context;
use serde::Serialize;

/// Where the per-video report is written.
pub const VIDEO_REPORT_PATH: &str = "individual_video_data.csv";
/// Where the per-playlist report is written.
pub const PLAYLIST_REPORT_PATH: &str = "playlist_video_data.csv";

const VIDEO_REPORT_HEADER: [&str; 4] = ["title", "views", "averageViewPercentage", "adjustedViews"];
const PLAYLIST_REPORT_HEADER: [&str; 2] = ["title", "adjustedViews"];

/// A row of the per-video report.
///
/// The numbers are blank for videos without analytics for the period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRow {
    pub title: String,
    pub views: Option<u64>,
    pub average_view_percentage: Option<f64>,
    pub adjusted_views: Option<f64>,
}

/// A row of the per-playlist report.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupedRow {
    Playlist { title: String, adjusted_views: f64 },
    /// Separates the playlists from the videos that are in none of them.
    Separator,
    Video { title: String, adjusted_views: f64 },
}

impl GroupedRow {
    fn fields(&self) -> (&str, Option<f64>) {
        match self {
            Self::Playlist {
                title,
                adjusted_views,
            }
            | Self::Video {
                title,
                adjusted_views,
            } => (title.as_str(), Some(*adjusted_views)),
            Self::Separator => ("", None),
        }
    }
}

/// Both reports, fully assembled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reports {
    /// Every catalog video, in catalog order.
    pub videos: Vec<VideoRow>,
    /// Playlists in listing order, a separator, then unclaimed videos by adjusted views.
    pub playlists: Vec<GroupedRow>,
}

impl Reports {
    /// Builds the reports from the catalog as it was before attribution, and the attribution.
    pub fn assemble(catalog: &Catalog, attribution: &Attribution) -> Self {
        Self {
            videos: video_rows(catalog),
            playlists: grouped_rows(attribution),
        }
    }

    pub fn videos_csv(&self) -> eyre::Result<Vec<u8>> {
        write_csv(&VIDEO_REPORT_HEADER, self.videos.iter())
    }

    pub fn playlists_csv(&self) -> eyre::Result<Vec<u8>> {
        write_csv(
            &PLAYLIST_REPORT_HEADER,
            self.playlists.iter().map(GroupedRow::fields),
        )
    }
}

/// One row per video, metrics or not.
pub fn video_rows(catalog: &Catalog) -> Vec<VideoRow> {
    catalog
        .iter()
        .map(|(_, video)| VideoRow {
            title: video.title.clone(),
            views: video.metrics.map(|m| m.views),
            average_view_percentage: video.metrics.map(|m| m.average_view_percentage),
            adjusted_views: video.metrics.map(|m| m.adjusted_views),
        })
        .collect()
}

pub fn grouped_rows(attribution: &Attribution) -> Vec<GroupedRow> {
    let playlists = attribution.playlists.iter().map(|p| GroupedRow::Playlist {
        title: p.title.clone(),
        adjusted_views: p.adjusted_views,
    });
    let leftovers = attribution.leftovers.iter().map(|v| GroupedRow::Video {
        title: v.title.clone(),
        adjusted_views: v.metrics.adjusted_views,
    });
    playlists
        .chain(std::iter::once(GroupedRow::Separator))
        .chain(leftovers)
        .collect()
}

/// Renders a header and rows as CSV, in memory.
///
/// The header is written even when there are no rows.
fn write_csv<R: Serialize>(
    header: &[&str],
    rows: impl Iterator<Item = R>,
) -> eyre::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header).context("write CSV header")?;
    for row in rows {
        writer.serialize(row).context("write CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|e| eyre::eyre!("flush CSV output: {}", e.error()))
}
