//! YouTube Analytics API v2 types.
//!
//! Only the `reports.query` shape used for per-video view metrics is modelled: the query is
//! issued with `dimensions=video` and `metrics=views,averageViewPercentage`, so every row is a
//! three-element array `[videoId, views, averageViewPercentage]`.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// Maximum number of rows (and thus of video ids in a `video==` filter) per `reports.query`.
pub const MAX_VIDEOS_PER_QUERY: usize = 200;

/// The metrics requested for each video, in column order.
pub const VIDEO_VIEW_METRICS: &str = "views,averageViewPercentage";

/// Response structure for the `reports.query` API call.
///
/// See: <https://developers.google.com/youtube/analytics/reference/reports/query>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoViewsReport {
    /// The value will be `youtubeAnalytics#resultTable`.
    pub kind: String,
    #[serde(rename = "columnHeaders", default)]
    pub column_headers: Vec<ColumnHeader>,
    /// The API omits `rows` when nothing matched the query.
    #[serde(default)]
    pub rows: Vec<VideoViews>,
}

/// Describes one column of a result table.
#[derive(Debug, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
    #[serde(rename = "columnType")]
    pub column_type: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
}

/// One analytics row: how often a single video was watched during the queried period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, u64, f64)", into = "(String, u64, f64)")]
pub struct VideoViews {
    pub video_id: String,
    pub views: u64,
    /// Average share of the video watched per view, in percent (0 to 100).
    pub average_view_percentage: f64,
}

impl From<(String, u64, f64)> for VideoViews {
    fn from((video_id, views, average_view_percentage): (String, u64, f64)) -> Self {
        Self {
            video_id,
            views,
            average_view_percentage,
        }
    }
}

impl From<VideoViews> for (String, u64, f64) {
    fn from(row: VideoViews) -> Self {
        (row.video_id, row.views, row.average_view_percentage)
    }
}

/// The inclusive range of days an analytics query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Parses a range from two `YYYY-MM-DD` dates.
    ///
    /// Fails if either date is malformed or if `end` is before `start`.
    pub fn parse(start: &str, end: &str) -> eyre::Result<Self> {
        let start: Date = start
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("invalid start date '{}': {}", start.trim(), e))?;
        let end: Date = end
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("invalid end date '{}': {}", end.trim(), e))?;
        Self::new(start, end)
    }

    pub fn new(start: Date, end: Date) -> eyre::Result<Self> {
        if end < start {
            eyre::bail!("end date {end} is before start date {start}");
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }
}
