//! One run of the report, from listings to assembled rows.

use crate::attribution::attribute_playlists;
use crate::catalog::build_catalog;
use crate::metrics::merge_metrics;
use crate::report::Reports;
use crate::source::ChannelSource;
use crate::youtube_api::analytics::DateRange;
use tracing::instrument;

/// Builds both reports for the channel behind `source` over `range`.
///
/// The per-video rows are taken after analytics have been merged and before playlist
/// attribution drains the catalog. Any listing or query failure aborts the run; nothing is
/// returned for a partial run.
#[instrument(skip(source))]
pub async fn build_reports<S>(source: &S, range: &DateRange) -> eyre::Result<Reports>
where
    S: ChannelSource,
{
    let mut catalog = build_catalog(source.uploads()).await?;
    merge_metrics(source, &mut catalog, range).await?;

    let snapshot = catalog.clone();
    let attribution = attribute_playlists(source, catalog).await?;

    Ok(Reports::assemble(&snapshot, &attribution))
}
