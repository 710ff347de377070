//! Merges per-video analytics into the catalog.

use crate::catalog::Catalog;
use crate::source::ChannelSource;
use crate::youtube_api::analytics::{DateRange, MAX_VIDEOS_PER_QUERY};
use eyre::Context;

/// Queries analytics for every video in `catalog` and attaches the results.
///
/// Ids go out in batches of [`MAX_VIDEOS_PER_QUERY`], one query per batch, in catalog order.
/// Rows about videos that are not in the catalog are ignored. Videos the analytics left out keep
/// `metrics: None`.
pub async fn merge_metrics<S>(
    source: &S,
    catalog: &mut Catalog,
    range: &DateRange,
) -> eyre::Result<()>
where
    S: ChannelSource,
{
    let ids: Vec<String> = catalog.video_ids().map(str::to_owned).collect();
    let mut merged = 0;
    let mut unknown = 0;

    for (batch_number, batch) in ids.chunks(MAX_VIDEOS_PER_QUERY).enumerate() {
        let batch: Vec<&str> = batch.iter().map(String::as_str).collect();
        let rows = source
            .video_views(range, &batch)
            .await
            .with_context(|| format!("query views for video batch {batch_number}"))?;

        for row in &rows {
            if catalog.record_metrics(row) {
                merged += 1;
            } else {
                unknown += 1;
                tracing::debug!(
                    video_id = %row.video_id,
                    "analytics mention a video that is not in the catalog"
                );
            }
        }
    }

    let without_metrics = catalog.iter().filter(|(_, v)| v.metrics.is_none()).count();
    tracing::info!(
        videos = catalog.len(),
        merged,
        unknown,
        without_metrics,
        "merged video analytics"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ViewMetrics;
    use crate::testing::{FakeChannel, any_range};
    use crate::youtube_api::analytics::VideoViews;
    use pretty_assertions::assert_eq;

    fn catalog_of(ids: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        for id in ids {
            catalog.insert(*id, format!("title of {id}"));
        }
        catalog
    }

    #[tokio::test]
    async fn merges_rows_into_matching_videos() {
        let channel = FakeChannel::new()
            .with_views("v1", 100, 50.0)
            .with_views("v2", 10, 10.0)
            .with_views("v3", 999, 0.0);
        let mut catalog = catalog_of(&["v1", "v2", "v3", "v4"]);

        merge_metrics(&channel, &mut catalog, &any_range()).await.unwrap();

        let metrics = |id: &str| catalog.get(id).unwrap().metrics;
        assert_eq!(metrics("v1"), Some(ViewMetrics::new(100, 50.0)));
        assert_eq!(metrics("v1").unwrap().adjusted_views, 50.0);
        assert_eq!(metrics("v2").unwrap().adjusted_views, 1.0);
        // zero percent is a real measurement, not missing data
        assert_eq!(metrics("v3").unwrap().adjusted_views, 0.0);
        assert_eq!(metrics("v4"), None);
    }

    #[tokio::test]
    async fn rows_for_unknown_videos_are_ignored() {
        let mut channel = FakeChannel::new().with_views("v1", 7, 100.0);
        channel.stray_views.push(VideoViews {
            video_id: "deleted".into(),
            views: 42,
            average_view_percentage: 12.0,
        });
        let mut catalog = catalog_of(&["v1"]);

        merge_metrics(&channel, &mut catalog, &any_range()).await.unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("deleted").is_none());
        assert_eq!(catalog.get("v1").unwrap().metrics, Some(ViewMetrics::new(7, 100.0)));
    }

    #[tokio::test]
    async fn queries_in_batches_of_two_hundred() {
        let ids: Vec<String> = (0..450).map(|i| format!("video{i:03}")).collect();
        let mut catalog = Catalog::new();
        for id in &ids {
            catalog.insert(id.clone(), id.clone());
        }
        let channel = FakeChannel::new();

        merge_metrics(&channel, &mut catalog, &any_range()).await.unwrap();

        let queries = channel.queries();
        let sizes: Vec<_> = queries.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(queries.concat(), ids);
    }

    #[tokio::test]
    async fn empty_catalog_issues_no_query() {
        let channel = FakeChannel::new();
        let mut catalog = Catalog::new();

        merge_metrics(&channel, &mut catalog, &any_range()).await.unwrap();

        assert!(channel.queries().is_empty());
    }

    #[tokio::test]
    async fn query_failure_is_fatal() {
        let mut channel = FakeChannel::new().with_views("v1", 1, 1.0);
        channel.fail_views = true;
        let mut catalog = catalog_of(&["v1"]);

        let err = merge_metrics(&channel, &mut catalog, &any_range())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("quotaExceeded"));
    }
}
