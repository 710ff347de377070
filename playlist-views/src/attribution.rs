//! Credits each video's adjusted views to the playlist it belongs to.
//!
//! A video is credited at most once: playlists are processed in listing order and the first
//! playlist that contains a video claims it, taking it out of the catalog. Later playlists that
//! also contain the video get nothing for it. Videos no playlist claims are the leftovers.

use crate::catalog::{Catalog, ViewMetrics};
use crate::source::{ChannelSource, PlaylistSummary};
use eyre::Context;
use std::collections::HashMap;
use tokio_stream::StreamExt;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistTotal {
    pub playlist_id: String,
    pub title: String,
    /// Sum of the adjusted views of the videos credited to this playlist.
    pub adjusted_views: f64,
    /// How many videos were credited to this playlist.
    pub videos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeftoverVideo {
    pub video_id: String,
    pub title: String,
    pub metrics: ViewMetrics,
}

/// The catalog, partitioned into playlist totals and unclaimed videos.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attribution {
    /// One entry per playlist, in listing order, including playlists that got no views.
    pub playlists: Vec<PlaylistTotal>,
    /// Videos with metrics that no playlist claimed, most adjusted views first.
    pub leftovers: Vec<LeftoverVideo>,
}

/// What happened to one playlist member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credit {
    Credited,
    /// Claimed by the playlist at this index in the listing.
    AlreadyCredited(usize),
    NoMetrics,
    NotInCatalog,
}

/// Accumulates playlist totals while draining the catalog.
#[derive(Debug)]
struct Attributor {
    catalog: Catalog,
    playlists: Vec<PlaylistTotal>,
    /// Which playlist claimed each credited video.
    claimed_by: HashMap<String, usize>,
}

impl Attributor {
    fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            playlists: Vec::new(),
            claimed_by: HashMap::new(),
        }
    }

    fn start_playlist(&mut self, playlist: PlaylistSummary) {
        self.playlists.push(PlaylistTotal {
            playlist_id: playlist.playlist_id,
            title: playlist.title,
            adjusted_views: 0.0,
            videos: 0,
        });
    }

    /// Credits `video_id` to the most recently started playlist, if it is still up for grabs.
    fn credit(&mut self, video_id: &str) -> Credit {
        let index = self.playlists.len() - 1;
        if let Some((_, metrics)) = self.catalog.take_merged(video_id) {
            let total = &mut self.playlists[index];
            total.adjusted_views += metrics.adjusted_views;
            total.videos += 1;
            self.claimed_by.insert(video_id.to_string(), index);
            Credit::Credited
        } else if let Some(&claimant) = self.claimed_by.get(video_id) {
            Credit::AlreadyCredited(claimant)
        } else if self.catalog.get(video_id).is_some() {
            Credit::NoMetrics
        } else {
            Credit::NotInCatalog
        }
    }

    fn finish(self) -> Attribution {
        let mut leftovers: Vec<_> = self
            .catalog
            .into_merged()
            .map(|(video_id, title, metrics)| LeftoverVideo {
                video_id,
                title,
                metrics,
            })
            .collect();
        // stable, so equal totals stay in catalog order
        leftovers.sort_by(|a, b| b.metrics.adjusted_views.total_cmp(&a.metrics.adjusted_views));
        Attribution {
            playlists: self.playlists,
            leftovers,
        }
    }
}

/// Walks every playlist of the channel and splits `catalog` into playlist totals and leftovers.
///
/// The catalog is consumed: once a video has been credited it is not visible to anything else.
pub async fn attribute_playlists<S>(source: &S, catalog: Catalog) -> eyre::Result<Attribution>
where
    S: ChannelSource,
{
    let mut playlists = Vec::new();
    {
        let mut listing = std::pin::pin!(source.playlists());
        while let Some(playlist) = listing.next().await {
            playlists.push(playlist.context("fetch playlists")?);
        }
    }
    tracing::info!(playlists = playlists.len(), "collected channel playlists");

    let mut attributor = Attributor::new(catalog);
    for playlist in playlists {
        let playlist_id = playlist.playlist_id.clone();
        attributor.start_playlist(playlist);

        let mut members = std::pin::pin!(source.playlist_members(&playlist_id));
        while let Some(video_id) = members.next().await {
            let video_id =
                video_id.with_context(|| format!("fetch items of playlist {playlist_id}"))?;
            match attributor.credit(&video_id) {
                Credit::Credited => {}
                Credit::AlreadyCredited(claimant) => tracing::debug!(
                    %playlist_id,
                    %video_id,
                    credited_to = %attributor.playlists[claimant].playlist_id,
                    "video already credited to an earlier playlist"
                ),
                Credit::NoMetrics => tracing::debug!(
                    %playlist_id,
                    %video_id,
                    "playlist video has no analytics for the period"
                ),
                Credit::NotInCatalog => tracing::debug!(
                    %playlist_id,
                    %video_id,
                    "playlist video is not among the channel's uploads"
                ),
            }
        }

        if let Some(total) = attributor.playlists.last() {
            tracing::debug!(
                %playlist_id,
                videos = total.videos,
                adjusted_views = total.adjusted_views,
                "attributed playlist"
            );
        }
    }

    let attribution = attributor.finish();
    tracing::info!(
        playlists = attribution.playlists.len(),
        leftovers = attribution.leftovers.len(),
        "attributed videos to playlists"
    );
    Ok(attribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::testing::FakeChannel;
    use crate::youtube_api::analytics::VideoViews;
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    /// Catalog with one video per `(id, views, average_view_percentage)`; `None` means no
    /// analytics.
    fn catalog(videos: &[(&str, Option<(u64, f64)>)]) -> Catalog {
        let mut catalog = Catalog::new();
        for &(id, metrics) in videos {
            catalog.insert(id, id.to_uppercase());
            if let Some((views, average_view_percentage)) = metrics {
                catalog.record_metrics(&VideoViews {
                    video_id: id.to_string(),
                    views,
                    average_view_percentage,
                });
            }
        }
        catalog
    }

    fn totals(attribution: &Attribution) -> Vec<(&str, f64, usize)> {
        attribution
            .playlists
            .iter()
            .map(|p| (p.title.as_str(), p.adjusted_views, p.videos))
            .collect()
    }

    fn leftovers(attribution: &Attribution) -> Vec<(&str, f64)> {
        attribution
            .leftovers
            .iter()
            .map(|v| (v.video_id.as_str(), v.metrics.adjusted_views))
            .collect()
    }

    #[tokio::test]
    async fn playlist_claims_its_videos() {
        let channel = FakeChannel::new().with_playlist("PL1", "P1", &["v1"], 50);
        let catalog = catalog(&[("v1", Some((100, 50.0))), ("v2", Some((10, 10.0)))]);

        let attribution = attribute_playlists(&channel, catalog).await.unwrap();

        assert_eq!(totals(&attribution), vec![("P1", 50.0, 1)]);
        assert_eq!(leftovers(&attribution), vec![("v2", 1.0)]);
        assert_eq!(attribution.leftovers[0].title, "V2");
    }

    #[tokio::test]
    async fn first_playlist_in_listing_order_wins() {
        let channel = FakeChannel::new()
            .with_playlist("PL1", "first", &["a", "shared"], 50)
            .with_playlist("PL2", "second", &["shared", "b"], 50)
            .with_playlist("PL3", "third", &["shared"], 50);
        let catalog = catalog(&[
            ("a", Some((10, 100.0))),
            ("b", Some((20, 100.0))),
            ("shared", Some((40, 50.0))),
        ]);

        let attribution = attribute_playlists(&channel, catalog).await.unwrap();

        assert_eq!(
            totals(&attribution),
            vec![("first", 30.0, 2), ("second", 20.0, 1), ("third", 0.0, 0)]
        );
        assert!(attribution.leftovers.is_empty());
    }

    #[tokio::test]
    async fn unknown_and_unmerged_members_are_skipped() {
        let channel = FakeChannel::new()
            .with_playlist("PL1", "P1", &["not-uploaded", "quiet", "v1"], 2)
            .with_playlist("PL2", "P2", &["quiet"], 50);
        let catalog = catalog(&[("v1", Some((8, 50.0))), ("quiet", None)]);

        let attribution = attribute_playlists(&channel, catalog).await.unwrap();

        assert_eq!(totals(&attribution), vec![("P1", 4.0, 1), ("P2", 0.0, 0)]);
        // videos without analytics are never leftovers
        assert!(attribution.leftovers.is_empty());
    }

    #[tokio::test]
    async fn empty_playlists_are_reported() {
        let channel = FakeChannel::new()
            .with_playlist("PL1", "empty", &[], 50)
            .with_playlist("PL2", "also empty", &[], 50);

        let attribution = attribute_playlists(&channel, Catalog::new()).await.unwrap();

        assert_eq!(
            totals(&attribution),
            vec![("empty", 0.0, 0), ("also empty", 0.0, 0)]
        );
    }

    #[tokio::test]
    async fn leftovers_sorted_by_adjusted_views_descending() {
        let channel = FakeChannel::new();
        let catalog = catalog(&[
            ("low", Some((10, 10.0))),
            ("zero", Some((500, 0.0))),
            ("high", Some((1000, 45.0))),
            ("tie-first", Some((20, 50.0))),
            ("tie-second", Some((10, 100.0))),
            ("unwatched", None),
        ]);

        let attribution = attribute_playlists(&channel, catalog).await.unwrap();

        assert!(attribution.playlists.is_empty());
        assert_eq!(
            leftovers(&attribution),
            vec![
                ("high", 450.0),
                ("tie-first", 10.0),
                ("tie-second", 10.0),
                ("low", 1.0),
                ("zero", 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn attribution_conserves_adjusted_views() {
        let videos: Vec<(String, Option<(u64, f64)>)> = (0..120)
            .map(|i| {
                let metrics = (i % 7 != 0).then(|| (i * 13 % 97, (i * 31 % 100) as f64 + 0.37));
                (format!("v{i}"), metrics)
            })
            .collect();
        let borrowed: Vec<(&str, Option<(u64, f64)>)> =
            videos.iter().map(|(id, m)| (id.as_str(), *m)).collect();
        let catalog = catalog(&borrowed);
        let expected: f64 = catalog
            .iter()
            .filter_map(|(_, v)| v.metrics)
            .map(|m| m.adjusted_views)
            .sum();

        let members = |range: std::ops::Range<u64>| -> Vec<String> {
            range.map(|i| format!("v{i}")).collect()
        };
        let p1 = members(0..40);
        let p2 = members(30..70);
        let mut p3 = members(65..90);
        p3.push("elsewhere".into());
        fn as_refs(ids: &[String]) -> Vec<&str> {
            ids.iter().map(String::as_str).collect()
        }
        let channel = FakeChannel::new()
            .with_playlist("PL1", "P1", &as_refs(&p1), 50)
            .with_playlist("PL2", "P2", &as_refs(&p2), 7)
            .with_playlist("PL3", "P3", &as_refs(&p3), 10);

        let attribution = attribute_playlists(&channel, catalog).await.unwrap();

        let credited: f64 = attribution.playlists.iter().map(|p| p.adjusted_views).sum();
        let left: f64 = attribution
            .leftovers
            .iter()
            .map(|v| v.metrics.adjusted_views)
            .sum();
        assert!(approx_eq!(f64, credited + left, expected, epsilon = 1e-6));

        let credited_videos: usize = attribution.playlists.iter().map(|p| p.videos).sum();
        let merged = videos.iter().filter(|(_, m)| m.is_some()).count();
        assert_eq!(credited_videos + attribution.leftovers.len(), merged);
    }

    #[tokio::test]
    async fn member_listing_failure_is_fatal() {
        let mut channel = FakeChannel::new()
            .with_playlist("PL1", "P1", &["v1"], 50)
            .with_playlist("PL2", "P2", &["v2", "v3"], 1);
        channel.fail_members_of = Some("PL2".into());
        let catalog = catalog(&[("v1", Some((1, 100.0)))]);

        let err = attribute_playlists(&channel, catalog).await.unwrap_err();
        assert!(format!("{err:#}").contains("PL2"));
    }
}
