//! End-to-end flows: seeding, cursor-chase fetching, boundary markers,
//! and time-range gap detection against the in-memory store and source.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tideway_core::{CacheItem, Direction, EngineConfig, ItemBase, ScoreSource};
use tideway_engine::{
    InMemorySource, Mode, PagePosition, PageSeeder, Paginator, Timeline, TimelineSeeder,
};
use tideway_store::{Marker, MemoryStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    #[serde(flatten)]
    base: ItemBase,
    score: f64,
    label: String,
}

impl CacheItem for Article {
    fn base(&self) -> &ItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ItemBase {
        &mut self.base
    }
}

fn article(label: &str, score: f64) -> Article {
    let mut base = ItemBase::new();
    base.randid = label.to_string();
    Article {
        base,
        score,
        label: label.to_string(),
    }
}

fn by_score() -> ScoreSource<Article> {
    ScoreSource::Computed(Arc::new(|a: &Article| a.score))
}

const P: &[&str] = &["u1"];

fn labels(page: &[Article]) -> Vec<&str> {
    page.iter().map(|a| a.label.as_str()).collect()
}

#[tokio::test]
async fn blank_seed_serves_an_empty_first_page() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());
    let seeder = PageSeeder::new(InMemorySource::new(by_score()), paginator.clone());

    seeder.seed_partial(0, None, &(), P).await.unwrap();

    assert!(paginator
        .markers()
        .is_set(P, Marker::BlankPage)
        .await
        .unwrap());
    assert!(!paginator
        .markers()
        .is_set(P, Marker::FirstPage)
        .await
        .unwrap());
    assert_eq!(paginator.index().cardinality(P).await.unwrap(), 0);

    let page = paginator.fetch(P, &[]).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.last_rid, "");
    assert_eq!(page.position, PagePosition::FirstPage);
}

#[tokio::test]
async fn underfilled_first_page_round_trip() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());

    let source = InMemorySource::new(by_score());
    source.insert(article("A", 3.0));
    source.insert(article("B", 2.0));
    let seeder = PageSeeder::new(source, paginator.clone());

    let count = seeder.seed_partial(0, None, &(), P).await.unwrap();
    assert_eq!(count, 2);
    assert!(paginator
        .markers()
        .is_set(P, Marker::FirstPage)
        .await
        .unwrap());

    let page = paginator.fetch(P, &[]).await.unwrap();
    assert_eq!(labels(&page.items), vec!["A", "B"]);
    assert_eq!(page.last_rid, "B");
    assert_eq!(page.position, PagePosition::FirstPage);
}

#[tokio::test]
async fn two_page_seed_serves_the_trailing_page_from_cache() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());

    let source = InMemorySource::new(by_score());
    for record in [
        article("A", 5.0),
        article("B", 4.0),
        article("C", 3.0),
        article("D", 2.0),
        article("E", 1.0),
    ] {
        source.insert(record);
    }
    let seeder = PageSeeder::new(source, paginator.clone());

    // Leading page fills completely: no marker yet.
    let first = seeder.seed_partial(0, None, &(), P).await.unwrap();
    assert_eq!(first, 3);
    assert!(!paginator
        .markers()
        .is_set(P, Marker::FirstPage)
        .await
        .unwrap());

    // The anchored continuation runs dry and proves the trailing edge.
    let second = seeder.seed_partial(0, Some("C"), &(), P).await.unwrap();
    assert_eq!(second, 2);
    assert!(paginator
        .markers()
        .is_set(P, Marker::LastPage)
        .await
        .unwrap());
    assert_eq!(paginator.index().cardinality(P).await.unwrap(), 5);

    let page = paginator.fetch(P, &["C".to_string()]).await.unwrap();
    assert_eq!(labels(&page.items), vec!["D", "E"]);
    assert_eq!(page.last_rid, "E");
    assert_eq!(page.position, PagePosition::LastPage);
}

#[tokio::test]
async fn stale_cursor_chain_recovers_or_falls_back() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());

    for record in [
        article("A", 5.0),
        article("B", 4.0),
        article("C", 3.0),
        article("D", 2.0),
    ] {
        paginator.items().set(&record).await.unwrap();
        paginator.add_item(&record, P, Mode::Seed).await.unwrap();
    }

    // Only C survives of the chain: the fetch resumes after it.
    let chain = vec!["X".to_string(), "Y".to_string(), "C".to_string()];
    let page = paginator.fetch(P, &chain).await.unwrap();
    assert_eq!(labels(&page.items), vec!["D"]);
    assert_eq!(page.position, PagePosition::LastPage);

    // A fully dead chain falls through to the leading page.
    let dead = vec!["X".to_string(), "Y".to_string()];
    let page = paginator.fetch(P, &dead).await.unwrap();
    assert_eq!(labels(&page.items), vec!["A", "B", "C"]);
    assert_eq!(page.position, PagePosition::FirstPage);
}

#[tokio::test]
async fn live_write_cannot_bootstrap_an_unseeded_collection() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());

    let item = article("A", 10.0);
    paginator.items().set(&item).await.unwrap();
    paginator.add_item(&item, P, Mode::Live).await.unwrap();

    assert_eq!(paginator.index().cardinality(P).await.unwrap(), 0);
    assert!(paginator.requires_seeding(P, 1).await.unwrap());
}

#[tokio::test]
async fn seeding_then_live_traffic_keeps_the_window_consistent() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());

    let source = InMemorySource::new(by_score());
    source.insert(article("A", 3.0));
    source.insert(article("B", 2.0));
    let seeder = PageSeeder::new(source, paginator.clone());
    seeder.seed_partial(0, None, &(), P).await.unwrap();

    // New leading item arrives live; the window is not at capacity yet,
    // so firstpage survives.
    let fresh = article("F", 9.0);
    paginator.items().set(&fresh).await.unwrap();
    paginator.add_item(&fresh, P, Mode::Live).await.unwrap();
    assert!(paginator
        .markers()
        .is_set(P, Marker::FirstPage)
        .await
        .unwrap());

    // The next live arrival finds the window at capacity: the leading
    // page claim no longer holds.
    let next = article("G", 8.0);
    paginator.items().set(&next).await.unwrap();
    paginator.add_item(&next, P, Mode::Live).await.unwrap();
    assert!(!paginator
        .markers()
        .is_set(P, Marker::FirstPage)
        .await
        .unwrap());

    let page = paginator.fetch(P, &[]).await.unwrap();
    assert_eq!(labels(&page.items), vec!["F", "G", "A"]);
}

#[tokio::test]
async fn purge_removes_reachable_items_and_markers() {
    let backend = Arc::new(MemoryStore::new());
    let config = EngineConfig::new(Direction::Descending).with_items_per_page(3);
    let paginator = Paginator::new(Arc::clone(&backend), "article:%s", "feed:%s", config)
        .with_score_source(by_score());

    let source = InMemorySource::new(by_score());
    source.insert(article("A", 2.0));
    source.insert(article("B", 1.0));
    let seeder = PageSeeder::new(source, paginator.clone());
    seeder.seed_partial(0, None, &(), P).await.unwrap();

    paginator.purge_pagination(P).await.unwrap();

    assert_eq!(paginator.index().cardinality(P).await.unwrap(), 0);
    assert!(paginator.items().get("A").await.unwrap().is_none());
    assert!(paginator.items().get("B").await.unwrap().is_none());
    assert!(!paginator
        .markers()
        .is_set(P, Marker::FirstPage)
        .await
        .unwrap());
}

fn day(month: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, d, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn time_range_gaps_drive_interval_seeding() {
    let backend = Arc::new(MemoryStore::new());
    let timeline: Timeline<Article, MemoryStore> =
        Timeline::new(Arc::clone(&backend), "article:%s", "history:%s", Direction::Ascending)
            .with_score_source(by_score());

    timeline
        .watermarks()
        .set_earliest(P, day(3, 1))
        .await
        .unwrap();
    timeline
        .watermarks()
        .set_latest(P, day(3, 10))
        .await
        .unwrap();

    let gaps = timeline
        .require_seeding_time_range(P, day(2, 25), day(3, 20))
        .await
        .unwrap();
    assert_eq!(
        gaps,
        vec![(day(2, 25), day(3, 1)), (day(3, 10), day(3, 20))]
    );

    // Backfill the gaps and verify the coverage widened accordingly.
    let source = InMemorySource::new(by_score());
    for (label, month, d) in [("A", 2, 27), ("B", 3, 5), ("C", 3, 15)] {
        source.insert(article(label, day(month, d).timestamp_millis() as f64));
    }
    let seeder = TimelineSeeder::new(source, timeline.clone());
    seeder.seed_time_ranges(&(), P, &gaps).await.unwrap();

    assert_eq!(
        timeline.watermarks().earliest(P).await.unwrap(),
        Some(day(2, 27))
    );
    assert_eq!(
        timeline.watermarks().latest(P).await.unwrap(),
        Some(day(3, 15))
    );
    assert!(timeline
        .require_seeding_time_range(P, day(2, 27), day(3, 15))
        .await
        .unwrap()
        .is_empty());

    // B sits inside the original coverage but was fetched during the
    // backfill; A and C came from the gaps.
    let all = timeline.fetch_all(P).await.unwrap();
    assert_eq!(labels(&all), vec!["A", "B", "C"]);
}
