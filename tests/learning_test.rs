// tests/learning_test.rs — Integration test: keyword learning over the SQLite store

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use adreply::infra::config::{Config, LearningConfig};
use adreply::learner::recorder::FeedbackRecorder;
use adreply::matching::engine::SuggestionEngine;
use adreply::matching::types::Template;
use adreply::memory::backend::{Backend, SuggestionStore};
use adreply::memory::store_server::spawn_store_server;
use adreply::memory::MemoryManager;

fn keywords(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn sqlite_backend() -> Arc<Backend> {
    let manager = MemoryManager::in_memory().unwrap();
    let (handle, _server) = spawn_store_server(manager.store);
    Arc::new(Backend::Sqlite(handle))
}

fn recorder() -> (FeedbackRecorder<Backend>, Arc<Backend>) {
    let store = sqlite_backend();
    (
        FeedbackRecorder::new(Arc::clone(&store), LearningConfig::default()),
        store,
    )
}

async fn record_counts(
    rec: &FeedbackRecorder<Backend>,
    category: &str,
    keyword: &str,
    matches: u64,
    chosen: u64,
) {
    let kw = keywords(&[keyword]);
    for _ in 0..matches {
        rec.record_match(category, &kw).await.unwrap();
    }
    for _ in 0..chosen {
        rec.record_selection(category, &kw).await.unwrap();
    }
}

#[tokio::test]
async fn test_score_seventy_percent() {
    let (rec, store) = recorder();
    record_counts(&rec, "automotive", "exhaust", 50, 35).await;

    let stats = store.get_keyword_stats("automotive").await.unwrap();
    assert!((stats["exhaust"].score - 0.70).abs() < 1e-9);
    assert_eq!(stats["exhaust"].percent(), 70);
}

#[tokio::test]
async fn test_suggested_removals_threshold() {
    let (rec, _store) = recorder();
    record_counts(&rec, "automotive", "garage", 30, 1).await;
    record_counts(&rec, "automotive", "exhaust", 30, 5).await;
    // Too few matches to judge.
    record_counts(&rec, "automotive", "fit", 10, 0).await;

    let removals = rec.get_suggested_removals(0.1, 20).await.unwrap();
    let names: Vec<&str> = removals.iter().map(|s| s.keyword.as_str()).collect();
    assert_eq!(names, vec!["garage"]);
}

#[tokio::test]
async fn test_calculate_scores_idempotent() {
    let (rec, store) = recorder();
    record_counts(&rec, "automotive", "exhaust", 7, 3).await;
    record_counts(&rec, "fitness", "gym", 4, 1).await;

    assert_eq!(rec.calculate_scores().await.unwrap(), 2);
    let first = store.get_keyword_stats("automotive").await.unwrap();
    rec.calculate_scores().await.unwrap();
    let second = store.get_keyword_stats("automotive").await.unwrap();
    assert_eq!(first["exhaust"].score, second["exhaust"].score);
    assert_eq!(first["exhaust"].matches, second["exhaust"].matches);
}

#[tokio::test]
async fn test_performance_report() {
    let (rec, _store) = recorder();
    record_counts(&rec, "automotive", "exhaust", 50, 35).await;
    record_counts(&rec, "automotive", "garage", 30, 1).await;
    rec.record_ignore("automotive", &keywords(&["garage"]))
        .await
        .unwrap();

    let report = rec.get_performance_report().await.unwrap();
    assert_eq!(report.total_matches, 80);
    assert_eq!(report.total_chosen, 36);
    assert_eq!(report.total_ignored, 1);
    assert_eq!(report.categories.len(), 1);
    assert_eq!(report.categories[0].top_keywords[0].keyword, "exhaust");
    assert_eq!(report.suggested_removals.len(), 1);
}

#[tokio::test]
async fn test_concurrent_events_not_lost() {
    let (rec, store) = recorder();
    let kw = keywords(&["exhaust", "muffler"]);

    let tasks: Vec<_> = (0..40)
        .map(|i| {
            let rec = rec.clone();
            let kw = kw.clone();
            tokio::spawn(async move {
                if i % 4 == 0 {
                    rec.record_ignore("automotive", &kw).await
                } else {
                    rec.record_match("automotive", &kw).await
                }
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap().unwrap();
    }

    let stats = store.get_keyword_stats("automotive").await.unwrap();
    assert_eq!(stats["exhaust"].matches, 30);
    assert_eq!(stats["exhaust"].ignored, 10);
    assert_eq!(stats["muffler"].matches, 30);
}

#[tokio::test(start_paused = true)]
async fn test_ignore_timer_fires_without_selection() {
    let store = sqlite_backend();
    store
        .upsert_template(
            Template::new("moto", "Moto", "Exhaust work")
                .with_keywords(["exhaust", "garage"])
                .with_verticals(["automotive"]),
        )
        .await
        .unwrap();
    let engine = SuggestionEngine::new(Arc::clone(&store), Config::default());

    let shown = engine.get_suggestions(Some("exhaust noise"), "g", None).await;
    assert_eq!(shown.len(), 1);
    assert_eq!(engine.recorder().pending_ignores(), 1);

    tokio::time::sleep(Duration::from_secs(9)).await;
    let stats = store.get_keyword_stats("automotive").await.unwrap();
    assert_eq!(stats["exhaust"].ignored, 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let stats = store.get_keyword_stats("automotive").await.unwrap();
    assert_eq!(stats["exhaust"].matches, 1);
    assert_eq!(stats["exhaust"].ignored, 1);
    assert_eq!(engine.recorder().pending_ignores(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_selection_before_timeout_cancels_ignore() {
    let store = sqlite_backend();
    store
        .upsert_template(
            Template::new("moto", "Moto", "Exhaust work")
                .with_keywords(["exhaust"])
                .with_verticals(["automotive"]),
        )
        .await
        .unwrap();
    let engine = SuggestionEngine::new(Arc::clone(&store), Config::default());

    let shown = engine.get_suggestions(Some("exhaust"), "g", None).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    engine.record_suggestion_usage(&shown[0], "g").await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    let stats = store.get_keyword_stats("automotive").await.unwrap();
    assert_eq!(stats["exhaust"].chosen, 1);
    assert_eq!(stats["exhaust"].ignored, 0);
}

#[tokio::test]
async fn test_prune_orphaned_categories() {
    let store = sqlite_backend();
    store
        .upsert_template(
            Template::new("gym", "Gym", "First week free")
                .with_keywords(["gym"])
                .with_verticals(["fitness"]),
        )
        .await
        .unwrap();
    let mut config = Config::default();
    config.learning.enabled = false;
    let engine = SuggestionEngine::new(Arc::clone(&store), config);

    engine
        .record_match("fitness", &keywords(&["gym"]))
        .await
        .unwrap();
    engine
        .record_match("retired", &keywords(&["old"]))
        .await
        .unwrap();

    assert_eq!(engine.prune_orphaned_stats().await.unwrap(), 1);
    let remaining: HashSet<String> = store
        .list_keyword_categories()
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(remaining, HashSet::from(["fitness".to_string()]));
}
