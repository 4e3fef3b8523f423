mod common;

use common::*;
use warehouse_history::domain::event::Action;
use warehouse_history::domain::filter::HistoryFilter;
use warehouse_history::services::{history, inventory};

const DB: &str = "warehouse_history_test_concurrency";

// ── concurrent_updates_keep_the_chain ─────────────────────────────────────
// 10 tasks update the same item at once. The row lock serializes them, so
// every event's before is exactly the previous event's after.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_keep_the_chain() {
    let Some(pool) = setup_pool(DB).await else { return };

    let item = inventory::create_item(&pool, &widget(), "cc_chain").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            inventory::update_item(&pool, item.id, &quantity_patch(100 + i), &format!("cc_chain_{i}"))
                .await
                .unwrap()
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let mut events = history::item_history(&pool, item.id, HistoryFilter::default())
        .await
        .unwrap()
        .events;
    events.reverse();

    assert_eq!(events.len(), 11);
    assert_eq!(events[0].action, Action::Create);
    for pair in events.windows(2) {
        assert_eq!(pair[0].after, pair[1].before, "events {} -> {}", pair[0].id, pair[1].id);
        assert_eq!(pair[1].diff.len(), 1);
    }

    let last_after = events.last().unwrap().after.clone().unwrap();
    let current = inventory::get_item(&pool, item.id).await.unwrap();
    assert_eq!(last_after, current.snapshot());
}

// ── concurrent_update_and_delete ──────────────────────────────────────────
// One delete races several updates. Whatever order wins, the log never
// holds an UPDATE after the DELETE, and every losing update is NotFound.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_update_and_delete() {
    let Some(pool) = setup_pool(DB).await else { return };

    let item = inventory::create_item(&pool, &widget(), "cc_race").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..5 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            inventory::update_item(&pool, item.id, &quantity_patch(i), "cc_race")
                .await
                .is_ok()
        }));
    }
    let deleter = {
        let pool = pool.clone();
        tokio::spawn(async move { inventory::delete_item(&pool, item.id, "cc_race").await })
    };

    let mut applied = 0;
    for h in handles {
        if h.await.unwrap() {
            applied += 1;
        }
    }
    deleter.await.unwrap().unwrap();

    let mut events = history::item_history(&pool, item.id, HistoryFilter::default())
        .await
        .unwrap()
        .events;
    events.reverse();

    assert_eq!(events.len(), 2 + applied);
    assert_eq!(events.last().unwrap().action, Action::Delete);
    for pair in events.windows(2) {
        assert_eq!(pair[0].after, pair[1].before);
    }
}

// ── concurrent_creates_get_distinct_ids ───────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_ids() {
    let Some(pool) = setup_pool(DB).await else { return };

    let mut handles = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            inventory::create_item(&pool, &new_item(&format!("Part {i}"), i, 50), "cc_create")
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);

    for id in ids {
        assert_eq!(history_rows(&pool, id).await, 1);
    }
}
