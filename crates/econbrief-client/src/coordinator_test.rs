use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::oneshot;

use super::*;

/// Scripted server: each toggle waits for the next queued answer.
#[derive(Default)]
struct FakeApi {
    toggles: Mutex<VecDeque<oneshot::Receiver<Result<bool, ()>>>>,
    status: Mutex<Option<bool>>,
    bookmarked: Mutex<Vec<i64>>,
    toggle_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl FakeApi {
    fn with_status(status: bool) -> Self {
        Self {
            status: Mutex::new(Some(status)),
            ..Self::default()
        }
    }

    fn queue_toggle(&self) -> oneshot::Sender<Result<bool, ()>> {
        let (tx, rx) = oneshot::channel();
        self.toggles.lock().expect("lock").push_back(rx);
        tx
    }
}

fn server_error() -> ClientError {
    ClientError::Api {
        status: 500,
        code: "internal_error".to_string(),
        message: "database query failed".to_string(),
    }
}

#[async_trait]
impl BookmarkApi for FakeApi {
    async fn toggle(&self, _article_id: i64) -> Result<bool, ClientError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        let rx = self
            .toggles
            .lock()
            .expect("lock")
            .pop_front()
            .expect("unexpected toggle call");
        match rx.await {
            Ok(Ok(bookmarked)) => Ok(bookmarked),
            _ => Err(server_error()),
        }
    }

    async fn status(&self, _article_id: i64) -> Result<bool, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        (*self.status.lock().expect("lock")).ok_or_else(server_error)
    }

    async fn batch_status(&self, article_ids: &[i64]) -> Result<Vec<i64>, ClientError> {
        let bookmarked = self.bookmarked.lock().expect("lock");
        Ok(article_ids
            .iter()
            .copied()
            .filter(|id| bookmarked.contains(id))
            .collect())
    }
}

fn coordinator(api: FakeApi) -> Arc<BookmarkCoordinator<FakeApi>> {
    Arc::new(BookmarkCoordinator::new(api, QueryCache::new()))
}

async fn wait_for_state(
    coordinator: &BookmarkCoordinator<FakeApi>,
    article_id: i64,
    expected: BookmarkState,
) {
    for _ in 0..100 {
        if coordinator.state(article_id) == expected {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("state never became {expected:?}");
}

#[tokio::test]
async fn unknown_state_is_loaded_before_toggling() {
    let coordinator = coordinator(FakeApi::with_status(false));
    assert_eq!(coordinator.state(42), BookmarkState::Unknown);

    let tx = coordinator.api.queue_toggle();
    tx.send(Ok(true)).expect("send");

    assert!(coordinator.toggle(42).await.expect("toggle"));
    assert_eq!(coordinator.api.status_calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.state(42), BookmarkState::Known(true));
}

#[tokio::test]
async fn toggle_flips_before_server_answers() {
    let coordinator = coordinator(FakeApi::default());
    coordinator.cache().set(status_key(7), json!(false));
    let tx = coordinator.api.queue_toggle();

    let task = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.toggle(7).await })
    };

    wait_for_state(&coordinator, 7, BookmarkState::Known(true)).await;
    tx.send(Ok(true)).expect("send");

    assert!(task.await.expect("join").expect("toggle"));
    assert_eq!(coordinator.state(7), BookmarkState::Known(true));
}

#[tokio::test]
async fn failed_toggle_restores_previous_state() {
    let coordinator = coordinator(FakeApi::default());
    coordinator.cache().set(status_key(3), json!(true));
    let tx = coordinator.api.queue_toggle();
    tx.send(Err(())).expect("send");

    let err = coordinator.toggle(3).await.expect_err("toggle should fail");
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
    assert_eq!(coordinator.state(3), BookmarkState::Known(true));
}

#[tokio::test]
async fn failed_status_load_leaves_state_unknown_and_skips_toggle() {
    let coordinator = coordinator(FakeApi::default());

    assert!(coordinator.toggle(9).await.is_err());
    assert_eq!(coordinator.state(9), BookmarkState::Unknown);
    assert_eq!(coordinator.api.toggle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_toggles_roll_back_to_their_own_snapshots() {
    let coordinator = coordinator(FakeApi::default());
    coordinator.cache().set(status_key(5), json!(false));
    let first_tx = coordinator.api.queue_toggle();
    let second_tx = coordinator.api.queue_toggle();

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.toggle(5).await })
    };
    wait_for_state(&coordinator, 5, BookmarkState::Known(true)).await;

    let second = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.toggle(5).await })
    };
    wait_for_state(&coordinator, 5, BookmarkState::Known(false)).await;

    // The second call started from the first call's optimistic value.
    second_tx.send(Err(())).expect("send");
    assert!(second.await.expect("join").is_err());
    assert_eq!(coordinator.state(5), BookmarkState::Known(true));

    first_tx.send(Err(())).expect("send");
    assert!(first.await.expect("join").is_err());
    assert_eq!(coordinator.state(5), BookmarkState::Known(false));
}

#[tokio::test]
async fn successful_toggle_invalidates_aggregate_views_only() {
    let coordinator = coordinator(FakeApi::default());
    let cache = coordinator.cache().clone();
    cache.set(status_key(1), json!(false));
    cache.set(status_key(2), json!(true));
    cache.set(QueryKey::new(["bookmarks", "list", "first"]), json!([]));
    cache.set(batch_key(&[1, 2]), json!([2]));
    cache.set(QueryKey::new(["articles", "finance"]), json!([]));

    let tx = coordinator.api.queue_toggle();
    tx.send(Ok(true)).expect("send");
    coordinator.toggle(1).await.expect("toggle");

    assert!(cache.get(&QueryKey::new(["bookmarks", "list", "first"])).is_none());
    assert!(cache.get(&batch_key(&[1, 2])).is_none());
    assert_eq!(cache.get(&status_key(2)), Some(json!(true)));
    assert!(cache.get(&QueryKey::new(["articles", "finance"])).is_some());
}

#[tokio::test]
async fn failed_toggle_keeps_aggregate_views() {
    let coordinator = coordinator(FakeApi::default());
    let cache = coordinator.cache().clone();
    cache.set(status_key(1), json!(false));
    cache.set(batch_key(&[1]), json!([]));

    let tx = coordinator.api.queue_toggle();
    tx.send(Err(())).expect("send");
    assert!(coordinator.toggle(1).await.is_err());

    assert_eq!(cache.get(&batch_key(&[1])), Some(json!([])));
}

#[tokio::test]
async fn load_many_populates_batch_and_individual_status() {
    let api = FakeApi::default();
    *api.bookmarked.lock().expect("lock") = vec![2];
    let coordinator = coordinator(api);

    let bookmarked = coordinator.load_many(&[3, 1, 2, 2]).await.expect("load_many");
    assert_eq!(bookmarked, vec![2]);

    let cache = coordinator.cache();
    assert_eq!(cache.get_as::<Vec<i64>>(&batch_key(&[1, 2, 3])), Some(vec![2]));
    assert_eq!(coordinator.state(1), BookmarkState::Known(false));
    assert_eq!(coordinator.state(2), BookmarkState::Known(true));
    assert_eq!(coordinator.state(3), BookmarkState::Known(false));
}

#[tokio::test]
async fn load_many_with_no_ids_makes_no_request() {
    let coordinator = coordinator(FakeApi::default());
    assert!(coordinator.load_many(&[]).await.expect("empty").is_empty());
    assert!(coordinator.cache().is_empty());
}
