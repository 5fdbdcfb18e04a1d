//! Async query abstraction: what a view holds while a repository call runs.
//!
//! A `Query<T>` owns one in-flight request at a time and tracks its
//! loading/success/error state. It is scoped to the view that created it:
//! cancelling, refetching or dropping the query aborts the running task, and a
//! response that arrives afterwards is discarded.
//!
//! # Example
//!
//! ```ignore
//! let repo = console.buckets.clone();
//! let mut query = Query::new(move || {
//!     let repo = repo.clone();
//!     async move { repo.list(false).await.map_err(|e| e.to_string()) }
//! });
//!
//! query.fetch();
//! query.settle().await;
//!
//! match query.into_state() {
//!     QueryState::Success(result) => render(result),
//!     QueryState::Error(e) => render_error(e),
//!     _ => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
  /// Query was cancelled before it settled
  Cancelled,
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query with state management and scoped cancellation.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      task: None,
    }
  }

  /// Take the state out, leaving the query idle.
  pub fn into_state(mut self) -> QueryState<T> {
    std::mem::replace(&mut self.state, QueryState::Idle)
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, abandoning any pending one.
  #[allow(dead_code)]
  pub fn refetch(&mut self) {
    self.abort_pending();
    self.start_fetch();
  }

  /// Abort the pending fetch. Its response, if it still arrives, is ignored.
  pub fn cancel(&mut self) {
    if self.abort_pending() {
      self.state = QueryState::Cancelled;
    }
  }

  /// Wait until the pending fetch settles.
  ///
  /// Returns `false` if there was nothing pending.
  pub async fn settle(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let result = receiver.recv().await;
    self.settle_with(result);
    true
  }

  fn settle_with(&mut self, result: Option<Result<T, String>>) {
    self.state = match result {
      Some(Ok(data)) => QueryState::Success(data),
      Some(Err(error)) => QueryState::Error(error),
      // Sender dropped without sending: the task panicked
      None => QueryState::Error("Query was cancelled".to_string()),
    };
    self.receiver = None;
    self.task = None;
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    self.task = Some(tokio::spawn(async move {
      let result = future.await;
      // Receiver is gone once the query was cancelled
      let _ = tx.send(result);
    }));
  }
}

impl<T> Query<T> {
  /// Drop the receiver and abort the task. Returns whether anything was pending.
  fn abort_pending(&mut self) -> bool {
    let pending = self.receiver.take().is_some();
    if let Some(task) = self.task.take() {
      task.abort();
    }
    pending
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    self.abort_pending();
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("pending", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
impl<T> Query<T> {
  fn state(&self) -> &QueryState<T> {
    &self.state
  }

  fn data(&self) -> Option<&T> {
    match &self.state {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  fn error(&self) -> Option<&str> {
    match &self.state {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    assert!(query.settle().await);
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Failed to fetch buckets".to_string()) });

    query.fetch();
    query.settle().await;

    assert_eq!(query.error(), Some("Failed to fetch buckets"));
  }

  #[tokio::test]
  async fn test_settle_without_fetch_is_noop() {
    let mut query = Query::new(|| async { Ok::<_, String>(1) });
    assert!(!query.settle().await);
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should cancel the first and start a new one
    query.refetch();
    query.settle().await;

    // Only the second fetch ran to completion
    assert_eq!(query.data(), Some(&0));
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_cancel_ignores_late_response() {
    let finished = Arc::new(AtomicU32::new(0));
    let finished_clone = finished.clone();

    let mut query = Query::new(move || {
      let finished = finished_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        finished.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>("late")
      }
    });

    query.fetch();
    query.cancel();
    assert!(matches!(query.state(), QueryState::Cancelled));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!query.settle().await);
    assert!(matches!(query.state(), QueryState::Cancelled));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_drop_aborts_task() {
    let finished = Arc::new(AtomicU32::new(0));
    let finished_clone = finished.clone();

    {
      let mut query = Query::new(move || {
        let finished = finished_clone.clone();
        async move {
          tokio::time::sleep(Duration::from_millis(30)).await;
          finished.fetch_add(1, Ordering::SeqCst);
          Ok::<_, String>(())
        }
      });
      query.fetch();
    }

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
  }
}
