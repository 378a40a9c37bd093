use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs only the last of a burst of calls, once `delay` has passed without a
/// newer one. Earlier tasks still wake up but see a newer generation and
/// return without running, so nothing is ever aborted mid-flight.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Must be called from within a tokio runtime.
    pub fn call<F, Fut>(&self, action: F) -> tokio::task::JoinHandle<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            action().await;
            true
        })
    }

    /// Drops whatever call is pending.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_runs() {
        let debouncer = Debouncer::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for value in ["s", "su", "sun"] {
            let seen = seen.clone();
            handles.push(debouncer.call(move || async move {
                seen.lock().unwrap().push(value);
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut ran = Vec::new();
        for handle in handles {
            ran.push(handle.await.unwrap());
        }

        assert_eq!(ran, vec![false, false, true]);
        assert_eq!(*seen.lock().unwrap(), vec!["sun"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_spaced_beyond_delay_all_run() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let count = Arc::new(AtomicU64::new(0));

        for _ in 0..2 {
            let count = count.clone();
            let handle = debouncer.call(move || async move {
                count.fetch_add(1, Ordering::SeqCst);
            });
            assert!(handle.await.unwrap());
        }

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let debouncer = Debouncer::default();
        let handle = debouncer.call(|| async {});
        debouncer.cancel();
        assert!(!handle.await.unwrap());
    }
}
