//! Chunking and pacing helpers for rate-limited upstream APIs.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{RankingError, Result};

/// Split `items` into consecutive chunks of at most `size` elements.
///
/// The last chunk may be shorter. A `size` of zero is an error.
pub fn get_batches<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(RankingError::InvalidArgument(
            "batch size must be greater than zero".into(),
        ));
    }
    Ok(items.chunks(size).map(|c| c.to_vec()).collect())
}

/// Run `handler` over `batches` strictly one after another, sleeping
/// `pause` between consecutive batches.
///
/// `on_batch` sees each batch's output as soon as it is available. The first
/// handler error stops the sequence; outputs already delivered stay delivered.
pub async fn run_sequential<T, R, F, Fut, P>(
    batches: Vec<Vec<T>>,
    pause: Duration,
    mut handler: F,
    mut on_batch: P,
) -> Result<()>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<R>>,
    P: FnMut(usize, R),
{
    let count = batches.len();
    for (idx, batch) in batches.into_iter().enumerate() {
        debug!(batch = idx + 1, of = count, size = batch.len(), "Processing batch");
        let out = handler(batch).await?;
        on_batch(idx, out);
        if idx + 1 < count && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    Ok(())
}

/// Keeps a minimum spacing between consecutive calls to [`wait`](Self::wait).
#[derive(Debug)]
pub struct Pacer {
    gap: Duration,
    last: Mutex<Option<Instant>>,
    name: String,
}

impl Pacer {
    /// Allow at most `per_second` calls per second (floored at 0.1/s).
    pub fn per_second(name: impl Into<String>, per_second: f64) -> Self {
        Self {
            gap: Duration::from_secs_f64(1.0 / per_second.max(0.1)),
            last: Mutex::new(None),
            name: name.into(),
        }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Sleep until at least `gap` has passed since the previous call returned.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.gap;
            let now = Instant::now();
            if ready_at > now {
                debug!(pacer = %self.name, wait_ms = (ready_at - now).as_millis() as u64, "Pacing request");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
