//! Parallel fan-out with index-aligned fan-in
//!
//! Every job runs as its own tokio task. All jobs run to completion; a
//! failing job never cancels its siblings. Results land in slots matching
//! the position of the job, and the error of the job that failed first in
//! time is kept.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinError;

use kf_core::error::JobCancelled;

/// Outcome of a fan-out
pub struct Gathered<T, E> {
    /// Successful results, aligned with the job order
    pub slots: Vec<Option<T>>,
    /// Error of the first job to fail
    pub first_error: Option<E>,
}

impl<T, E> Gathered<T, E> {
    /// All results in job order, or the first error
    pub fn into_result(self) -> Result<Vec<T>, E> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.slots.into_iter().flatten().collect()),
        }
    }
}

/// Run every job concurrently and wait for all of them.
///
/// A job whose task is cancelled (only possible while the runtime shuts
/// down) counts as failed with [`JobCancelled`]. A job that panics
/// propagates the panic to the caller.
pub async fn fan_out<T, E, Fut, I>(jobs: I) -> Gathered<T, E>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<JobCancelled> + Send + 'static,
{
    let mut pending: FuturesUnordered<_> = jobs
        .into_iter()
        .enumerate()
        .map(|(index, job)| {
            let task = tokio::spawn(job);
            async move { (index, task.await) }
        })
        .collect();

    let mut slots: Vec<Option<T>> = (0..pending.len()).map(|_| None).collect();
    let mut first_error = None;

    while let Some((index, joined)) = pending.next().await {
        match settle(index, joined) {
            Ok(value) => slots[index] = Some(value),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    Gathered { slots, first_error }
}

/// Outcome of one joined job task
fn settle<T, E>(index: usize, joined: Result<Result<T, E>, JoinError>) -> Result<T, E>
where
    E: From<JobCancelled>,
{
    match joined {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
        Err(join_err) => {
            tracing::warn!("Setup job #{} did not finish: {}", index, join_err);
            Err(JobCancelled { index }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum JobError {
        Failed(String),
        Delay(u64),
        Cancelled(usize),
    }

    impl From<JobCancelled> for JobError {
        fn from(err: JobCancelled) -> Self {
            JobError::Cancelled(err.index)
        }
    }

    #[tokio::test]
    async fn test_results_follow_job_order() {
        // Later jobs finish first
        let jobs = (0..5u64).map(|i| async move {
            tokio::time::sleep(Duration::from_millis(50 - i * 10)).await;
            Ok::<_, JobError>(i)
        });

        let values = fan_out(jobs).await.into_result().unwrap();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));

        let jobs = (0..4u64).map(|i| {
            let finished = Arc::clone(&finished);
            async move {
                if i == 0 {
                    return Err(JobError::Failed(format!("job {} failed", i)));
                }
                tokio::time::sleep(Duration::from_millis(20 * i)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(i)
            }
        });

        let gathered = fan_out(jobs).await;
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(gathered.slots.iter().flatten().count(), 3);
        assert_eq!(
            gathered.into_result().unwrap_err(),
            JobError::Failed("job 0 failed".into())
        );
    }

    #[tokio::test]
    async fn test_first_error_in_time_wins() {
        let jobs = [30u64, 10].into_iter().map(|delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Err::<(), _>(JobError::Delay(delay))
        });

        assert_eq!(
            fan_out(jobs).await.into_result().unwrap_err(),
            JobError::Delay(10)
        );
    }

    #[tokio::test]
    async fn test_empty_fan_out() {
        let jobs: Vec<std::future::Ready<Result<u8, JobError>>> = Vec::new();
        assert!(fan_out(jobs).await.into_result().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_job_is_an_error() {
        let task = tokio::spawn(std::future::pending::<Result<u8, JobError>>());
        task.abort();
        let joined = task.await;
        assert!(joined.as_ref().unwrap_err().is_cancelled());

        assert_eq!(settle(3, joined), Err(JobError::Cancelled(3)));
    }

    #[tokio::test]
    async fn test_settle_passes_results_through() {
        let ok = tokio::spawn(async { Ok::<u8, JobError>(7) }).await;
        assert_eq!(settle(0, ok), Ok(7));

        let failed = tokio::spawn(async { Err::<u8, _>(JobError::Delay(1)) }).await;
        assert_eq!(settle(0, failed), Err(JobError::Delay(1)));
    }
}
