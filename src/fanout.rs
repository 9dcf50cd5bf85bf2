use anyhow::Result;
use futures::future::{join_all, try_join_all};
use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Runs every task concurrently and returns their outputs in input order.
/// The first failure fails the whole group.
pub async fn all_or_nothing<I, F, T>(tasks: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    try_join_all(tasks).await
}

/// Runs every labelled task concurrently and returns one `Option` per task in
/// input order. A failed task is logged and reported as `None`; it never
/// affects the other tasks.
pub async fn best_effort<I, L, F, T>(what: &str, tasks: I) -> Vec<Option<T>>
where
    I: IntoIterator<Item = (L, F)>,
    L: Display,
    F: Future<Output = Result<T>>,
{
    join_all(tasks.into_iter().map(|(label, task)| async move {
        match task.await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Error fetching {} for {}: {:#}", what, label, e);
                None
            }
        }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tokio::time::{Duration, sleep};

    #[tokio::test]
    async fn all_or_nothing_keeps_input_order() {
        let tasks = [30u64, 10, 20].map(|delay| async move {
            sleep(Duration::from_millis(delay)).await;
            Ok(delay)
        });
        assert_eq!(all_or_nothing(tasks).await.unwrap(), vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn all_or_nothing_fails_on_any_error() {
        let tasks = [1u64, 2, 3].map(|n| async move {
            if n == 2 {
                Err(anyhow!("block {n} unavailable"))
            } else {
                Ok(n)
            }
        });
        let err = all_or_nothing(tasks).await.unwrap_err();
        assert!(err.to_string().contains("block 2"));
    }

    #[tokio::test]
    async fn best_effort_isolates_failures() {
        let tasks = ["a", "b", "c"].map(|label| {
            (label, async move {
                if label == "b" {
                    Err(anyhow!("metadata unavailable"))
                } else {
                    Ok(label.to_uppercase())
                }
            })
        });
        let results = best_effort("token info", tasks).await;
        assert_eq!(
            results,
            vec![Some("A".to_string()), None, Some("C".to_string())]
        );
    }
}
