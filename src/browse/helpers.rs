//! Helpers shared by the browse loop and the tasks it spawns.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Wraps a future to catch panics and convert them to errors.
///
/// A panic inside a spawned fetch would otherwise end the task silently and
/// leave whatever was waiting on it (a cache ticket, a detail panel) stuck.
/// With this wrapper the task can still report back.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
///
/// # Example
///
/// ```ignore
/// tokio::spawn(async move {
///     match catch_task_panic(async { catalog.search(&query).await }).await {
///         Ok(results) => { /* send SearchCompleted */ }
///         Err(panic_msg) => {
///             let _ = tx.send(AppEvent::TaskPanicked { task: "search", error: panic_msg }).await;
///         }
///     }
/// });
/// ```
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic payload".to_string()
            }
        })
}

/// Terminal width in columns, from `$COLUMNS`, else 80.
pub fn terminal_width() -> usize {
    width_from(std::env::var("COLUMNS").ok().as_deref())
}

fn width_from(columns: Option<&str>) -> usize {
    columns
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|&w| w >= 20)
        .unwrap_or(80)
}
