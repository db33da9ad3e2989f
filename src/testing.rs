//! Helpers shared by the async test suites.

/// Lets spawned listener tasks drain whatever is queued for them.
///
/// The test runtime is single-threaded, so yielding hands control to every
/// ready task in turn.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
