//! Reactor timers.
//!
//! A sleep is one more suspension bridge: the reactor keeps the deadline in
//! its timer heap and runs the completion on the first turn past it.
//!
//! ```ignore
//! use reactor_echo::time::sleep;
//! use std::time::Duration;
//!
//! async fn wait() {
//!     sleep(Duration::from_millis(100)).await;
//! }
//! ```

use crate::runtime::Handle;

use std::time::{Duration, Instant};

/// Suspends the current task for at least `duration`.
///
/// Always suspends at least once, even for a zero duration.
///
/// # Panics
/// Panics when polled outside of a running runtime.
pub async fn sleep(duration: Duration) {
    sleep_until(Instant::now() + duration).await;
}

/// Suspends the current task until `deadline` has passed.
pub async fn sleep_until(deadline: Instant) {
    Handle::current().timer(deadline).await;
}
