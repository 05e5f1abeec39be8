//! Fluent builder for Runtime construction.

use crate::error::Result;
use crate::runtime::Runtime;

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Builder for constructing [`Runtime`] instances with a fluent API.
///
/// # Example
/// ```ignore
/// let rt = RuntimeBuilder::new().event_capacity(256).build()?;
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    event_capacity: usize,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Maximum number of readiness events collected per reactor turn.
    /// Values below 1 are raised to 1.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Creates the poller and wake-up pipe and returns the runtime.
    ///
    /// # Errors
    /// [`Error::Poller`](crate::Error::Poller) if the OS refuses either.
    pub fn build(self) -> Result<Runtime> {
        Runtime::with_capacity(self.event_capacity)
    }
}
