//! Registry configuration

/// Default per-subscriber queue depth
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Configuration for the subscription registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Events queued per subscriber before it is considered lagging and evicted
    pub subscriber_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber queue depth (minimum 1)
    pub fn subscriber_buffer(mut self, size: usize) -> Self {
        self.subscriber_buffer = size.max(1);
        self
    }
}
