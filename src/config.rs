//! Processor configuration.

/// Settings that shape how a processor answers messages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessorConfig {
    /// Put diagnostic reasons into `error.data` of standard error responses
    pub expose_error_details: bool,

    /// Largest accepted batch; `None` means unlimited
    pub max_batch_size: Option<usize>,
}

impl ProcessorConfig {
    /// Create a new builder with defaults
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Check a batch length against the configured limit
    pub fn batch_within_limit(&self, len: usize) -> bool {
        self.max_batch_size.is_none_or(|max| len <= max)
    }
}

/// Builder for [`ProcessorConfig`]
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable diagnostic `data` on standard errors
    pub fn expose_error_details(mut self, enabled: bool) -> Self {
        self.config.expose_error_details = enabled;
        self
    }

    /// Limit the number of requests in one batch
    pub fn max_batch_size(mut self, max: usize) -> Self {
        self.config.max_batch_size = Some(max);
        self
    }

    /// Remove the batch size limit
    pub fn unlimited_batch_size(mut self) -> Self {
        self.config.max_batch_size = None;
        self
    }

    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert!(!config.expose_error_details);
        assert_eq!(config.max_batch_size, None);
        assert!(config.batch_within_limit(usize::MAX));
        assert_eq!(ProcessorConfig::builder().build(), config);
    }

    #[test]
    fn test_builder() {
        let config = ProcessorConfig::builder()
            .expose_error_details(true)
            .max_batch_size(2)
            .build();
        assert!(config.expose_error_details);
        assert!(config.batch_within_limit(2));
        assert!(!config.batch_within_limit(3));

        let config = ProcessorConfig::builder()
            .max_batch_size(2)
            .unlimited_batch_size()
            .build();
        assert_eq!(config.max_batch_size, None);
    }
}
