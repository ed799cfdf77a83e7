use crate::error::{EngineError, Result};

/// Default outbound queue capacity, in messages.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 4;

/// Default inbound queue capacity, in messages.
pub const DEFAULT_RECV_QUEUE_CAPACITY: usize = 4;

/// Engine behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name used for worker threads and log fields.
    pub name: String,
    /// Outbound queue capacity. Must be non-zero.
    pub send_queue_capacity: usize,
    /// Inbound queue capacity. Must be non-zero.
    pub recv_queue_capacity: usize,
    /// Initial acquisition state. Off unless the peer (or caller) enables it.
    pub acquisition: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "svvis".to_string(),
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
            recv_queue_capacity: DEFAULT_RECV_QUEUE_CAPACITY,
            acquisition: false,
        }
    }
}

impl EngineConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = capacity;
        self
    }

    pub fn with_recv_queue_capacity(mut self, capacity: usize) -> Self {
        self.recv_queue_capacity = capacity;
        self
    }

    /// Start with acquisition already enabled.
    pub fn with_acquisition(mut self, enabled: bool) -> Self {
        self.acquisition = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.send_queue_capacity == 0 {
            return Err(EngineError::InvalidConfig("send queue capacity must be non-zero"));
        }
        if self.recv_queue_capacity == 0 {
            return Err(EngineError::InvalidConfig("receive queue capacity must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_firmware() {
        let config = EngineConfig::default();
        assert_eq!(config.send_queue_capacity, 4);
        assert_eq!(config.recv_queue_capacity, 4);
        assert!(!config.acquisition);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = EngineConfig::default()
            .with_send_queue_capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::default()
            .with_recv_queue_capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::default()
            .with_name("vehicle")
            .with_send_queue_capacity(16)
            .with_recv_queue_capacity(8)
            .with_acquisition(true);
        assert_eq!(config.name, "vehicle");
        assert_eq!(config.send_queue_capacity, 16);
        assert_eq!(config.recv_queue_capacity, 8);
        assert!(config.acquisition);
    }
}
