//! Registry settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the registry task and its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Bound on every registry call, including enqueueing fire-and-forget
    /// requests like `persist`.
    pub call_timeout: Duration,

    /// Mailbox capacity. Callers and liveness monitors wait when it's full.
    pub channel_size: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            channel_size: 256,
        }
    }
}

impl RegistrySettings {
    /// Raises a zero `channel_size` to 1.
    pub fn validated(mut self) -> Self {
        if self.channel_size == 0 {
            tracing::warn!("registry channel_size of 0 raised to 1");
            self.channel_size = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_settings_default() {
        let settings = RegistrySettings::default();
        assert_eq!(settings.call_timeout, Duration::from_secs(5));
        assert_eq!(settings.channel_size, 256);
    }

    #[test]
    fn test_registry_settings_validated_raises_zero_channel_size() {
        let settings = RegistrySettings {
            channel_size: 0,
            ..RegistrySettings::default()
        };
        assert_eq!(settings.validated().channel_size, 1);
    }
}
