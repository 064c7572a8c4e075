//! Service-wide settings.

use roomkit_registry::RegistrySettings;
use roomkit_room::RoomSettings;
use serde::{Deserialize, Serialize};

/// Every tunable of a [`Roomkit`](crate::Roomkit) service in one value,
/// so it can be loaded from a config file.
///
/// Missing sections fall back to their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomkitSettings {
    pub rooms: RoomSettings,
    pub registry: RegistrySettings,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_roomkit_settings_default_uses_layer_defaults() {
        let settings = RoomkitSettings::default();
        assert_eq!(settings.rooms, RoomSettings::default());
        assert_eq!(settings.registry, RegistrySettings::default());
    }

    #[test]
    fn test_roomkit_settings_missing_sections_use_defaults() {
        let json = r#"{ "registry": { "call_timeout": { "secs": 1, "nanos": 0 }, "channel_size": 8 } }"#;
        let settings: RoomkitSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.rooms, RoomSettings::default());
        assert_eq!(settings.registry.call_timeout, Duration::from_secs(1));
        assert_eq!(settings.registry.channel_size, 8);
    }

    #[test]
    fn test_roomkit_settings_json_round_trip() {
        let settings = RoomkitSettings {
            rooms: RoomSettings {
                channel_size: 4,
                ..RoomSettings::default()
            },
            ..RoomkitSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: RoomkitSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
