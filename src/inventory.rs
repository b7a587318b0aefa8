//! Device inventory
//!
//! Resolves the logical input roles (touchscreen, touchpad, trackpoint,
//! stylus) to concrete xinput device names by looking for known vendor
//! keywords in the `xinput --list` dump. A role with no matching keyword is
//! simply absent; every operation on an absent role is a no-op.

use crate::config::DevicesConfig;
use crate::device::DeviceControl;
use crate::error::InventoryError;
use std::collections::BTreeMap;
use std::fmt;

/// Logical input device role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Touchscreen,
    Touchpad,
    /// The pointing stick ("nipple")
    Trackpoint,
    Stylus,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Touchscreen,
        Role::Touchpad,
        Role::Trackpoint,
        Role::Stylus,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Touchscreen => "touchscreen",
            Role::Touchpad => "touchpad",
            Role::Trackpoint => "trackpoint",
            Role::Stylus => "stylus",
        };
        f.write_str(name)
    }
}

/// Resolved role → device name mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMap {
    devices: BTreeMap<Role, String>,
}

impl DeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and by [`resolve_listing`]
    pub fn with(mut self, role: Role, name: impl Into<String>) -> Self {
        self.devices.insert(role, name.into());
        self
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.devices.get(&role).map(String::as_str)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.devices.contains_key(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Match a device listing against the keyword table.
///
/// Keywords are tried in configured order; the first one found as a
/// substring of the listing wins for that role.
pub fn resolve_listing(listing: &str, table: &DevicesConfig) -> DeviceMap {
    let mut map = DeviceMap::new();
    for role in Role::ALL {
        if let Some(keyword) = table
            .keywords(role)
            .iter()
            .find(|keyword| listing.contains(keyword.as_str()))
        {
            map = map.with(role, keyword.clone());
        }
    }
    map
}

/// Query the input subsystem once and resolve every role
pub async fn resolve(
    control: &dyn DeviceControl,
    table: &DevicesConfig,
) -> Result<DeviceMap, InventoryError> {
    tracing::info!("Auditing input devices");
    let listing = control
        .list_devices()
        .await
        .map_err(|e| InventoryError::Unavailable(e.to_string()))?;

    let map = resolve_listing(&listing, table);
    for role in Role::ALL {
        match map.get(role) {
            Some(name) => tracing::info!("Input {} detected as {:?}", role, name),
            None => tracing::info!("Input {} not detected", role),
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
⎡ Virtual core pointer                    \tid=2\t[master pointer  (3)]
⎜   ↳ Virtual core XTEST pointer              \tid=4\t[slave  pointer  (2)]
⎜   ↳ Wacom ISDv4 EC Pen stylus               \tid=10\t[slave  pointer  (2)]
⎜   ↳ SynPS/2 Synaptics TouchPad              \tid=12\t[slave  pointer  (2)]
⎜   ↳ TPPS/2 IBM TrackPoint                   \tid=13\t[slave  pointer  (2)]
⎜   ↳ ELAN Touchscreen                        \tid=11\t[slave  pointer  (2)]
⎣ Virtual core keyboard                   \tid=3\t[master keyboard (2)]
";

    #[test]
    fn test_resolve_listing_all_roles() {
        let map = resolve_listing(LISTING, &DevicesConfig::default());
        assert_eq!(map.get(Role::Touchscreen), Some("ELAN Touchscreen"));
        assert_eq!(map.get(Role::Touchpad), Some("SynPS/2 Synaptics TouchPad"));
        assert_eq!(map.get(Role::Trackpoint), Some("TPPS/2 IBM TrackPoint"));
        assert_eq!(map.get(Role::Stylus), Some("Wacom ISDv4 EC Pen stylus"));
    }

    #[test]
    fn test_missing_role_is_absent() {
        let listing = "⎜   ↳ ELAN Touchscreen   id=11";
        let map = resolve_listing(listing, &DevicesConfig::default());
        assert!(map.contains(Role::Touchscreen));
        assert!(!map.contains(Role::Trackpoint));
        assert_eq!(map.get(Role::Stylus), None);
    }

    #[test]
    fn test_first_keyword_wins() {
        let table = DevicesConfig {
            touchscreen: vec!["Digitizer".to_string(), "Touchscreen".to_string()],
            ..DevicesConfig::default()
        };
        let listing = "ELAN Touchscreen\nGeneric Digitizer";
        let map = resolve_listing(listing, &table);
        assert_eq!(map.get(Role::Touchscreen), Some("Digitizer"));
    }

    #[test]
    fn test_empty_listing() {
        let map = resolve_listing("", &DevicesConfig::default());
        assert!(map.is_empty());
    }
}
