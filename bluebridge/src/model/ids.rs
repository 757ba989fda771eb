//! Identifier newtypes for devices, services and characteristics.

use serde::Serialize;

/// Unique identifier for a peripheral (platform address or UUID string).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create a new device ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the device ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower-cases and trims a GATT UUID string so `180D` and `180d` compare equal.
fn normalize_uuid(uuid: &str) -> String {
    uuid.trim().to_ascii_lowercase()
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID, normalizing the UUID string.
            pub fn new(uuid: impl AsRef<str>) -> Self {
                Self(normalize_uuid(uuid.as_ref()))
            }

            /// Get the normalized UUID string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(uuid: &str) -> Self {
                Self::new(uuid)
            }
        }

        impl From<String> for $name {
            fn from(uuid: String) -> Self {
                Self::new(uuid)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// GATT service UUID.
    ServiceId
);

uuid_id!(
    /// GATT characteristic UUID.
    CharacteristicId
);
