//! Read-only environment facts about the device under test.
//!
//! A platform implements only the queries it truly supports; everything
//! else reports [`Capability::Unsupported`]. A supported query that fails
//! while running returns a [`PlatformError`].

use crate::error::PlatformError;

/// Outcome of an optional platform query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Supported(T),
    Unsupported,
}

impl<T> Capability<T> {
    pub fn supported(self) -> Option<T> {
        match self {
            Self::Supported(v) => Some(v),
            Self::Unsupported => None,
        }
    }
}

pub trait Platform: Send + Sync {
    fn os_name(&self) -> Result<Capability<String>, PlatformError> {
        Ok(Capability::Unsupported)
    }

    fn os_version_name(&self) -> Result<Capability<String>, PlatformError> {
        Ok(Capability::Unsupported)
    }

    fn supports_power_monitoring(&self) -> bool {
        false
    }
}

/// The machine this process runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlatform;

impl Platform for HostPlatform {
    fn os_name(&self) -> Result<Capability<String>, PlatformError> {
        Ok(Capability::Supported(std::env::consts::OS.to_string()))
    }
}
