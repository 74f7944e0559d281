//! Configuration validation and persistence
//!
//! Binary configs use postcard (for flash), text configs use TOML. Keys
//! missing from a TOML file keep their factory defaults:
//!
//! ```toml
//! send_id = 0x1A4
//! default_page = "telephone"
//! glyph_policy = { replace = 45 }
//!
//! [timing.init]
//! post_delay_ms = 30
//! ```

use agwlink_hal::can::MAX_STANDARD_ID;

use super::types::ClusterConfig;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// CAN id out of the 11-bit range, or send and receive ids collide
    InvalidId,
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// TOML parsing failed
    TomlParse,
}

impl ClusterConfig {
    /// Check the configuration before it is used on a bus
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_id > MAX_STANDARD_ID
            || self.receive_id > MAX_STANDARD_ID
            || self.send_id == self.receive_id
        {
            return Err(ConfigError::InvalidId);
        }
        Ok(())
    }

    /// Serialize into `buffer` as postcard binary, returning the used part
    #[cfg(feature = "serde")]
    pub fn to_postcard<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Load a postcard binary config
    #[cfg(feature = "serde")]
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config
    #[cfg(feature = "toml")]
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("TOML parse error: {}", defmt::Display2Format(&_e));
            ConfigError::TomlParse
        })?;
        config.validate()?;
        Ok(config)
    }
}
