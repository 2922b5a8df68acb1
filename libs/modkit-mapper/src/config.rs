//! Mapper configuration, loaded from the `mapper` section of a figment.
//!
//! ```yaml
//! mapper:
//!   cache:
//!     enabled: true
//!   unbound_policy: warn
//! ```

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// What to do with destination fields the resolver could not bind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnboundPolicy {
    /// Leave them at their default values without a trace.
    #[default]
    Ignore,
    /// Leave them at their defaults and log the non-nullable ones once per build.
    Warn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    pub cache: CacheConfig,
    pub unbound_policy: UnboundPolicy,
}

impl MapperConfig {
    pub const SECTION: &'static str = "mapper";

    /// Read the `mapper` section; a missing section yields the defaults.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` when the section exists but does not
    /// deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(Self::SECTION) {
            return Ok(Self::default());
        }
        Ok(figment.extract_inner(Self::SECTION)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use figment::providers::Serialized;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_section_yields_defaults() {
        let figment = Figment::new().merge(Serialized::defaults(json!({ "other": {} })));

        let config = MapperConfig::from_figment(&figment).unwrap();

        assert_eq!(config, MapperConfig::default());
        assert!(config.cache.enabled);
        assert_eq!(config.unbound_policy, UnboundPolicy::Ignore);
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "mapper": { "unbound_policy": "warn" }
        })));

        let config = MapperConfig::from_figment(&figment).unwrap();

        assert!(config.cache.enabled);
        assert_eq!(config.unbound_policy, UnboundPolicy::Warn);
    }

    #[test]
    fn cache_can_be_disabled() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "mapper": { "cache": { "enabled": false } }
        })));

        let config = MapperConfig::from_figment(&figment).unwrap();

        assert!(!config.cache.enabled);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "mapper": { "unbound_policy": "explode" }
        })));

        let err = MapperConfig::from_figment(&figment).unwrap_err();

        assert!(err.to_string().contains("invalid mapper configuration"));
    }
}
