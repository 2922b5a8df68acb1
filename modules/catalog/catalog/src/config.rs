//! Configuration for the catalog module.

use figment::Figment;
use modkit_mapper::{ConfigError, MapperConfig};
use serde::{Deserialize, Serialize};

/// How product scores are turned into whole numbers for ranking views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRounding {
    /// Nearest integer, midpoints away from zero.
    #[default]
    Round,
    Floor,
    Ceil,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CatalogConfig {
    /// Settings of the mapping engines owned by the catalog.
    pub mapper: MapperConfig,
    pub score_rounding: ScoreRounding,
}

impl CatalogConfig {
    pub const SECTION: &'static str = "catalog";

    /// Read the `catalog` section; a missing section yields the defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` when the section does not deserialize.
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
    use modkit_mapper::UnboundPolicy;
    use serde_json::json;

    use super::*;

    #[test]
    fn default_config() {
        let cfg = CatalogConfig::default();
        assert_eq!(cfg.score_rounding, ScoreRounding::Round);
        assert!(cfg.mapper.cache.enabled);
    }

    #[test]
    fn nested_mapper_section() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "catalog": {
                "score_rounding": "floor",
                "mapper": { "unbound_policy": "warn" }
            }
        })));

        let cfg = CatalogConfig::from_figment(&figment).unwrap();

        assert_eq!(cfg.score_rounding, ScoreRounding::Floor);
        assert_eq!(cfg.mapper.unbound_policy, UnboundPolicy::Warn);
        assert!(cfg.mapper.cache.enabled);
    }

    #[test]
    fn unknown_key_rejected() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "catalog": { "rounding": "floor" }
        })));

        assert!(CatalogConfig::from_figment(&figment).is_err());
    }
}
