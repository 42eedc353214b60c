//! Run configuration and cache-key derivation
//!
//! A [`RunConfig`] is the immutable set of parameters that fully
//! determines one trainer invocation. Absent fields mean "use the
//! trainer's own default" and are never passed on the command line.
//!
//! ## Canonical serialization
//!
//! Cache addressing requires a stable fingerprint: the canonical
//! encoding is JSON with every field emitted in declaration order,
//! absent fields included as `null`. Two logically equal configs built
//! via different code paths therefore always encode identically, and
//! field-assignment order never affects the [`CacheKey`].

use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::{Error, Result};

/// The trainer's own default hyperparameters, for display and
/// reference only. The invocation adapter never passes absent fields;
/// the trainer applies these on its side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerDefaults {
    /// Default number of training generations
    pub num_generations: u32,
    /// Default episodes played per generation
    pub num_episodes_per_gen: u32,
    /// Default learning rate
    pub learning_rate: f64,
    /// Default discount factor
    pub discount_factor: f64,
    /// Default exploration rate
    pub explore_rate: f64,
}

/// Defaults documented by the external trainer.
pub const TRAINER_DEFAULTS: TrainerDefaults = TrainerDefaults {
    num_generations: 100,
    num_episodes_per_gen: 1000,
    learning_rate: 0.5,
    discount_factor: 0.9,
    explore_rate: 0.1,
};

/// Immutable parameter set defining one trainer invocation.
///
/// Construct via [`RunConfig::builder`]. Every field is optional;
/// `None` defers to the trainer's default (see [`TRAINER_DEFAULTS`]).
///
/// Field declaration order is the canonical serialization order;
/// do not reorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of training generations
    pub num_generations: Option<u32>,
    /// Episodes played per generation
    pub num_episodes_per_gen: Option<u32>,
    /// Learning rate
    pub learning_rate: Option<f64>,
    /// Discount factor
    pub discount_factor: Option<f64>,
    /// Exploration rate
    pub explore_rate: Option<f64>,
}

impl RunConfig {
    /// Create a builder with every field absent.
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Canonical JSON encoding: declaration-order fields, absent
    /// fields emitted as `null`.
    ///
    /// Stable across repeated calls and across builder assignment
    /// order; this is the sole input to [`CacheKey::of`].
    #[must_use]
    pub fn canonical_json(&self) -> String {
        // Serialization of this struct cannot fail: no maps, no
        // non-string keys, no NaN-producing types at the serde layer.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The present (non-default) fields as `(flag_name, value_text)`
    /// pairs, in declaration order. This is exactly what the
    /// invocation adapter passes on the trainer command line.
    #[must_use]
    pub fn present_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(v) = self.num_generations {
            fields.push(("num_generations", v.to_string()));
        }
        if let Some(v) = self.num_episodes_per_gen {
            fields.push(("num_episodes_per_gen", v.to_string()));
        }
        if let Some(v) = self.learning_rate {
            fields.push(("learning_rate", v.to_string()));
        }
        if let Some(v) = self.discount_factor {
            fields.push(("discount_factor", v.to_string()));
        }
        if let Some(v) = self.explore_rate {
            fields.push(("explore_rate", v.to_string()));
        }
        fields
    }

    /// A copy of this config with exactly one field overridden.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the value kind does not match
    /// the parameter (the count parameters take [`ParamValue::Int`],
    /// the rate parameters take [`ParamValue::Float`]).
    pub fn with_param(&self, param: SweepParam, value: ParamValue) -> Result<Self> {
        let mut config = self.clone();
        match (param, value) {
            (SweepParam::NumGenerations, ParamValue::Int(v)) => {
                config.num_generations = Some(v);
            }
            (SweepParam::NumEpisodesPerGen, ParamValue::Int(v)) => {
                config.num_episodes_per_gen = Some(v);
            }
            (SweepParam::LearningRate, ParamValue::Float(v)) => {
                config.learning_rate = Some(v);
            }
            (SweepParam::DiscountFactor, ParamValue::Float(v)) => {
                config.discount_factor = Some(v);
            }
            (SweepParam::ExploreRate, ParamValue::Float(v)) => {
                config.explore_rate = Some(v);
            }
            (param, value) => {
                return Err(Error::InvalidInput(format!(
                    "parameter `{param}` cannot take value `{value}`"
                )));
            }
        }
        Ok(config)
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Set the number of training generations.
    #[must_use]
    pub const fn num_generations(mut self, v: u32) -> Self {
        self.config.num_generations = Some(v);
        self
    }

    /// Set the episodes played per generation.
    #[must_use]
    pub const fn num_episodes_per_gen(mut self, v: u32) -> Self {
        self.config.num_episodes_per_gen = Some(v);
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub const fn learning_rate(mut self, v: f64) -> Self {
        self.config.learning_rate = Some(v);
        self
    }

    /// Set the discount factor.
    #[must_use]
    pub const fn discount_factor(mut self, v: f64) -> Self {
        self.config.discount_factor = Some(v);
        self
    }

    /// Set the exploration rate.
    #[must_use]
    pub const fn explore_rate(mut self, v: f64) -> Self {
        self.config.explore_rate = Some(v);
        self
    }

    /// Build the [`RunConfig`].
    #[must_use]
    pub fn build(self) -> RunConfig {
        self.config
    }
}

/// Deterministic fingerprint of a [`RunConfig`], used to address
/// cached result files.
///
/// XxHash64 over the canonical JSON encoding: identical config ⇒
/// identical key; any field change ⇒ a different key with negligible
/// collision probability (fast content hash, not cryptographic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Derive the key for a config.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sweeplab::config::{CacheKey, RunConfig};
    ///
    /// let a = RunConfig::builder().explore_rate(0.1).num_generations(20).build();
    /// let b = RunConfig::builder().num_generations(20).explore_rate(0.1).build();
    /// assert_eq!(CacheKey::of(&a), CacheKey::of(&b));
    /// ```
    #[must_use]
    pub fn of(config: &RunConfig) -> Self {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(config.canonical_json().as_bytes());
        Self(hasher.finish())
    }

    /// The raw 64-bit hash value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The configuration fields a sweep may vary, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParam {
    /// `num_generations`
    NumGenerations,
    /// `num_episodes_per_gen`
    NumEpisodesPerGen,
    /// `learning_rate`
    LearningRate,
    /// `discount_factor`
    DiscountFactor,
    /// `explore_rate`
    ExploreRate,
}

impl SweepParam {
    /// The field name, as used for the trainer flag and the sweep
    /// label column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NumGenerations => "num_generations",
            Self::NumEpisodesPerGen => "num_episodes_per_gen",
            Self::LearningRate => "learning_rate",
            Self::DiscountFactor => "discount_factor",
            Self::ExploreRate => "explore_rate",
        }
    }
}

impl fmt::Display for SweepParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value for a swept parameter.
///
/// The `Display` text is what lands in the sweep label column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// A count parameter value
    Int(u32),
    /// A rate parameter value
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_includes_absent_fields() {
        let config = RunConfig::builder().explore_rate(0.1).build();
        let json = config.canonical_json();
        assert!(json.contains("\"num_generations\":null"));
        assert!(json.contains("\"explore_rate\":0.1"));
    }

    #[test]
    fn test_canonical_json_stable_across_calls() {
        let config = RunConfig::builder()
            .num_generations(50)
            .learning_rate(0.25)
            .build();
        assert_eq!(config.canonical_json(), config.canonical_json());
    }

    #[test]
    fn test_cache_key_independent_of_assignment_order() {
        let a = RunConfig::builder()
            .learning_rate(0.5)
            .num_generations(10)
            .build();
        let b = RunConfig::builder()
            .num_generations(10)
            .learning_rate(0.5)
            .build();
        assert_eq!(CacheKey::of(&a), CacheKey::of(&b));
    }

    #[test]
    fn test_cache_key_changes_with_any_field() {
        let base = RunConfig::builder().num_generations(10).build();
        let changed = RunConfig::builder().num_generations(11).build();
        let extended = RunConfig::builder()
            .num_generations(10)
            .explore_rate(0.1)
            .build();
        assert_ne!(CacheKey::of(&base), CacheKey::of(&changed));
        assert_ne!(CacheKey::of(&base), CacheKey::of(&extended));
    }

    #[test]
    fn test_cache_key_display_is_16_hex_digits() {
        let key = CacheKey::of(&RunConfig::default());
        let text = key.to_string();
        assert_eq!(text.len(), 16);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_present_fields_skips_absent() {
        let config = RunConfig::builder()
            .num_generations(20)
            .explore_rate(0.1)
            .build();
        let fields = config.present_fields();
        assert_eq!(
            fields,
            vec![
                ("num_generations", "20".to_string()),
                ("explore_rate", "0.1".to_string()),
            ]
        );
    }

    #[test]
    fn test_with_param_overrides_single_field() {
        let base = RunConfig::builder().num_generations(10).build();
        let derived = base
            .with_param(SweepParam::ExploreRate, ParamValue::Float(0.5))
            .unwrap();
        assert_eq!(derived.explore_rate, Some(0.5));
        assert_eq!(derived.num_generations, Some(10));
        // base untouched
        assert_eq!(base.explore_rate, None);
    }

    #[test]
    fn test_with_param_rejects_kind_mismatch() {
        let base = RunConfig::default();
        let err = base
            .with_param(SweepParam::ExploreRate, ParamValue::Int(3))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_param_value_label_text() {
        assert_eq!(ParamValue::Float(0.1).to_string(), "0.1");
        assert_eq!(ParamValue::Int(500).to_string(), "500");
    }
}
