//! Effect chain state
//!
//! The ordered list of active effect ids plus each active effect's
//! parameter values. Ids and parameter entries are added and removed
//! together, so every id in the order has a value map and vice versa.
//!
//! Mutators only touch this struct. GPU resources that depend on chain
//! membership (compiled programs) are reconciled by their owner via
//! `ProgramCache::sync_with_chain`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::registry::EffectRegistry;
use super::types::ParameterValue;

/// Parameter values of one effect, keyed by parameter name
pub type ParameterValues = HashMap<String, ParameterValue>;

/// Ordered set of active effects with their parameter values
///
/// Cloning yields an independent snapshot (used by export).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectChain {
    /// Active effect ids in processing order
    order: Vec<String>,
    /// Parameter values by effect id
    parameters: HashMap<String, ParameterValues>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect, seeding its parameters from the registry defaults
    ///
    /// No-op if the effect is already active or unknown to the registry.
    /// Returns true if the effect was added.
    pub fn add(&mut self, registry: &EffectRegistry, id: &str) -> bool {
        if self.is_active(id) {
            return false;
        }
        let Some(defaults) = registry.default_parameters(id) else {
            tracing::debug!(effect = id, "Ignoring add of unregistered effect");
            return false;
        };

        self.order.push(id.to_string());
        self.parameters.insert(id.to_string(), defaults.into_iter().collect());
        true
    }

    /// Remove an effect and its parameter values. No-op if not active.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.order.iter().position(|e| e == id) else {
            return false;
        };
        self.order.remove(pos);
        self.parameters.remove(id);
        true
    }

    /// Replace the processing order wholesale
    ///
    /// The new order must contain exactly the currently active ids; adding
    /// or dropping effects through a reorder is not supported. Debug builds
    /// assert this.
    pub fn reorder(&mut self, new_order: Vec<String>) {
        debug_assert!(
            self.is_permutation(&new_order),
            "reorder must keep the active set: {:?} -> {:?}",
            self.order,
            new_order
        );
        self.order = new_order;
    }

    /// Check whether `order` holds exactly the active ids
    pub fn is_permutation(&self, order: &[String]) -> bool {
        if order.len() != self.order.len() {
            return false;
        }
        let mut expected: Vec<&str> = self.order.iter().map(String::as_str).collect();
        let mut given: Vec<&str> = order.iter().map(String::as_str).collect();
        expected.sort_unstable();
        given.sort_unstable();
        expected == given
    }

    /// Overwrite one parameter value of an active effect
    ///
    /// No-op if the effect is not active. The value is stored as given;
    /// matching it to the parameter's declared type is the caller's job.
    pub fn set_parameter(&mut self, id: &str, name: &str, value: ParameterValue) -> bool {
        let Some(values) = self.parameters.get_mut(id) else {
            return false;
        };
        values.insert(name.to_string(), value);
        true
    }

    /// Active effect ids in processing order
    pub fn effects(&self) -> &[String] {
        &self.order
    }

    /// Parameter values of an active effect
    pub fn parameters(&self, id: &str) -> Option<&ParameterValues> {
        self.parameters.get(id)
    }

    /// Single parameter value of an active effect
    pub fn parameter(&self, id: &str, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(id).and_then(|values| values.get(name))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.order.iter().any(|e| e == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every effect
    pub fn clear(&mut self) {
        self.order.clear();
        self.parameters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::types::{EffectCategory, EffectDefinition, ParameterDef};

    fn registry() -> EffectRegistry {
        let mut registry = EffectRegistry::new();
        registry.register(
            EffectDefinition::new("rgbShift", "RGB Shift", EffectCategory::Color, "")
                .with_parameter(ParameterDef::float("intensity", "Intensity", 0.5, 0.0, 1.0, 0.01))
                .with_parameter(ParameterDef::float("angle", "Angle", 0.0, 0.0, 6.28, 0.01))
                .with_parameter(ParameterDef::bool("animated", "Animated", false)),
        );
        registry.register(
            EffectDefinition::new("noise", "Noise", EffectCategory::Aesthetic, "")
                .with_parameter(ParameterDef::float("intensity", "Intensity", 0.15, 0.0, 1.0, 0.01)),
        );
        registry.register(EffectDefinition::new("passthrough", "Passthrough", EffectCategory::Color, ""));
        registry
    }

    fn assert_in_sync(chain: &EffectChain) {
        assert_eq!(chain.order.len(), chain.parameters.len());
        for id in &chain.order {
            assert!(chain.parameters.contains_key(id), "{} has no parameter map", id);
        }
    }

    #[test]
    fn test_add_seeds_defaults() {
        let registry = registry();
        let mut chain = EffectChain::new();

        assert!(chain.add(&registry, "rgbShift"));
        let def = registry.get("rgbShift").unwrap();
        for param in &def.parameters {
            assert_eq!(chain.parameter("rgbShift", &param.name), Some(&param.default_value()));
        }
        assert_eq!(chain.parameters("rgbShift").unwrap().len(), def.parameters.len());
        assert_in_sync(&chain);
    }

    #[test]
    fn test_add_effect_without_parameters() {
        let registry = registry();
        let mut chain = EffectChain::new();

        assert!(chain.add(&registry, "passthrough"));
        assert!(chain.parameters("passthrough").unwrap().is_empty());
        assert_in_sync(&chain);
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = registry();
        let mut chain = EffectChain::new();

        chain.add(&registry, "noise");
        chain.set_parameter("noise", "intensity", ParameterValue::Float(0.9));
        assert!(!chain.add(&registry, "noise"));

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.parameter("noise", "intensity"), Some(&ParameterValue::Float(0.9)));
    }

    #[test]
    fn test_add_unknown_is_noop() {
        let registry = registry();
        let mut chain = EffectChain::new();

        assert!(!chain.add(&registry, "doesNotExist"));
        assert!(chain.is_empty());
        assert!(chain.parameters("doesNotExist").is_none());
        assert_in_sync(&chain);
    }

    #[test]
    fn test_add_appends_in_order() {
        let registry = registry();
        let mut chain = EffectChain::new();

        chain.add(&registry, "noise");
        chain.add(&registry, "rgbShift");
        chain.add(&registry, "passthrough");
        assert_eq!(chain.effects(), &["noise", "rgbShift", "passthrough"]);
    }

    #[test]
    fn test_remove() {
        let registry = registry();
        let mut chain = EffectChain::new();

        chain.add(&registry, "noise");
        chain.add(&registry, "rgbShift");
        assert!(chain.remove("noise"));
        assert!(!chain.remove("noise"));

        assert_eq!(chain.effects(), &["rgbShift"]);
        assert!(chain.parameters("noise").is_none());
        assert_in_sync(&chain);
    }

    #[test]
    fn test_reorder() {
        let registry = registry();
        let mut chain = EffectChain::new();

        chain.add(&registry, "noise");
        chain.add(&registry, "rgbShift");
        chain.add(&registry, "passthrough");

        let new_order = vec!["passthrough".to_string(), "noise".to_string(), "rgbShift".to_string()];
        assert!(chain.is_permutation(&new_order));
        chain.reorder(new_order.clone());

        assert_eq!(chain.effects(), new_order.as_slice());
        assert_in_sync(&chain);
    }

    #[test]
    fn test_permutation_check() {
        let registry = registry();
        let mut chain = EffectChain::new();
        chain.add(&registry, "noise");
        chain.add(&registry, "rgbShift");

        assert!(!chain.is_permutation(&["noise".to_string()]));
        assert!(!chain.is_permutation(&["noise".to_string(), "passthrough".to_string()]));
        assert!(!chain.is_permutation(&["noise".to_string(), "noise".to_string()]));
    }

    #[test]
    fn test_set_parameter() {
        let registry = registry();
        let mut chain = EffectChain::new();
        chain.add(&registry, "rgbShift");

        assert!(chain.set_parameter("rgbShift", "angle", ParameterValue::Float(1.5)));
        assert_eq!(chain.parameter("rgbShift", "angle"), Some(&ParameterValue::Float(1.5)));
        // Other values untouched
        assert_eq!(chain.parameter("rgbShift", "intensity"), Some(&ParameterValue::Float(0.5)));

        // Inactive effect
        assert!(!chain.set_parameter("noise", "intensity", ParameterValue::Float(1.0)));
        assert!(chain.parameters("noise").is_none());
        assert_in_sync(&chain);
    }

    #[test]
    fn test_set_parameter_stores_without_coercion() {
        let registry = registry();
        let mut chain = EffectChain::new();
        chain.add(&registry, "rgbShift");

        chain.set_parameter("rgbShift", "intensity", ParameterValue::Bool(true));
        assert_eq!(chain.parameter("rgbShift", "intensity"), Some(&ParameterValue::Bool(true)));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let registry = registry();
        let mut chain = EffectChain::new();
        chain.add(&registry, "noise");

        let snapshot = chain.clone();
        chain.set_parameter("noise", "intensity", ParameterValue::Float(1.0));
        chain.remove("noise");

        assert_eq!(snapshot.effects(), &["noise"]);
        assert_eq!(snapshot.parameter("noise", "intensity"), Some(&ParameterValue::Float(0.15)));
    }
}
