//! Effect registry for managing available effects
//!
//! The registry is an explicit object built once at startup and passed by
//! reference to whatever needs lookups (chain state, executor, export).
//! Definitions are looked up by id, never by display name.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{EffectCategory, EffectDefinition, ParameterValue};

/// Registry of available effects
pub struct EffectRegistry {
    /// Effect definitions by id
    effects: HashMap<String, Arc<EffectDefinition>>,
    /// Ids in registration order
    order: Vec<String>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            effects: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register an effect definition
    ///
    /// Re-registering an id replaces the definition but keeps its original
    /// position in the listing order.
    pub fn register(&mut self, definition: EffectDefinition) {
        if let Err(e) = definition.validate() {
            tracing::warn!("Registering effect with invalid schema: {}", e);
        }

        let id = definition.id.clone();
        if self.effects.insert(id.clone(), Arc::new(definition)).is_some() {
            tracing::debug!(effect = %id, "Effect definition replaced");
        } else {
            self.order.push(id);
        }
    }

    /// Get an effect definition by id
    pub fn get(&self, id: &str) -> Option<Arc<EffectDefinition>> {
        self.effects.get(id).cloned()
    }

    /// Check if an effect id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    /// All definitions in registration order
    pub fn effects(&self) -> impl Iterator<Item = &Arc<EffectDefinition>> {
        self.order.iter().filter_map(|id| self.effects.get(id))
    }

    /// Definitions meant for user-facing listings (hidden ones skipped)
    pub fn visible_effects(&self) -> impl Iterator<Item = &Arc<EffectDefinition>> {
        self.effects().filter(|def| !def.hidden)
    }

    /// Get the number of registered effects
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Categories that have at least one effect, in display order
    pub fn categories(&self) -> Vec<EffectCategory> {
        EffectCategory::all()
            .iter()
            .copied()
            .filter(|cat| self.effects().any(|def| def.category == *cat))
            .collect()
    }

    /// Get all effects in a category, in registration order
    pub fn effects_in_category(&self, category: EffectCategory) -> Vec<Arc<EffectDefinition>> {
        self.effects()
            .filter(|def| def.category == category)
            .cloned()
            .collect()
    }

    /// Default parameter values for an effect, in declaration order
    pub fn default_parameters(&self, id: &str) -> Option<Vec<(String, ParameterValue)>> {
        self.effects.get(id).map(|def| {
            def.parameters
                .iter()
                .map(|p| (p.name.clone(), p.default_value()))
                .collect()
        })
    }

    /// Get the display name for an effect id
    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.effects.get(id).map(|def| def.name.as_str())
    }

    /// Get all effects matching a filter
    pub fn search(&self, query: &str) -> Vec<Arc<EffectDefinition>> {
        let query_lower = query.to_lowercase();
        self.effects()
            .filter(|def| {
                def.name.to_lowercase().contains(&query_lower)
                    || def.id.to_lowercase().contains(&query_lower)
                    || def.category.name().contains(&query_lower)
            })
            .cloned()
            .collect()
    }
}
