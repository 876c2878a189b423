//! Adapter registry — maps canonical step types to adapters.
//!
//! Resolution applies alias normalization first (`agent::aliases`), so a
//! step emitted with a generic or misnamed type still reaches the right
//! adapter.

use std::collections::HashMap;

use crate::agent::aliases;
use crate::model::Step;

use super::traits::ToolAdapter;

pub struct ToolRegistry {
    adapters: HashMap<String, Box<dyn ToolAdapter>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, step_type: impl Into<String>, adapter: Box<dyn ToolAdapter>) {
        self.adapters.insert(step_type.into(), adapter);
    }

    /// Normalize `step`'s type and look up the adapter for it. Returns the
    /// resolved canonical type alongside the adapter so the caller can
    /// dispatch with the normalized step.
    pub fn resolve(&self, step: &Step) -> Option<(String, &dyn ToolAdapter)> {
        let canonical = aliases::normalize_step_type(step);
        self.adapters.get(&canonical).map(|a| (canonical, a.as_ref()))
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.adapters.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
