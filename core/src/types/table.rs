//! Name tables for the classes and functions an engine knows about.

use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;

use crate::types::{Class, ClassId, Function, builtins};

/// Classes reachable by simple or package-qualified name.
#[derive(Clone)]
pub struct ClassTable {
    by_name: HashMap<EcoString, Arc<Class>>,
    by_id: HashMap<ClassId, Arc<Class>>,
}

impl ClassTable {
    /// A table holding only the built-in classes.
    pub fn with_builtins() -> Self {
        let mut table = Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        };
        for (alias, class) in builtins::named() {
            table.by_name.insert(alias.into(), class.clone());
            table.register(class.clone());
        }
        table.register(builtins::null().clone());
        table.register(builtins::array().clone());
        table
    }

    /// Register `class` under its simple and qualified names. A later
    /// registration under the same name replaces the earlier one.
    pub fn register(&mut self, class: Arc<Class>) {
        self.by_name.insert(class.name().into(), class.clone());
        self.by_name.insert(class.qualified_name(), class.clone());
        self.by_id.insert(class.id(), class);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Class>> {
        self.by_name.get(name)
    }

    pub fn by_id(&self, id: ClassId) -> Option<&Arc<Class>> {
        self.by_id.get(&id)
    }

    /// Every registered class, once each.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.by_id.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Host functions by name.
#[derive(Clone, Default)]
pub struct FunctionTable {
    by_name: HashMap<EcoString, Arc<Function>>,
}

impl FunctionTable {
    pub fn register(&mut self, function: Arc<Function>) {
        self.by_name.insert(function.name().into(), function);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Function>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
