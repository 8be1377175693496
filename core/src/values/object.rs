use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{Class, PropertyKind};
use crate::values::Value;

struct ObjectData {
    class: Arc<Class>,
    slots: RwLock<Vec<Value>>,
}

/// Handle to an instance of a host class. Equality is identity.
#[derive(Clone)]
pub struct Object(Arc<ObjectData>);

impl Object {
    /// A fresh instance with every slot at its declared default.
    pub fn new(class: &Arc<Class>) -> Self {
        Object(Arc::new(ObjectData {
            class: class.clone(),
            slots: RwLock::new(class.slot_defaults().to_vec()),
        }))
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.0.class
    }

    pub fn slot(&self, index: usize) -> Value {
        self.0
            .slots
            .read()
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn set_slot(&self, index: usize, value: Value) {
        if let Some(slot) = self.0.slots.write().get_mut(index) {
            *slot = value;
        }
    }

    /// Read a slot-backed property by name. Computed properties are not
    /// consulted; use the accessor layer for full member semantics.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.0.class.property(name).map(|p| &p.kind) {
            Some(PropertyKind::Slot(index)) => Some(self.slot(*index)),
            _ => None,
        }
    }

    /// Write a slot-backed property by name without conversion. Returns
    /// false when the class has no such slot.
    pub fn set(&self, name: &str, value: Value) -> bool {
        match self.0.class.property(name).map(|p| &p.kind) {
            Some(PropertyKind::Slot(index)) => {
                self.set_slot(*index, value);
                true
            }
            _ => false,
        }
    }

    /// Builder-style variant of [`Object::set`].
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.class.name(), self.addr())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
