//! Shared, interior-mutable containers.
//!
//! Expressions may run concurrently against the same host data, so every
//! container guards its contents with a `parking_lot::RwLock`. Locks are
//! never held across calls back into the evaluator.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::evaluator::RuntimeError;
use crate::types::TypeDescriptor;
use crate::values::Value;

fn out_of_bounds(index: usize, len: usize) -> RuntimeError {
    RuntimeError::IndexOutOfBounds {
        index: index as i64,
        len,
    }
}

/// Growable list handle (`java.util.List`).
#[derive(Clone, Default)]
pub struct List(Arc<RwLock<Vec<Value>>>);

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        List(Arc::new(RwLock::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: Value) -> Result<Value, RuntimeError> {
        let mut items = self.0.write();
        let len = items.len();
        let slot = items.get_mut(index).ok_or_else(|| out_of_bounds(index, len))?;
        Ok(core::mem::replace(slot, value))
    }

    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    pub fn remove(&self, index: usize) -> Result<Value, RuntimeError> {
        let mut items = self.0.write();
        if index >= items.len() {
            return Err(out_of_bounds(index, items.len()));
        }
        Ok(items.remove(index))
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }

    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.snapshot().iter().position(|item| item == value)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Insertion-ordered map handle (`java.util.Map`).
#[derive(Clone, Default)]
pub struct Map(Arc<RwLock<IndexMap<Value, Value>>>);

impl Map {
    pub fn new(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Map(Arc::new(RwLock::new(entries.into_iter().collect())))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn insert(&self, key: Value, value: Value) -> Option<Value> {
        self.0.write().insert(key, value)
    }

    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.0.write().shift_remove(key)
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.read().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.read().values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Order-insensitive comparison of contents.
    pub fn same_entries(&self, other: &Map) -> bool {
        let mine = self.entries();
        mine.len() == other.len() && mine.iter().all(|(k, v)| other.get(k).as_ref() == Some(v))
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

struct ArrayData {
    element: TypeDescriptor,
    items: RwLock<Vec<Value>>,
}

/// Fixed-length, element-typed array handle.
#[derive(Clone)]
pub struct Array(Arc<ArrayData>);

impl Array {
    pub fn new(element: TypeDescriptor, items: Vec<Value>) -> Self {
        Array(Arc::new(ArrayData {
            element,
            items: RwLock::new(items),
        }))
    }

    pub fn element_type(&self) -> &TypeDescriptor {
        &self.0.element
    }

    pub fn len(&self) -> usize {
        self.0.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.read().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Value) -> Result<Value, RuntimeError> {
        let mut items = self.0.items.write();
        let len = items.len();
        let slot = items.get_mut(index).ok_or_else(|| out_of_bounds(index, len))?;
        Ok(core::mem::replace(slot, value))
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.0.items.read().clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
