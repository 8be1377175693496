//! Runtime values and the variable bindings expressions read and write.

mod containers;
mod object;
mod value;

pub use containers::{Array, List, Map};
pub use object::Object;
pub use value::Value;

/// Caller-owned variable bindings. Top-level declarations and assignments
/// made by an expression are written back here.
pub type Variables = hashbrown::HashMap<String, Value>;

#[cfg(test)]
mod value_test;
