//! Generic scope stack for block-local bindings.
//!
//! Used by both the analyzer (binds types) and evaluator (binds values).
//! Each block (`{ .. }`, loop body, branch body) pushes a frame; names
//! declared in it disappear when the frame is popped:
//! ```text
//! if (a) { int tmp = 1; b = tmp }   // `tmp` is gone after the branch
//! ```
//! Top-level names are not kept here; the analyzer records them in the
//! type environment and the evaluator in the caller's variables.

use core::fmt;

use ecow::EcoString;
use smallvec::SmallVec;

/// One block's bindings, in declaration order.
///
/// Blocks rarely declare more than a handful of names, so lookup is a
/// linear scan.
#[derive(Debug, Clone)]
pub struct Frame<T> {
    bindings: SmallVec<[(EcoString, T); 4]>,
}

impl<T> Frame<T> {
    pub fn new() -> Self {
        Self {
            bindings: SmallVec::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut T> {
        self.bindings
            .iter_mut()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Bind `name`, replacing an earlier binding of the same name.
    pub fn bind(&mut self, name: &str, value: T) {
        match self.lookup_mut(name) {
            Some(slot) => *slot = value,
            None => self.bindings.push((name.into(), value)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<T> Default for Frame<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A stack of block frames, searched from innermost to outermost.
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    frames: Vec<Frame<T>>,
}

impl<T> ScopeStack<T> {
    /// Create a new empty scope stack.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::new());
    }

    /// Pop the innermost frame, returning its bindings.
    pub fn pop(&mut self) -> Result<Frame<T>, PopError> {
        self.frames.pop().ok_or(PopError::EmptyStack)
    }

    /// Number of open blocks.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Look up a name, searching frames from innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.lookup(name))
    }

    /// Declare `name` in the innermost frame.
    pub fn declare(&mut self, name: &str, value: T) -> Result<(), BindError> {
        self.frames
            .last_mut()
            .ok_or(BindError::NoScope)?
            .bind(name, value);
        Ok(())
    }

    /// Overwrite the innermost existing binding of `name`.
    ///
    /// Returns the value back when no open frame binds the name, so the
    /// caller can store it elsewhere.
    pub fn assign(&mut self, name: &str, value: T) -> Result<(), T> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.lookup_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(value)
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Error when trying to bind a value in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// No scope exists to bind in.
    NoScope,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::NoScope => write!(f, "No scope to bind in"),
        }
    }
}

/// Error when trying to pop a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopError {
    /// The stack is empty.
    EmptyStack,
}

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopError::EmptyStack => write!(f, "Cannot pop from empty scope stack"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_innermost_first() {
        let mut stack = ScopeStack::new();
        stack.push();
        stack.declare("a", 1).unwrap();
        stack.declare("b", 2).unwrap();
        stack.push();
        stack.declare("a", 10).unwrap();

        assert_eq!(stack.lookup("a"), Some(&10));
        assert_eq!(stack.lookup("b"), Some(&2));
        assert_eq!(stack.lookup("c"), None);

        stack.pop().unwrap();
        assert_eq!(stack.lookup("a"), Some(&1));
    }

    #[test]
    fn test_popped_names_vanish() {
        let mut stack = ScopeStack::new();
        stack.push();
        stack.declare("tmp", 1).unwrap();
        let frame = stack.pop().unwrap();
        assert_eq!(frame.names().collect::<Vec<_>>(), vec!["tmp"]);
        assert_eq!(stack.lookup("tmp"), None);
    }

    #[test]
    fn test_assign_updates_enclosing_frame() {
        let mut stack = ScopeStack::new();
        stack.push();
        stack.declare("n", 0).unwrap();
        stack.push();
        assert_eq!(stack.assign("n", 5), Ok(()));
        stack.pop().unwrap();
        assert_eq!(stack.lookup("n"), Some(&5));
        assert_eq!(stack.assign("missing", 7), Err(7));
    }

    #[test]
    fn test_declare_without_frame() {
        let mut stack: ScopeStack<i32> = ScopeStack::new();
        assert_eq!(stack.declare("a", 1), Err(BindError::NoScope));
        assert_eq!(stack.pop().unwrap_err(), PopError::EmptyStack);
    }
}
