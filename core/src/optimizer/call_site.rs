use std::sync::Arc;

use ecow::EcoString;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::evaluator::RuntimeError;
use crate::optimizer::accessor::{Accessor, AccessorKind};
use crate::optimizer::{AccessorStrategy, get_default_accessor_strategy, introspect};
use crate::types::ClassId;
use crate::values::Value;

/// The member a call site accesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Property(EcoString),
    Method { name: EcoString, arity: usize },
    Index,
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(name) | Member::Method { name, .. } => name,
            Member::Index => "[]",
        }
    }
}

struct Binding {
    class: ClassId,
    accessor: Arc<Accessor>,
}

/// One property, method or index access of a compiled expression, with
/// its cached accessor.
///
/// The cache cell is only ever touched with `try_read`/`try_write`: a
/// thread that finds it busy resolves an accessor for itself and skips the
/// store, so execution never waits on another thread.
pub struct CallSite {
    member: Member,
    /// Strategy chosen by the expression's environment, if any.
    preferred: Option<AccessorStrategy>,
    /// Strategy fixed at the first resolution.
    strategy: OnceCell<AccessorStrategy>,
    cell: RwLock<Option<Binding>>,
}

impl CallSite {
    pub fn new(member: Member, preferred: Option<AccessorStrategy>) -> Self {
        Self {
            member,
            preferred,
            strategy: OnceCell::new(),
            cell: RwLock::new(None),
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    /// The class and accessor kind the site is currently bound to.
    pub fn binding(&self) -> Option<(ClassId, AccessorKind)> {
        self.cell
            .try_read()?
            .as_ref()
            .map(|binding| (binding.class, binding.accessor.kind()))
    }

    /// The strategy this site resolves with, once it has resolved.
    pub fn strategy(&self) -> Option<AccessorStrategy> {
        self.strategy.get().copied()
    }

    fn accessor_for(&self, receiver: &Value) -> Arc<Accessor> {
        let class = receiver.class();
        if let Some(cell) = self.cell.try_read() {
            if let Some(binding) = cell.as_ref() {
                if binding.class == class.id() {
                    tracing::trace!(member = self.member.name(), "call site hit");
                    return binding.accessor.clone();
                }
            }
        }
        tracing::trace!(member = self.member.name(), class = class.name(), "call site miss");

        let strategy = *self.strategy.get_or_init(|| {
            self.preferred
                .unwrap_or_else(get_default_accessor_strategy)
        });
        let accessor = match strategy {
            AccessorStrategy::Universal => Accessor::Universal,
            AccessorStrategy::Specialized => {
                match Accessor::specialize(&class, receiver, &self.member) {
                    Ok(accessor) => accessor,
                    Err(reason) => {
                        tracing::debug!(
                            member = self.member.name(),
                            class = class.name(),
                            reason,
                            "specialization failed, using universal accessor"
                        );
                        Accessor::Universal
                    }
                }
            }
        };
        let accessor = Arc::new(accessor);
        tracing::debug!(
            member = self.member.name(),
            class = class.name(),
            kind = ?accessor.kind(),
            "call site resolved"
        );
        if let Some(mut cell) = self.cell.try_write() {
            *cell = Some(Binding {
                class: class.id(),
                accessor: accessor.clone(),
            });
        }
        accessor
    }

    /// Class values are not cached: their members are static.
    fn is_static(receiver: &Value) -> bool {
        matches!(receiver, Value::Class(_))
    }

    fn null_check(&self, receiver: &Value) -> Result<(), RuntimeError> {
        if receiver.is_null() {
            return Err(RuntimeError::NullReceiver {
                member: self.member.name().into(),
            });
        }
        Ok(())
    }

    pub fn get(&self, receiver: &Value) -> Result<Value, RuntimeError> {
        self.null_check(receiver)?;
        if Self::is_static(receiver) {
            return introspect::get_property(receiver, self.member.name());
        }
        self.accessor_for(receiver).get(&self.member, receiver)
    }

    pub fn set(&self, receiver: &Value, value: Value) -> Result<(), RuntimeError> {
        self.null_check(receiver)?;
        if Self::is_static(receiver) {
            return introspect::set_property(receiver, self.member.name(), value);
        }
        self.accessor_for(receiver).set(&self.member, receiver, value)
    }

    pub fn invoke(&self, receiver: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.null_check(receiver)?;
        if Self::is_static(receiver) {
            return introspect::invoke(receiver, self.member.name(), args);
        }
        self.accessor_for(receiver).invoke(&self.member, receiver, args)
    }

    pub fn get_index(&self, receiver: &Value, index: &Value) -> Result<Value, RuntimeError> {
        self.null_check(receiver)?;
        self.accessor_for(receiver).get_index(receiver, index)
    }

    pub fn set_index(&self, receiver: &Value, index: Value, value: Value) -> Result<(), RuntimeError> {
        self.null_check(receiver)?;
        self.accessor_for(receiver).set_index(receiver, index, value)
    }
}

impl core::fmt::Debug for CallSite {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallSite")
            .field("member", &self.member)
            .field("binding", &self.binding())
            .finish()
    }
}
