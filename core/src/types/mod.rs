//! The host object model: classes, static type descriptors, host functions
//! and overload resolution.

pub mod builtins;
mod class;
mod descriptor;
mod function;
pub mod overload;
mod table;

pub use class::{
    Class, ClassBuilder, ClassId, ClassKind, Getter, Method, NativeMethod, Property, Setter,
    StaticField, TypeRef,
};
pub(crate) use class::PropertyKind;
pub use descriptor::TypeDescriptor;
pub use function::{Function, Import, NativeFunction};
pub use table::{ClassTable, FunctionTable};
