//! Byte encoding of compiled expressions.
//!
//! A compiled expression is written with `postcard` behind a short header.
//! Classes and functions are not serializable; they are written by
//! qualified name and linked back against an engine's tables when the
//! bytes are loaded. Call-site caches are never written: a loaded
//! expression starts with every site unresolved.

use core::cell::RefCell;
use std::sync::Arc;

use ecow::EcoString;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::analyzer::{TypeEnvironment, TypedExpr};
use crate::api::Error;
use crate::types::{Class, ClassTable, Function, FunctionTable, Import, TypeDescriptor};

const MAGIC: &[u8; 4] = b"BRSK";
const VERSION: u8 = 1;

/// The persisted part of a compiled expression.
pub(crate) struct Image {
    pub typed: TypedExpr,
    pub env: TypeEnvironment,
    pub setter: bool,
}

struct Linker {
    classes: ClassTable,
    functions: FunctionTable,
}

thread_local! {
    static LINKER: RefCell<Option<Linker>> = const { RefCell::new(None) };
}

/// Installs a linker for the current thread and removes it on drop, so
/// that an early return out of deserialization leaves no tables behind.
struct LinkerGuard;

impl LinkerGuard {
    fn install(classes: &ClassTable, functions: &FunctionTable) -> Self {
        LINKER.with(|linker| {
            *linker.borrow_mut() = Some(Linker {
                classes: classes.clone(),
                functions: functions.clone(),
            });
        });
        LinkerGuard
    }
}

impl Drop for LinkerGuard {
    fn drop(&mut self) {
        LINKER.with(|linker| linker.borrow_mut().take());
    }
}

fn link_class(name: &str) -> Result<Arc<Class>, String> {
    LINKER.with(|linker| match linker.borrow().as_ref() {
        Some(linker) => linker
            .classes
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unknown class '{name}'")),
        None => Err("no class table to link against".to_string()),
    })
}

fn link_function(name: &str) -> Result<Arc<Function>, String> {
    LINKER.with(|linker| match linker.borrow().as_ref() {
        Some(linker) => linker
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unknown function '{name}'")),
        None => Err("no function table to link against".to_string()),
    })
}

/// Serialize an `Arc<Class>` as its qualified name.
pub mod class_ref {
    use super::*;

    pub fn serialize<S: Serializer>(class: &Arc<Class>, serializer: S) -> Result<S::Ok, S::Error> {
        class.qualified_name().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<Class>, D::Error> {
        let name = EcoString::deserialize(deserializer)?;
        link_class(&name).map_err(D::Error::custom)
    }
}

/// Serialize an `Arc<Function>` as its name.
pub mod function_ref {
    use super::*;

    pub fn serialize<S: Serializer>(
        function: &Arc<Function>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        function.name().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Arc<Function>, D::Error> {
        let name = EcoString::deserialize(deserializer)?;
        link_function(&name).map_err(D::Error::custom)
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.class().qualified_name(), self.params()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, params) = <(EcoString, Vec<TypeDescriptor>)>::deserialize(deserializer)?;
        let class = link_class(&name).map_err(D::Error::custom)?;
        Ok(TypeDescriptor::with_params(class, params))
    }
}

#[derive(Serialize, Deserialize)]
enum ImportRef {
    Class(EcoString),
    Function(EcoString),
}

impl Serialize for Import {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Import::Class(class) => ImportRef::Class(class.qualified_name()),
            Import::Function(function) => ImportRef::Function(function.name().into()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Import {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ImportRef::deserialize(deserializer)? {
            ImportRef::Class(name) => link_class(&name).map(Import::Class),
            ImportRef::Function(name) => link_function(&name).map(Import::Function),
        }
        .map_err(D::Error::custom)
    }
}

pub(crate) fn encode(typed: &TypedExpr, env: &TypeEnvironment, setter: bool) -> Result<Vec<u8>, Error> {
    let mut bytes = MAGIC.to_vec();
    bytes.push(VERSION);
    let body = postcard::to_allocvec(&(typed, env, setter))
        .map_err(|e| Error::Persistence(e.to_string()))?;
    bytes.extend_from_slice(&body);
    tracing::debug!(bytes = bytes.len(), "encoded expression");
    Ok(bytes)
}

pub(crate) fn decode(
    bytes: &[u8],
    classes: &ClassTable,
    functions: &FunctionTable,
) -> Result<Image, Error> {
    let Some(body) = bytes.strip_prefix(MAGIC.as_slice()) else {
        return Err(Error::Persistence("not a compiled brisk expression".into()));
    };
    let Some((&version, body)) = body.split_first() else {
        return Err(Error::Persistence("truncated header".into()));
    };
    if version != VERSION {
        return Err(Error::Persistence(format!(
            "unsupported format version {version} (expected {VERSION})"
        )));
    }
    let _guard = LinkerGuard::install(classes, functions);
    let (typed, env, setter): (TypedExpr, TypeEnvironment, bool) =
        postcard::from_bytes(body).map_err(|e| Error::Persistence(e.to_string()))?;
    tracing::debug!(sites = typed.site_count, "decoded expression");
    Ok(Image { typed, env, setter })
}
