//! Nominal runtime classes of the host object model.
//!
//! A [`Class`] describes the shape of values the host hands to expressions:
//! its properties (slot-backed fields or computed getters), instance and
//! static methods, static fields and constructors. Classes are immutable once
//! built and shared behind `Arc`; identity is the process-unique [`ClassId`].

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use ecow::EcoString;

use crate::evaluator::RuntimeError;
use crate::types::{TypeDescriptor, builtins};
use crate::values::{Object, Value};

/// Process-unique identity of a [`Class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

static NEXT_CLASS_ID: AtomicU32 = AtomicU32::new(1);

impl ClassId {
    fn fresh() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Native implementation of a method, static method or constructor.
///
/// Instance methods receive the receiver value; static methods and
/// constructors receive `Value::Class` of the declaring class.
pub type NativeMethod = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// Native getter of a computed property.
pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, RuntimeError> + Send + Sync>;

/// Native setter of a computed property.
pub type Setter = Arc<dyn Fn(&Value, Value) -> Result<(), RuntimeError> + Send + Sync>;

/// Broad category of a class. Built-in kinds get dedicated runtime
/// representations in [`Value`]; everything the host defines is a `Bean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Object,
    Null,
    Boolean,
    Integer,
    Long,
    Double,
    String,
    List,
    Map,
    Array,
    Class,
    Bean,
}

/// A type as written in a member signature: either one of the declaring
/// class's type variables or a (possibly parameterized) class.
#[derive(Clone)]
pub enum TypeRef {
    /// The receiver's own class, for members of classes that refer to
    /// themselves (`String.trim()` returns `String`).
    This,
    Var(EcoString),
    Class {
        class: Arc<Class>,
        args: Vec<TypeRef>,
    },
}

impl TypeRef {
    pub fn var(name: &str) -> Self {
        TypeRef::Var(name.into())
    }

    pub fn of(class: &Arc<Class>) -> Self {
        TypeRef::Class {
            class: class.clone(),
            args: Vec::new(),
        }
    }

    pub fn generic(class: &Arc<Class>, args: Vec<TypeRef>) -> Self {
        TypeRef::Class {
            class: class.clone(),
            args,
        }
    }

    /// Substitute the receiver's generic arguments into this signature type.
    ///
    /// Type variables are looked up by name in the receiver class's parameter
    /// list; variables the receiver does not bind resolve to `Object`.
    pub fn resolve(&self, receiver: &TypeDescriptor) -> TypeDescriptor {
        match self {
            TypeRef::This => TypeDescriptor::of(receiver.class()),
            TypeRef::Var(name) => receiver
                .class()
                .type_params()
                .iter()
                .position(|p| p == name)
                .and_then(|idx| receiver.params().get(idx))
                .cloned()
                .unwrap_or_else(TypeDescriptor::object),
            TypeRef::Class { class, args } => TypeDescriptor::with_params(
                class.clone(),
                args.iter().map(|arg| arg.resolve(receiver)).collect(),
            ),
        }
    }

    /// The nominal class this signature type erases to at runtime.
    pub fn erased(&self) -> Arc<Class> {
        match self {
            TypeRef::This | TypeRef::Var(_) => builtins::object().clone(),
            TypeRef::Class { class, .. } => class.clone(),
        }
    }
}

impl From<&Arc<Class>> for TypeRef {
    fn from(class: &Arc<Class>) -> Self {
        TypeRef::of(class)
    }
}

impl From<TypeDescriptor> for TypeRef {
    fn from(ty: TypeDescriptor) -> Self {
        TypeRef::Class {
            class: ty.class().clone(),
            args: ty.params().iter().cloned().map(TypeRef::from).collect(),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::This => write!(f, "Self"),
            TypeRef::Var(name) => write!(f, "{name}"),
            TypeRef::Class { class, args } if args.is_empty() => write!(f, "{}", class.name()),
            TypeRef::Class { class, args } => write!(f, "{}<{:?}>", class.name(), args),
        }
    }
}

pub(crate) enum PropertyKind {
    Slot(usize),
    Computed {
        get: Option<Getter>,
        set: Option<Setter>,
    },
}

/// A named, typed property of a class.
pub struct Property {
    name: EcoString,
    ty: TypeRef,
    pub(crate) kind: PropertyKind,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn is_readable(&self) -> bool {
        match &self.kind {
            PropertyKind::Slot(_) => true,
            PropertyKind::Computed { get, .. } => get.is_some(),
        }
    }

    pub fn is_writable(&self) -> bool {
        match &self.kind {
            PropertyKind::Slot(_) => true,
            PropertyKind::Computed { set, .. } => set.is_some(),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.name, self.ty)
    }
}

/// A method, static method or constructor with a fixed signature.
pub struct Method {
    name: EcoString,
    params: Vec<TypeRef>,
    ret: TypeRef,
    declaring: EcoString,
    pub(crate) invoke: NativeMethod,
}

impl Method {
    pub(crate) fn native(declaring: &str, name: &str, params: Vec<TypeRef>, ret: TypeRef, invoke: NativeMethod) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            declaring: declaring.into(),
            invoke,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    pub fn ret(&self) -> &TypeRef {
        &self.ret
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Name of the class that declared this method.
    pub fn declaring_class(&self) -> &str {
        &self.declaring
    }

    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.invoke)(receiver, args)
    }

    fn same_signature(&self, other: &Method) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.erased().id() == b.erased().id())
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({:?}) -> {:?}", self.declaring, self.name, self.params, self.ret)
    }
}

/// A constant, class-level value such as `Decimal.TEN`.
pub struct StaticField {
    name: EcoString,
    ty: TypeDescriptor,
    value: Value,
}

impl StaticField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A nominal runtime type. See the module documentation.
pub struct Class {
    id: ClassId,
    name: EcoString,
    package: Option<EcoString>,
    kind: ClassKind,
    superclass: Option<Arc<Class>>,
    type_params: Vec<EcoString>,
    properties: Vec<Arc<Property>>,
    methods: Vec<Arc<Method>>,
    static_methods: Vec<Arc<Method>>,
    static_fields: Vec<Arc<StaticField>>,
    constructors: Vec<Arc<Method>>,
    slot_defaults: Vec<Value>,
}

impl Class {
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Simple name, e.g. `Decimal`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package-qualified name, e.g. `java.math.Decimal`; equals the simple
    /// name for classes without a package.
    pub fn qualified_name(&self) -> EcoString {
        match &self.package {
            Some(package) => ecow::eco_format!("{}.{}", package, self.name),
            None => self.name.clone(),
        }
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn superclass(&self) -> Option<&Arc<Class>> {
        self.superclass.as_ref()
    }

    pub fn type_params(&self) -> &[EcoString] {
        &self.type_params
    }

    /// Number of storage slots an instance of this class carries, including
    /// the slots inherited from superclasses.
    pub fn slot_count(&self) -> usize {
        self.slot_defaults.len()
    }

    pub(crate) fn slot_defaults(&self) -> &[Value] {
        &self.slot_defaults
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == ClassKind::Object
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind,
            ClassKind::Integer | ClassKind::Long | ClassKind::Double
        )
    }

    /// Inheritance depth; `Object` is 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.superclass.as_ref();
        while let Some(class) = current {
            depth += 1;
            current = class.superclass.as_ref();
        }
        depth
    }

    /// True when values of `self` may be stored where `other` is expected
    /// without conversion.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        if other.kind == ClassKind::Object || self.kind == ClassKind::Null {
            return true;
        }
        let mut current = Some(self);
        while let Some(class) = current {
            if class.id == other.id {
                return true;
            }
            current = class.superclass.as_deref();
        }
        false
    }

    fn ancestry(&self) -> impl Iterator<Item = &Class> {
        let mut current = Some(self);
        core::iter::from_fn(move || {
            let class = current?;
            current = class.superclass.as_deref();
            Some(class)
        })
    }

    /// Find a property by name, searching from this class up its ancestry.
    pub fn property(&self, name: &str) -> Option<&Arc<Property>> {
        self.ancestry()
            .flat_map(|class| class.properties.iter())
            .find(|p| p.name == name)
    }

    /// Instance methods named `name`, most-derived first. A method overridden
    /// with an identical signature is hidden by the override.
    pub fn methods(&self, name: &str) -> Vec<Arc<Method>> {
        collect_visible(
            self.ancestry()
                .flat_map(|class| {
                    class
                        .methods
                        .iter()
                        .chain(builtins::intrinsic_methods(class.kind))
                })
                .filter(|m| m.name == name),
        )
    }

    pub fn static_methods(&self, name: &str) -> Vec<Arc<Method>> {
        collect_visible(
            self.ancestry()
                .flat_map(|class| {
                    class
                        .static_methods
                        .iter()
                        .chain(builtins::intrinsic_static_methods(class.kind))
                })
                .filter(|m| m.name == name),
        )
    }

    pub fn has_method_named(&self, name: &str) -> bool {
        self.ancestry()
            .flat_map(|class| {
                class
                    .methods
                    .iter()
                    .chain(builtins::intrinsic_methods(class.kind))
            })
            .any(|m| m.name == name)
    }

    pub fn static_field(&self, name: &str) -> Option<&Arc<StaticField>> {
        self.ancestry()
            .flat_map(|class| class.static_fields.iter())
            .find(|f| f.name == name)
    }

    pub fn constructors(&self) -> &[Arc<Method>] {
        &self.constructors
    }

    /// A zero-argument `getX()` / `isX()` method standing in for property `x`.
    pub fn getter_method(&self, property: &str) -> Option<Arc<Method>> {
        let mut chars = property.chars();
        let first = chars.next()?;
        let capitalized: String = first.to_uppercase().chain(chars).collect();
        ["get", "is"].iter().find_map(|prefix| {
            self.methods(&format!("{prefix}{capitalized}"))
                .into_iter()
                .find(|m| m.arity() == 0)
        })
    }

    /// A one-argument `setX(v)` method standing in for writable property `x`.
    pub fn setter_method(&self, property: &str) -> Option<Arc<Method>> {
        let mut chars = property.chars();
        let first = chars.next()?;
        let capitalized: String = first.to_uppercase().chain(chars).collect();
        self.methods(&format!("set{capitalized}"))
            .into_iter()
            .find(|m| m.arity() == 1)
    }
}

fn collect_visible<'a>(candidates: impl Iterator<Item = &'a Arc<Method>>) -> Vec<Arc<Method>> {
    let mut visible: Vec<Arc<Method>> = Vec::new();
    for method in candidates {
        if !visible.iter().any(|seen| seen.same_signature(method)) {
            visible.push(method.clone());
        }
    }
    visible
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Class {}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({}{})", self.qualified_name(), self.id)
    }
}

/// Builder for host classes.
///
/// ```
/// use brisk_core::types::{ClassBuilder, TypeRef, builtins};
///
/// let person = ClassBuilder::new("Person")
///     .field("name", builtins::string())
///     .field("age", builtins::integer())
///     .field_constructor(&["name", "age"])
///     .build();
/// assert_eq!(person.slot_count(), 2);
/// ```
pub struct ClassBuilder {
    name: EcoString,
    package: Option<EcoString>,
    kind: ClassKind,
    superclass: Option<Arc<Class>>,
    type_params: Vec<EcoString>,
    properties: Vec<Arc<Property>>,
    methods: Vec<Arc<Method>>,
    static_methods: Vec<Arc<Method>>,
    static_fields: Vec<Arc<StaticField>>,
    constructors: Vec<Arc<Method>>,
    field_constructors: Vec<Vec<EcoString>>,
    slot_defaults: Vec<Value>,
    slot_types: Vec<(EcoString, TypeRef)>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self::with_kind(name, ClassKind::Bean).extends(builtins::object())
    }

    pub(crate) fn with_kind(name: &str, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            package: None,
            kind,
            superclass: None,
            type_params: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            static_methods: Vec::new(),
            static_fields: Vec::new(),
            constructors: Vec::new(),
            field_constructors: Vec::new(),
            slot_defaults: Vec::new(),
            slot_types: Vec::new(),
        }
    }

    pub fn package(mut self, package: &str) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Inherit properties, methods and storage slots from `superclass`.
    /// Must precede any field declarations.
    pub fn extends(mut self, superclass: &Arc<Class>) -> Self {
        self.slot_defaults = superclass.slot_defaults.clone();
        self.superclass = Some(superclass.clone());
        self
    }

    pub fn type_param(mut self, name: &str) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// A slot-backed, readable and writable property initialized to `null`.
    pub fn field(self, name: &str, ty: impl Into<TypeRef>) -> Self {
        self.field_with_default(name, ty, Value::Null)
    }

    pub fn field_with_default(mut self, name: &str, ty: impl Into<TypeRef>, default: Value) -> Self {
        let ty = ty.into();
        let slot = self.slot_defaults.len();
        self.slot_defaults.push(default);
        self.slot_types.push((name.into(), ty.clone()));
        self.properties.push(Arc::new(Property {
            name: name.into(),
            ty,
            kind: PropertyKind::Slot(slot),
        }));
        self
    }

    /// A computed property backed by native accessors.
    pub fn property<G>(mut self, name: &str, ty: impl Into<TypeRef>, get: G, set: Option<Setter>) -> Self
    where
        G: Fn(&Value) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.properties.push(Arc::new(Property {
            name: name.into(),
            ty: ty.into(),
            kind: PropertyKind::Computed {
                get: Some(Arc::new(get)),
                set,
            },
        }));
        self
    }

    /// A computed property that can only be written.
    pub fn write_only_property(mut self, name: &str, ty: impl Into<TypeRef>, set: Setter) -> Self {
        self.properties.push(Arc::new(Property {
            name: name.into(),
            ty: ty.into(),
            kind: PropertyKind::Computed {
                get: None,
                set: Some(set),
            },
        }));
        self
    }

    pub fn method<F>(mut self, name: &str, params: Vec<TypeRef>, ret: impl Into<TypeRef>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let method = self.make_method(name, params, ret.into(), Arc::new(f));
        self.methods.push(method);
        self
    }

    pub fn static_method<F>(
        mut self,
        name: &str,
        params: Vec<TypeRef>,
        ret: impl Into<TypeRef>,
        f: F,
    ) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let method = self.make_method(name, params, ret.into(), Arc::new(f));
        self.static_methods.push(method);
        self
    }

    pub fn static_field(mut self, name: &str, ty: TypeDescriptor, value: Value) -> Self {
        self.static_fields.push(Arc::new(StaticField {
            name: name.into(),
            ty,
            value,
        }));
        self
    }

    /// A constructor implemented natively. The closure receives
    /// `Value::Class` of the class being built.
    pub fn constructor<F>(mut self, params: Vec<TypeRef>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let method = self.make_method("<init>", params, TypeRef::This, Arc::new(f));
        self.constructors.push(method);
        self
    }

    /// A constructor that stores its arguments into the named slot-backed
    /// fields, in order. An empty list yields the default constructor.
    pub fn field_constructor(mut self, fields: &[&str]) -> Self {
        self.field_constructors
            .push(fields.iter().map(|f| EcoString::from(*f)).collect());
        self
    }

    fn make_method(&self, name: &str, params: Vec<TypeRef>, ret: TypeRef, invoke: NativeMethod) -> Arc<Method> {
        Arc::new(Method {
            name: name.into(),
            params,
            ret,
            declaring: self.name.clone(),
            invoke,
        })
    }

    /// Storage slot and declared type of a slot-backed field, own or
    /// inherited.
    fn slot_of(&self, field: &str) -> Option<(usize, TypeRef)> {
        let inherited = self.slot_defaults.len() - self.slot_types.len();
        if let Some(index) = self.slot_types.iter().position(|(name, _)| name == field) {
            return Some((inherited + index, self.slot_types[index].1.clone()));
        }
        let property = self.superclass.as_ref()?.property(field)?;
        match property.kind {
            PropertyKind::Slot(slot) => Some((slot, property.ty.clone())),
            PropertyKind::Computed { .. } => None,
        }
    }

    pub fn build(mut self) -> Arc<Class> {
        for fields in core::mem::take(&mut self.field_constructors) {
            let mut params = Vec::with_capacity(fields.len());
            let mut slots = Vec::with_capacity(fields.len());
            for field in &fields {
                let Some((slot, ty)) = self.slot_of(field) else {
                    continue;
                };
                params.push(ty);
                slots.push(slot);
            }
            let invoke: NativeMethod = Arc::new(move |class, args| {
                let Value::Class(class) = class else {
                    return Err(RuntimeError::NotCallable {
                        what: "constructor without class".into(),
                    });
                };
                let object = Object::new(class);
                for (slot, value) in slots.iter().zip(args) {
                    object.set_slot(*slot, value.clone());
                }
                Ok(Value::Object(object))
            });
            let method = self.make_method("<init>", params, TypeRef::This, invoke);
            self.constructors.push(method);
        }

        let class = Arc::new(Class {
            id: ClassId::fresh(),
            name: self.name,
            package: self.package,
            kind: self.kind,
            superclass: self.superclass,
            type_params: self.type_params,
            properties: self.properties,
            methods: self.methods,
            static_methods: self.static_methods,
            static_fields: self.static_fields,
            constructors: self.constructors,
            slot_defaults: self.slot_defaults,
        });
        tracing::debug!(class = %class.qualified_name(), id = %class.id, "built class");
        class
    }
}
