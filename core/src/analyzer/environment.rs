//! The symbol table an analysis populates.

use std::sync::Arc;

use ecow::EcoString;
use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::optimizer::AccessorStrategy;
use crate::types::{Class, Function, Import, TypeDescriptor};

/// Settings an analysis starts from.
///
/// # Example
///
/// ```
/// use brisk_core::TypeEnvironmentConfig;
/// use brisk_core::types::TypeDescriptor;
///
/// let config = TypeEnvironmentConfig::new()
///     .strong_typing(true)
///     .input("name", TypeDescriptor::string());
/// assert!(config.strong_typing);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeEnvironmentConfig {
    /// Reject identifiers that cannot be resolved instead of turning them
    /// into inputs.
    pub strong_typing: bool,
    /// Additionally reject member accesses whose receiver type is unknown.
    pub strict_type_enforcement: bool,
    /// Stop after analysis; no executable is produced.
    pub verify_only: bool,
    pub imports: IndexMap<EcoString, Import>,
    /// Known inputs and their types, including generic parameters.
    pub inputs: IndexMap<EcoString, TypeDescriptor>,
    /// Static type of the root context object, when known.
    pub context_type: Option<TypeDescriptor>,
    /// Strategy for this expression's call sites, overriding the process
    /// default.
    pub accessor_strategy: Option<AccessorStrategy>,
}

impl TypeEnvironmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strong_typing(mut self, enabled: bool) -> Self {
        self.strong_typing = enabled;
        self
    }

    pub fn strict_type_enforcement(mut self, enabled: bool) -> Self {
        self.strict_type_enforcement = enabled;
        self
    }

    pub fn verify_only(mut self, enabled: bool) -> Self {
        self.verify_only = enabled;
        self
    }

    /// Import `class` under its simple name.
    pub fn import_class(mut self, class: &Arc<Class>) -> Self {
        self.imports
            .insert(class.name().into(), Import::Class(class.clone()));
        self
    }

    pub fn import_class_as(mut self, name: &str, class: &Arc<Class>) -> Self {
        self.imports.insert(name.into(), Import::Class(class.clone()));
        self
    }

    pub fn import_function(mut self, function: Arc<Function>) -> Self {
        self.imports
            .insert(function.name().into(), Import::Function(function));
        self
    }

    pub fn input(mut self, name: &str, ty: TypeDescriptor) -> Self {
        self.inputs.insert(name.into(), ty);
        self
    }

    pub fn context_type(mut self, ty: TypeDescriptor) -> Self {
        self.context_type = Some(ty);
        self
    }

    pub fn accessor_strategy(mut self, strategy: AccessorStrategy) -> Self {
        self.accessor_strategy = Some(strategy);
        self
    }
}

/// Declared variables, required inputs and imports of one compilation.
///
/// `variables` and `inputs` never share a name: declaring a variable
/// removes it from the inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeEnvironment {
    variables: IndexMap<EcoString, TypeDescriptor>,
    inputs: HashMap<EcoString, TypeDescriptor>,
    imports: HashMap<EcoString, Import>,
    strong_typing: bool,
    strict_type_enforcement: bool,
    verify_only: bool,
    context_type: Option<TypeDescriptor>,
    accessor_strategy: Option<AccessorStrategy>,
    /// Overwritten by every resolution that yields a parameterized type.
    last_type_parameters: Vec<TypeDescriptor>,
    /// Names declared inside some nested block so far.
    block_declared: HashSet<EcoString>,
}

impl TypeEnvironment {
    pub fn new(config: &TypeEnvironmentConfig) -> Self {
        Self {
            variables: IndexMap::new(),
            inputs: config
                .inputs
                .iter()
                .map(|(name, ty)| (name.clone(), ty.clone()))
                .collect(),
            imports: config
                .imports
                .iter()
                .map(|(name, import)| (name.clone(), import.clone()))
                .collect(),
            strong_typing: config.strong_typing,
            strict_type_enforcement: config.strict_type_enforcement,
            verify_only: config.verify_only,
            context_type: config.context_type.clone(),
            accessor_strategy: config.accessor_strategy,
            last_type_parameters: Vec::new(),
            block_declared: HashSet::new(),
        }
    }

    /// Locally declared variables, in declaration order.
    pub fn variables(&self) -> &IndexMap<EcoString, TypeDescriptor> {
        &self.variables
    }

    /// Values the caller must supply.
    pub fn inputs(&self) -> &HashMap<EcoString, TypeDescriptor> {
        &self.inputs
    }

    pub fn imports(&self) -> &HashMap<EcoString, Import> {
        &self.imports
    }

    pub fn variable_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.variables.get(name)
    }

    pub fn input_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.inputs.get(name)
    }

    pub fn import(&self, name: &str) -> Option<&Import> {
        self.imports.get(name)
    }

    pub fn is_strong_typing(&self) -> bool {
        self.strong_typing
    }

    pub fn is_strict_type_enforcement(&self) -> bool {
        self.strict_type_enforcement
    }

    pub fn is_verify_only(&self) -> bool {
        self.verify_only
    }

    pub fn context_type(&self) -> Option<&TypeDescriptor> {
        self.context_type.as_ref()
    }

    pub fn accessor_strategy(&self) -> Option<AccessorStrategy> {
        self.accessor_strategy
    }

    /// Generic parameters of the most recent parameterized resolution.
    ///
    /// This is a single slot: read it right after the resolution of
    /// interest, the next one overwrites it.
    pub fn last_type_parameters(&self) -> &[TypeDescriptor] {
        &self.last_type_parameters
    }

    pub(crate) fn set_last_type_parameters(&mut self, params: &[TypeDescriptor]) {
        if !params.is_empty() {
            self.last_type_parameters = params.to_vec();
        }
    }

    /// Record a top-level variable, taking it out of the inputs.
    pub fn declare_variable(&mut self, name: &str, ty: TypeDescriptor) {
        self.inputs.remove(name);
        self.variables.insert(name.into(), ty);
    }

    /// Record a required input unless the name is already a variable.
    pub fn add_input(&mut self, name: &str, ty: TypeDescriptor) {
        if !self.variables.contains_key(name) {
            self.inputs.insert(name.into(), ty);
        }
    }

    pub fn add_import(&mut self, name: &str, import: Import) {
        self.imports.insert(name.into(), import);
    }

    pub(crate) fn note_block_declaration(&mut self, name: &str) {
        self.block_declared.insert(name.into());
    }

    pub(crate) fn was_block_declared(&self, name: &str) -> bool {
        self.block_declared.contains(name)
    }
}
