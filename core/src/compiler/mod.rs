//! Compilation pipeline: source text to an executable
//! [`CompiledExpression`].
//!
//! ## Stages
//!
//! ```text
//! Unparsed --parse--> Parsed --analyze--> Analyzed --emit--> Executable
//!              \                 \
//!               `----------------`--> Failed
//! ```
//!
//! `verify_only` stops at `Analyzed`: the caller's [`TypeEnvironment`] is
//! populated but no executable is emitted. Emission numbers no code; it
//! allocates one unresolved [`CallSite`] per member access of the analyzed
//! tree.

use bumpalo::Bump;
use ecow::EcoString;

use crate::analyzer::{self, ExprInner, TypeEnvironment, TypedExpr};
use crate::api::{CompiledExpression, Engine, Error};
use crate::optimizer::{AccessorStrategy, CallSite, Member};
use crate::parser;

/// Where an [`ExpressionCompiler`] is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerState {
    Unparsed,
    Parsed,
    Analyzed,
    Executable,
    Failed,
}

/// Drives one source text through parsing, analysis and emission.
///
/// A compiler runs once; a second [`compile`](Self::compile) call fails.
///
/// # Example
///
/// ```
/// use brisk_core::{Engine, EngineOptions, TypeEnvironmentConfig};
/// use brisk_core::analyzer::TypeEnvironment;
/// use brisk_core::compiler::{CompilerState, ExpressionCompiler};
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
/// let mut env = TypeEnvironment::new(&TypeEnvironmentConfig::new());
/// let mut compiler = ExpressionCompiler::new(&engine, "int a = 1; a + b").verify_only(true);
///
/// assert!(compiler.compile(&mut env).unwrap().is_none());
/// assert_eq!(compiler.state(), CompilerState::Analyzed);
/// assert!(env.inputs().contains_key("b"));
/// ```
pub struct ExpressionCompiler<'e> {
    engine: &'e Engine,
    source: String,
    verify_only: bool,
    setter: bool,
    state: CompilerState,
}

impl<'e> ExpressionCompiler<'e> {
    pub fn new(engine: &'e Engine, source: impl Into<String>) -> Self {
        Self {
            engine,
            source: source.into(),
            verify_only: false,
            setter: false,
            state: CompilerState::Unparsed,
        }
    }

    /// Stop after analysis. Also implied by the environment's own flag.
    pub fn verify_only(mut self, enabled: bool) -> Self {
        self.verify_only = enabled;
        self
    }

    /// Compile the source as an assignable target for
    /// [`CompiledExpression::execute_set`].
    pub fn setter(mut self, enabled: bool) -> Self {
        self.setter = enabled;
        self
    }

    pub fn state(&self) -> CompilerState {
        self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the pipeline, populating `env`.
    ///
    /// Returns `None` when compilation stops after analysis.
    pub fn compile(&mut self, env: &mut TypeEnvironment) -> Result<Option<CompiledExpression>, Error> {
        if self.state != CompilerState::Unparsed {
            return Err(Error::Api(format!(
                "expression compiler already ran (state: {:?})",
                self.state
            )));
        }
        match self.run(env) {
            Ok(compiled) => Ok(compiled),
            Err(err) => {
                tracing::debug!(state = ?self.state, error = %err, "compilation failed");
                self.state = CompilerState::Failed;
                Err(err)
            }
        }
    }

    fn run(&mut self, env: &mut TypeEnvironment) -> Result<Option<CompiledExpression>, Error> {
        let arena = Bump::new();
        let source = arena.alloc_str(&self.source);
        let parsed = parser::parse(&arena, source)?;
        self.state = CompilerState::Parsed;
        tracing::debug!(statements = parsed.body.len(), "parsed expression");

        let classes = self.engine.classes();
        let functions = self.engine.functions();
        let typed = if self.setter {
            analyzer::analyze_setter(&parsed, env, classes, functions)?
        } else {
            analyzer::analyze(&parsed, env, classes, functions)?
        };
        self.state = CompilerState::Analyzed;

        if self.verify_only || env.is_verify_only() {
            tracing::debug!(inputs = env.inputs().len(), "verify-only compilation finished");
            return Ok(None);
        }

        let sites = call_sites(&typed, env.accessor_strategy());
        tracing::debug!(sites = sites.len(), egress = %typed.egress, "emitted expression");
        let compiled = CompiledExpression::new(
            typed,
            sites,
            env.clone(),
            self.setter,
            self.engine.options().default_execution_options.clone(),
        );
        self.state = CompilerState::Executable;
        Ok(Some(compiled))
    }
}

/// One unresolved call site per site id of `typed`.
pub(crate) fn call_sites(typed: &TypedExpr, preferred: Option<AccessorStrategy>) -> Vec<CallSite> {
    let mut members: Vec<Option<Member>> = vec![None; typed.site_count as usize];
    typed.walk(|expr| {
        let (site, member) = match &expr.inner {
            ExprInner::Input { name, site } | ExprInner::Property { name, site, .. } => {
                (site, Member::Property(name.clone()))
            }
            ExprInner::MethodCall {
                name, args, site, ..
            } => (
                site,
                Member::Method {
                    name: name.clone(),
                    arity: args.len(),
                },
            ),
            ExprInner::Index { site, .. } => (site, Member::Index),
            _ => return,
        };
        if let Some(slot) = members.get_mut(site.index()) {
            *slot = Some(member);
        }
    });
    members
        .into_iter()
        // Ids the analyzer allocated for discarded nodes are never executed.
        .map(|member| member.unwrap_or_else(|| Member::Property(EcoString::new())))
        .map(|member| CallSite::new(member, preferred))
        .collect()
}
