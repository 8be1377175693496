//! The analyzed tree a [`CompiledExpression`](crate::api::CompiledExpression)
//! executes.
//!
//! Unlike the parse tree it owns its data, so a compiled expression is free
//! of the parse arena and can be shared between threads and persisted.
//! Class and function references are serialized by name (see
//! [`crate::persist`]).

use std::sync::Arc;

use ecow::EcoString;
use serde::{Deserialize, Serialize};

use crate::parser::{AssignOp, BinaryOp, BoolOp, ComparisonOp, Span, StepOp, UnaryOp};
use crate::types::{Class, Function, TypeDescriptor};
use crate::values::Value;

/// Index of a call site in its compiled expression.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl SiteId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An analyzed statement sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedExpr {
    pub body: Vec<Expr>,
    /// Static type of the value the sequence evaluates to; `Object` when
    /// unknown.
    pub egress: TypeDescriptor,
    /// Number of call sites referenced by `body`.
    pub site_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub ty: TypeDescriptor,
    pub span: Span,
    pub inner: ExprInner,
}

impl Expr {
    /// Whether the expression can stand on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.inner,
            ExprInner::Local(_)
                | ExprInner::Input { .. }
                | ExprInner::Property { .. }
                | ExprInner::Index { .. }
        )
    }

    /// Direct subexpressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.inner {
            ExprInner::Constant(_)
            | ExprInner::Local(_)
            | ExprInner::Input { .. }
            | ExprInner::This
            | ExprInner::ClassRef(_)
            | ExprInner::StaticField { .. }
            | ExprInner::Nop => Vec::new(),
            ExprInner::Property { receiver, .. } => vec![&**receiver],
            ExprInner::MethodCall { receiver, args, .. } => {
                core::iter::once(&**receiver).chain(args).collect()
            }
            ExprInner::FunctionCall { args, .. }
            | ExprInner::New { args, .. }
            | ExprInner::NewArray { items: args, .. }
            | ExprInner::InlineList(args)
            | ExprInner::Block(args) => args.iter().collect(),
            ExprInner::Convert { value, target } => vec![&**value, &**target],
            ExprInner::Index {
                receiver, index, ..
            } => vec![&**receiver, &**index],
            ExprInner::Assign { target, value, .. } => vec![&**target, &**value],
            ExprInner::Declare { init, .. } => init.iter().map(|e| &**e).collect(),
            ExprInner::Binary { left, right, .. }
            | ExprInner::Boolean { left, right, .. }
            | ExprInner::Comparison { left, right, .. } => vec![&**left, &**right],
            ExprInner::Unary { expr, .. } | ExprInner::Cast { expr, .. } => vec![&**expr],
            ExprInner::Step { target, .. } => vec![&**target],
            ExprInner::Ternary {
                cond,
                then_branch,
                else_branch,
            } => vec![&**cond, &**then_branch, &**else_branch],
            ExprInner::NewSizedArray { len, .. } => vec![&**len],
            ExprInner::InlineMap(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            ExprInner::If {
                cond,
                then_branch,
                else_branch,
            } => core::iter::once(&**cond)
                .chain(then_branch)
                .chain(else_branch.iter().flatten())
                .collect(),
            ExprInner::While { cond, body } => core::iter::once(&**cond).chain(body).collect(),
            ExprInner::For {
                init,
                cond,
                update,
                body,
            } => init
                .iter()
                .chain(cond)
                .map(|e| &**e)
                .chain(update)
                .chain(body)
                .collect(),
            ExprInner::ForEach { iterable, body, .. } => {
                core::iter::once(&**iterable).chain(body).collect()
            }
            ExprInner::Return(value) => value.iter().map(|e| &**e).collect(),
        }
    }

    /// Visit this expression and all subexpressions, parents first.
    pub fn walk<'e>(&'e self, f: &mut impl FnMut(&'e Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// The call site this node accesses through, if any.
    pub fn site(&self) -> Option<SiteId> {
        match &self.inner {
            ExprInner::Input { site, .. }
            | ExprInner::Property { site, .. }
            | ExprInner::MethodCall { site, .. }
            | ExprInner::Index { site, .. } => Some(*site),
            _ => None,
        }
    }
}

impl TypedExpr {
    /// Visit every node of every statement, parents first.
    pub fn walk<'e>(&'e self, mut f: impl FnMut(&'e Expr)) {
        for stmt in &self.body {
            stmt.walk(&mut f);
        }
    }
}

/// A literal value, kept separate from [`Value`] so that it serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(EcoString),
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Long(l) => Value::Long(*l),
            Constant::Double(d) => Value::Double(*d),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprInner {
    Constant(Constant),

    /// A declared variable: a block local, or a top-level variable stored
    /// in the caller's bindings.
    Local(EcoString),

    /// A value supplied by the caller: looked up in the bindings first and
    /// then as a member of the root context through `site`.
    Input { name: EcoString, site: SiteId },

    /// The root context object.
    This,

    ClassRef(#[serde(with = "crate::persist::class_ref")] Arc<Class>),

    StaticField {
        #[serde(with = "crate::persist::class_ref")]
        class: Arc<Class>,
        field: EcoString,
    },

    Property {
        receiver: Box<Expr>,
        name: EcoString,
        site: SiteId,
    },

    MethodCall {
        receiver: Box<Expr>,
        name: EcoString,
        args: Vec<Expr>,
        site: SiteId,
    },

    FunctionCall {
        #[serde(with = "crate::persist::function_ref")]
        function: Arc<Function>,
        args: Vec<Expr>,
    },

    /// `convert(value, Class)`.
    Convert {
        value: Box<Expr>,
        target: Box<Expr>,
    },

    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
        site: SiteId,
    },

    /// `coerce_to` is the static type of the target when it is known; the
    /// stored value is converted to it first.
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
        coerce_to: Option<TypeDescriptor>,
    },

    /// `scoped` declarations live in the innermost block; the others are
    /// written to the caller's bindings.
    Declare {
        name: EcoString,
        declared: Option<TypeDescriptor>,
        init: Option<Box<Expr>>,
        scoped: bool,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Boolean {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },

    Step {
        target: Box<Expr>,
        op: StepOp,
    },

    Cast {
        target: TypeDescriptor,
        expr: Box<Expr>,
    },

    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `new C(args)`; `ctor` is the statically chosen constructor, if any.
    New {
        #[serde(with = "crate::persist::class_ref")]
        class: Arc<Class>,
        args: Vec<Expr>,
        ctor: Option<usize>,
    },

    NewArray {
        element: TypeDescriptor,
        items: Vec<Expr>,
    },

    NewSizedArray {
        element: TypeDescriptor,
        len: Box<Expr>,
    },

    InlineList(Vec<Expr>),

    InlineMap(Vec<(Expr, Expr)>),

    Block(Vec<Expr>),

    If {
        cond: Box<Expr>,
        then_branch: Vec<Expr>,
        else_branch: Option<Vec<Expr>>,
    },

    While {
        cond: Box<Expr>,
        body: Vec<Expr>,
    },

    For {
        init: Option<Box<Expr>>,
        cond: Option<Box<Expr>>,
        update: Vec<Expr>,
        body: Vec<Expr>,
    },

    ForEach {
        var: EcoString,
        declared: Option<TypeDescriptor>,
        iterable: Box<Expr>,
        body: Vec<Expr>,
    },

    Return(Option<Box<Expr>>),

    /// Statements with no runtime effect (imports).
    Nop,
}
