use crate::parser::syntax::AnnotatedSource;
use crate::parser::{AssignOp, BinaryOp, BoolOp, ComparisonOp, Span, StepOp, UnaryOp};

/// A parsed statement sequence plus the spans of its expressions.
#[derive(Debug)]
pub struct ParsedExpr<'a> {
    pub body: &'a [Stmt<'a>],
    pub ann: &'a AnnotatedSource<'a, Expr<'a>>,
}

impl<'a> ParsedExpr<'a> {
    pub fn span_of(&self, expr: &Expr<'a>) -> Span {
        self.ann.span_of(expr).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    Expr(&'a Expr<'a>),
    /// `int a = 1, b` or `var a`; `ty` is `None` for `var`/`def`.
    Declare {
        ty: Option<TypeExpr<'a>>,
        declarators: &'a [Declarator<'a>],
    },
    If {
        cond: &'a Expr<'a>,
        then_branch: &'a [Stmt<'a>],
        else_branch: Option<&'a [Stmt<'a>]>,
    },
    While {
        cond: &'a Expr<'a>,
        body: &'a [Stmt<'a>],
    },
    For {
        init: Option<&'a Stmt<'a>>,
        cond: Option<&'a Expr<'a>>,
        update: &'a [&'a Expr<'a>],
        body: &'a [Stmt<'a>],
    },
    ForEach {
        ty: Option<TypeExpr<'a>>,
        var: &'a str,
        span: Span,
        iterable: &'a Expr<'a>,
        body: &'a [Stmt<'a>],
    },
    Block(&'a [Stmt<'a>]),
    Return(Option<&'a Expr<'a>>),
    Import {
        path: &'a str,
        wildcard: bool,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator<'a> {
    pub name: &'a str,
    pub span: Span,
    pub init: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    Ident(&'a str),
    Field {
        value: &'a Expr<'a>,
        field: &'a str,
    },
    MethodCall {
        receiver: &'a Expr<'a>,
        method: &'a str,
        args: &'a [&'a Expr<'a>],
    },
    Call {
        name: &'a str,
        args: &'a [&'a Expr<'a>],
    },
    Index {
        value: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    Assign {
        target: &'a Expr<'a>,
        op: AssignOp,
        value: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Boolean {
        op: BoolOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Comparison {
        op: ComparisonOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        expr: &'a Expr<'a>,
    },
    Step {
        target: &'a Expr<'a>,
        op: StepOp,
    },
    Cast {
        ty: TypeExpr<'a>,
        expr: &'a Expr<'a>,
    },
    Ternary {
        cond: &'a Expr<'a>,
        then_branch: &'a Expr<'a>,
        else_branch: &'a Expr<'a>,
    },
    New {
        ty: TypeExpr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    /// `new T[] { .. }`; `ty` is the array type.
    NewArray {
        ty: TypeExpr<'a>,
        items: &'a [&'a Expr<'a>],
    },
    /// `new T[n]`; `ty` is the element type.
    NewSizedArray {
        ty: TypeExpr<'a>,
        len: &'a Expr<'a>,
    },
    InlineArray(&'a [&'a Expr<'a>]),
    InlineList(&'a [&'a Expr<'a>]),
    InlineMap(&'a [(&'a Expr<'a>, &'a Expr<'a>)]),
}

impl<'a> Expr<'a> {
    pub fn as_ptr(&self) -> *const Self {
        self as *const _
    }

    /// The dotted path of an `a.b.c` chain made only of identifiers and
    /// field accesses, if this expression is one.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some((*name).to_string()),
            Expr::Field { value, field } => {
                let mut path = value.dotted_path()?;
                path.push('.');
                path.push_str(field);
                Some(path)
            }
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Literal<'a> {
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Str(&'a str),
    Null,
}

impl<'a> core::fmt::Debug for Literal<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "Int({value})"),
            Literal::Long(value) => write!(f, "Long({value})"),
            Literal::Double(value) => write!(f, "Double({value})"),
            Literal::Bool(b) => write!(f, "Bool({b})"),
            Literal::Str(s) => write!(f, "Str({s:?})"),
            Literal::Null => write!(f, "Null"),
        }
    }
}

/// A type as written in source: `java.util.List<String>[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr<'a> {
    pub path: &'a str,
    pub args: &'a [TypeExpr<'a>],
    pub dims: usize,
    pub span: Span,
}
