use std::sync::Arc;

use crate::analyzer::environment::TypeEnvironment;
use crate::analyzer::error::{CompileError, CompileErrorKind};
use crate::analyzer::typed_expr::{Constant, Expr, ExprInner, SiteId, TypedExpr};
use crate::coercion::registry;
use crate::parser::{
    self, AssignOp, BinaryOp, ComparisonOp, Literal, ParsedExpr, Span, Stmt, TypeExpr, UnaryOp,
};
use crate::scope_stack::ScopeStack;
use crate::types::overload::{self, Resolution};
use crate::types::{Class, ClassKind, ClassTable, FunctionTable, Import, Method, TypeDescriptor};

/// Analyze a statement sequence, populating `env`.
///
/// Nothing is executed. Identifiers that resolve to nothing become inputs
/// unless the environment asks for strong typing.
pub fn analyze(
    parsed: &ParsedExpr<'_>,
    env: &mut TypeEnvironment,
    classes: &ClassTable,
    functions: &FunctionTable,
) -> Result<TypedExpr> {
    let mut analyzer = Analyzer::new(parsed, env, classes, functions);
    let body = analyzer.statements(parsed.body)?;
    let last = body
        .last()
        .map(|expr| expr.ty.clone())
        .unwrap_or_else(TypeDescriptor::null);
    let egress = analyzer
        .returns
        .iter()
        .fold(last, |acc, ty| unify(&acc, ty));
    tracing::debug!(
        variables = analyzer.env.variables().len(),
        inputs = analyzer.env.inputs().len(),
        sites = analyzer.next_site,
        %egress,
        "analyzed expression"
    );
    Ok(TypedExpr {
        body,
        egress,
        site_count: analyzer.next_site,
    })
}

/// Analyze a single assignable expression (`a.b`, `m['k']`, `x`) that a
/// value will later be written through.
pub fn analyze_setter(
    parsed: &ParsedExpr<'_>,
    env: &mut TypeEnvironment,
    classes: &ClassTable,
    functions: &FunctionTable,
) -> Result<TypedExpr> {
    let mut analyzer = Analyzer::new(parsed, env, classes, functions);
    let [Stmt::Expr(target)] = parsed.body else {
        return Err(analyzer.error(
            CompileErrorKind::NotAssignable {
                what: parsed.ann.source.trim().to_string(),
            },
            Span::new(0, parsed.ann.source.len()),
        ));
    };
    let (target, coerce_to) = analyzer.assign_target(*target, &TypeDescriptor::object())?;
    Ok(TypedExpr {
        body: vec![target],
        egress: coerce_to.unwrap_or_else(TypeDescriptor::object),
        site_count: analyzer.next_site,
    })
}

struct Analyzer<'p, 'a> {
    parsed: &'p ParsedExpr<'a>,
    env: &'p mut TypeEnvironment,
    classes: &'p ClassTable,
    functions: &'p FunctionTable,
    scopes: ScopeStack<TypeDescriptor>,
    next_site: u32,
    returns: Vec<TypeDescriptor>,
}

type Result<T> = core::result::Result<T, CompileError>;

impl<'p, 'a> Analyzer<'p, 'a> {
    fn new(
        parsed: &'p ParsedExpr<'a>,
        env: &'p mut TypeEnvironment,
        classes: &'p ClassTable,
        functions: &'p FunctionTable,
    ) -> Self {
        Self {
            parsed,
            env,
            classes,
            functions,
            scopes: ScopeStack::new(),
            next_site: 0,
            returns: Vec::new(),
        }
    }

    fn error(&self, kind: CompileErrorKind, span: Span) -> CompileError {
        tracing::debug!(?kind, "analysis failed");
        CompileError::new(kind, self.parsed.ann.source, span)
    }

    fn span_of(&self, expr: &parser::Expr<'a>) -> Span {
        self.parsed.span_of(expr)
    }

    fn site(&mut self) -> SiteId {
        let id = SiteId(self.next_site);
        self.next_site += 1;
        id
    }

    fn strong(&self) -> bool {
        self.env.is_strong_typing()
    }

    fn strict(&self) -> bool {
        self.env.is_strict_type_enforcement()
    }

    fn node(ty: TypeDescriptor, span: Span, inner: ExprInner) -> Expr {
        Expr { ty, span, inner }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statements(&mut self, stmts: &[Stmt<'a>]) -> Result<Vec<Expr>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.statement(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// Run `f` inside a fresh block scope. Names declared in the block are
    /// remembered so that later loose reads do not turn them into inputs.
    fn in_block<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.scopes.push();
        let result = f(self);
        if let Ok(frame) = self.scopes.pop() {
            for name in frame.names() {
                self.env.note_block_declaration(name);
            }
        }
        result
    }

    fn block(&mut self, stmts: &[Stmt<'a>]) -> Result<Vec<Expr>> {
        self.in_block(|this| this.statements(stmts))
    }

    fn statement(&mut self, stmt: &Stmt<'a>, out: &mut Vec<Expr>) -> Result<()> {
        match stmt {
            Stmt::Expr(expr) => out.push(self.expr(*expr)?),

            Stmt::Declare { ty, declarators } => {
                let declared = ty.as_ref().map(|ty| self.resolve_type(ty)).transpose()?;
                for declarator in declarators.iter() {
                    out.push(self.declaration(declared.as_ref(), declarator)?);
                }
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.condition(*cond)?;
                let span = cond.span.clone();
                let then_branch = self.block(then_branch)?;
                let else_branch = else_branch.map(|stmts| self.block(stmts)).transpose()?;
                out.push(Self::node(
                    TypeDescriptor::object(),
                    span,
                    ExprInner::If {
                        cond: Box::new(cond),
                        then_branch,
                        else_branch,
                    },
                ));
            }

            Stmt::While { cond, body } => {
                let cond = self.condition(*cond)?;
                let span = cond.span.clone();
                let body = self.block(body)?;
                out.push(Self::node(
                    TypeDescriptor::object(),
                    span,
                    ExprInner::While {
                        cond: Box::new(cond),
                        body,
                    },
                ));
            }

            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let node = self.in_block(|this| {
                    let init = match init {
                        Some(stmt) => {
                            let mut nodes = Vec::new();
                            this.statement(stmt, &mut nodes)?;
                            Some(Box::new(Self::single(nodes)))
                        }
                        None => None,
                    };
                    let cond = cond.map(|c| this.condition(c)).transpose()?.map(Box::new);
                    let update = update
                        .iter()
                        .map(|u| this.expr(*u))
                        .collect::<Result<Vec<_>>>()?;
                    let body = this.block(body)?;
                    let span = cond.as_ref().map(|c| c.span.clone()).unwrap_or_default();
                    Ok(Self::node(
                        TypeDescriptor::object(),
                        span,
                        ExprInner::For {
                            init,
                            cond,
                            update,
                            body,
                        },
                    ))
                })?;
                out.push(node);
            }

            Stmt::ForEach {
                ty,
                var,
                span,
                iterable,
                body,
            } => {
                let declared = ty.as_ref().map(|ty| self.resolve_type(ty)).transpose()?;
                let iterable = self.expr(*iterable)?;
                let element = self.element_type_of(&iterable)?;
                let var_ty = declared.clone().unwrap_or(element);
                let node = self.in_block(|this| {
                    this.declare_scoped(var, var_ty);
                    let body = this.block(body)?;
                    Ok(Self::node(
                        TypeDescriptor::object(),
                        span.clone(),
                        ExprInner::ForEach {
                            var: (*var).into(),
                            declared,
                            iterable: Box::new(iterable),
                            body,
                        },
                    ))
                })?;
                out.push(node);
            }

            Stmt::Block(stmts) => {
                let body = self.block(stmts)?;
                let ty = body
                    .last()
                    .map(|e| e.ty.clone())
                    .unwrap_or_else(TypeDescriptor::null);
                out.push(Self::node(ty, Span::default(), ExprInner::Block(body)));
            }

            Stmt::Return(value) => {
                let value = value.map(|v| self.expr(v)).transpose()?;
                let ty = value
                    .as_ref()
                    .map(|v| v.ty.clone())
                    .unwrap_or_else(TypeDescriptor::null);
                self.returns.push(ty.clone());
                let span = value.as_ref().map(|v| v.span.clone()).unwrap_or_default();
                out.push(Self::node(ty, span, ExprInner::Return(value.map(Box::new))));
            }

            Stmt::Import {
                path,
                wildcard,
                span,
            } => {
                self.import(path, *wildcard, span)?;
                out.push(Self::node(
                    TypeDescriptor::null(),
                    span.clone(),
                    ExprInner::Nop,
                ));
            }
        }
        Ok(())
    }

    fn single(mut nodes: Vec<Expr>) -> Expr {
        match nodes.len() {
            1 => nodes.remove(0),
            _ => Self::node(TypeDescriptor::object(), Span::default(), ExprInner::Block(nodes)),
        }
    }

    fn import(&mut self, path: &str, wildcard: bool, span: &Span) -> Result<()> {
        if wildcard {
            let package = path.to_string();
            let found: Vec<Arc<Class>> = self
                .classes
                .classes()
                .filter(|class| class.package() == Some(package.as_str()))
                .cloned()
                .collect();
            if found.is_empty() {
                return Err(self.error(
                    CompileErrorKind::UnknownType {
                        name: format!("{path}.*"),
                    },
                    span.clone(),
                ));
            }
            for class in found {
                self.env.add_import(class.name(), Import::Class(class.clone()));
            }
            return Ok(());
        }
        match self.classes.get(path) {
            Some(class) => {
                let class = class.clone();
                let name = class.name().to_string();
                self.env.add_import(&name, Import::Class(class));
                Ok(())
            }
            None => Err(self.error(
                CompileErrorKind::UnknownType {
                    name: path.to_string(),
                },
                span.clone(),
            )),
        }
    }

    fn declaration(
        &mut self,
        declared: Option<&TypeDescriptor>,
        declarator: &parser::Declarator<'a>,
    ) -> Result<Expr> {
        let init = match declarator.init {
            Some(init) => Some(self.expr_with_hint(init, declared)?),
            None => None,
        };
        if let (Some(declared), Some(init)) = (declared, &init) {
            self.check_coercion(&init.ty, declared, &init.span)?;
        }
        let ty = match (declared, &init) {
            (Some(declared), _) => declared.clone(),
            (None, Some(init)) if !init.ty.is_null() => init.ty.clone(),
            _ => TypeDescriptor::object(),
        };
        let scoped = !self.scopes.is_empty();
        if scoped {
            self.declare_scoped(declarator.name, ty.clone());
        } else {
            self.env.declare_variable(declarator.name, ty.clone());
        }
        self.env.set_last_type_parameters(ty.params());
        Ok(Self::node(
            ty,
            declarator.span.clone(),
            ExprInner::Declare {
                name: declarator.name.into(),
                declared: declared.cloned(),
                init: init.map(Box::new),
                scoped,
            },
        ))
    }

    fn declare_scoped(&mut self, name: &str, ty: TypeDescriptor) {
        // A frame is always open here: callers check `is_empty` or are
        // inside `in_block`.
        let _ = self.scopes.declare(name, ty);
    }

    fn condition(&mut self, cond: &'a parser::Expr<'a>) -> Result<Expr> {
        let cond = self.expr(cond)?;
        let boolean = TypeDescriptor::boolean();
        if !cond.ty.is_boolean() && !cond.ty.is_dynamic() {
            self.check_coercion(&cond.ty, &boolean, &cond.span)?;
        }
        Ok(cond)
    }

    /// Fails under strong typing when `from` cannot be stored as `to`.
    fn check_coercion(&self, from: &TypeDescriptor, to: &TypeDescriptor, span: &Span) -> Result<()> {
        if self.strong()
            && !from.is_dynamic()
            && !to.is_assignable_from(from)
            && !registry().can_coerce(from, to)
        {
            return Err(self.error(
                CompileErrorKind::IllegalCoercion {
                    from: from.to_string(),
                    to: to.to_string(),
                },
                span.clone(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn lookup_class(&self, name: &str) -> Option<Arc<Class>> {
        match self.env.import(name) {
            Some(Import::Class(class)) => Some(class.clone()),
            _ => self.classes.get(name).cloned(),
        }
    }

    fn resolve_type(&self, ty: &TypeExpr<'a>) -> Result<TypeDescriptor> {
        let class = self.lookup_class(ty.path).ok_or_else(|| {
            self.error(
                CompileErrorKind::UnknownType {
                    name: ty.path.to_string(),
                },
                ty.span.clone(),
            )
        })?;
        let params = ty
            .args
            .iter()
            .map(|arg| self.resolve_type(arg))
            .collect::<Result<Vec<_>>>()?;
        let mut resolved = TypeDescriptor::with_params(class, params);
        for _ in 0..ty.dims {
            resolved = TypeDescriptor::array_of(resolved);
        }
        Ok(resolved)
    }

    fn element_type_of(&self, iterable: &Expr) -> Result<TypeDescriptor> {
        let ty = &iterable.ty;
        match ty.kind() {
            ClassKind::List | ClassKind::Array => Ok(ty.element_type()),
            ClassKind::Map => Ok(ty.key_type()),
            ClassKind::String => Ok(TypeDescriptor::string()),
            ClassKind::Object | ClassKind::Null => Ok(TypeDescriptor::object()),
            _ => Err(self.error(
                CompileErrorKind::NotIndexable { ty: ty.to_string() },
                iterable.span.clone(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------

    /// Whether `name` resolves without falling back to classes or inputs
    /// created on the fly.
    fn is_bound_name(&self, name: &str) -> bool {
        self.scopes.lookup(name).is_some()
            || self.env.variable_type(name).is_some()
            || self.env.input_type(name).is_some()
            || name == "this"
            || self.env.import(name).is_some()
            || self.context_member_type(name).is_some()
    }

    fn context_member_type(&self, name: &str) -> Option<TypeDescriptor> {
        let context = self.env.context_type()?;
        if let Some(property) = context.class().property(name) {
            if property.is_readable() {
                return Some(property.ty().resolve(context));
            }
        }
        context
            .class()
            .getter_method(name)
            .map(|getter| getter.ret().resolve(context))
    }

    fn this_node(&self, span: Span) -> Expr {
        let ty = self
            .env
            .context_type()
            .cloned()
            .unwrap_or_else(TypeDescriptor::object);
        Self::node(ty, span, ExprInner::This)
    }

    fn ident(&mut self, name: &str, span: Span) -> Result<Expr> {
        if let Some(ty) = self.scopes.lookup(name) {
            return Ok(Self::node(ty.clone(), span, ExprInner::Local(name.into())));
        }
        if let Some(ty) = self.env.variable_type(name) {
            let ty = ty.clone();
            self.env.set_last_type_parameters(ty.params());
            return Ok(Self::node(ty, span, ExprInner::Local(name.into())));
        }
        if let Some(ty) = self.env.input_type(name) {
            let ty = ty.clone();
            self.env.set_last_type_parameters(ty.params());
            let site = self.site();
            return Ok(Self::node(
                ty,
                span,
                ExprInner::Input {
                    name: name.into(),
                    site,
                },
            ));
        }
        if name == "this" {
            return Ok(self.this_node(span));
        }
        if let Some(Import::Class(class)) = self.env.import(name) {
            return Ok(Self::class_ref(class.clone(), span));
        }
        if let Some(ty) = self.context_member_type(name) {
            self.env.set_last_type_parameters(ty.params());
            let site = self.site();
            let receiver = self.this_node(span.clone());
            return Ok(Self::node(
                ty,
                span,
                ExprInner::Property {
                    receiver: Box::new(receiver),
                    name: name.into(),
                    site,
                },
            ));
        }
        if let Some(class) = self.classes.get(name) {
            return Ok(Self::class_ref(class.clone(), span));
        }
        if self.strong() || self.strict() {
            return Err(self.error(
                CompileErrorKind::UnresolvedSymbol {
                    name: name.to_string(),
                },
                span,
            ));
        }
        if self.env.was_block_declared(name) {
            self.env.declare_variable(name, TypeDescriptor::object());
            return Ok(Self::node(
                TypeDescriptor::object(),
                span,
                ExprInner::Local(name.into()),
            ));
        }
        tracing::trace!(name, "new input");
        self.env.add_input(name, TypeDescriptor::object());
        let site = self.site();
        Ok(Self::node(
            TypeDescriptor::object(),
            span,
            ExprInner::Input {
                name: name.into(),
                site,
            },
        ))
    }

    fn class_ref(class: Arc<Class>, span: Span) -> Expr {
        Self::node(
            TypeDescriptor::class_of(&class),
            span,
            ExprInner::ClassRef(class),
        )
    }

    /// Resolve `a.b.C.d` where `a` is not a known name but some prefix names
    /// a class, so that package segments never become inputs.
    fn qualified(&mut self, expr: &'a parser::Expr<'a>) -> Result<Option<Expr>> {
        let Some(path) = expr.dotted_path() else {
            return Ok(None);
        };
        let segments: Vec<&str> = path.split('.').collect();
        if segments.len() < 2 || self.is_bound_name(segments[0]) {
            return Ok(None);
        }
        let span = self.span_of(expr);
        for split in (1..=segments.len()).rev() {
            let prefix = segments[..split].join(".");
            let Some(class) = self.lookup_class(&prefix) else {
                continue;
            };
            let mut node = Self::class_ref(class, span.clone());
            for member in &segments[split..] {
                node = self.member(node, member, span.clone())?;
            }
            return Ok(Some(node));
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, expr: &'a parser::Expr<'a>) -> Result<Expr> {
        self.expr_with_hint(expr, None)
    }

    /// Analyze `expr`; `hint` is the declared type it will be stored as,
    /// which gives inline arrays their element type.
    fn expr_with_hint(
        &mut self,
        expr: &'a parser::Expr<'a>,
        hint: Option<&TypeDescriptor>,
    ) -> Result<Expr> {
        let span = self.span_of(expr);
        match expr {
            parser::Expr::Literal(literal) => Ok(Self::literal(literal, span)),

            parser::Expr::Ident(name) => self.ident(name, span),

            parser::Expr::Field { value, field } => {
                if let Some(node) = self.qualified(expr)? {
                    return Ok(node);
                }
                let receiver = self.expr(value)?;
                self.member(receiver, field, span)
            }

            parser::Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.expr(receiver)?;
                let args = self.exprs(args)?;
                self.method_call(receiver, method, args, span)
            }

            parser::Expr::Call { name, args } => self.call(name, args, span),

            parser::Expr::Index { value, index } => {
                let receiver = self.expr(value)?;
                let index = self.expr(index)?;
                self.index(receiver, index, span)
            }

            parser::Expr::Assign { target, op, value } => self.assign(target, *op, value, span),

            parser::Expr::Binary { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                let ty = self.arithmetic_type(*op, &left.ty, &right.ty, &span)?;
                Ok(Self::node(
                    ty,
                    span,
                    ExprInner::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                ))
            }

            parser::Expr::Boolean { op, left, right } => {
                let left = self.condition(left)?;
                let right = self.condition(right)?;
                Ok(Self::node(
                    TypeDescriptor::boolean(),
                    span,
                    ExprInner::Boolean {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                ))
            }

            parser::Expr::Comparison { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                if !matches!(op, ComparisonOp::Eq | ComparisonOp::Neq)
                    && !Self::comparable(&left.ty, &right.ty)
                    && self.strong()
                {
                    return Err(self.invalid_operands(op.symbol(), &left.ty, &right.ty, span));
                }
                Ok(Self::node(
                    TypeDescriptor::boolean(),
                    span,
                    ExprInner::Comparison {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                ))
            }

            parser::Expr::Unary { op, expr } => {
                let operand = match op {
                    UnaryOp::Not => self.condition(expr)?,
                    UnaryOp::Neg => self.expr(expr)?,
                };
                let ty = match op {
                    UnaryOp::Not => TypeDescriptor::boolean(),
                    UnaryOp::Neg if operand.ty.is_numeric() => operand.ty.clone(),
                    UnaryOp::Neg if operand.ty.is_dynamic() || !self.strong() => {
                        TypeDescriptor::object()
                    }
                    UnaryOp::Neg => {
                        return Err(self.invalid_operands("-", &operand.ty, &operand.ty, span));
                    }
                };
                Ok(Self::node(
                    ty,
                    span,
                    ExprInner::Unary {
                        op: *op,
                        expr: Box::new(operand),
                    },
                ))
            }

            parser::Expr::Step { target, op } => {
                let target = self.expr(target)?;
                if !target.is_assignable() {
                    return Err(self.not_assignable(span));
                }
                if !target.ty.is_numeric() && !target.ty.is_dynamic() && self.strong() {
                    let symbol = match op {
                        parser::StepOp::Incr => "++",
                        parser::StepOp::Decr => "--",
                    };
                    return Err(self.invalid_operands(symbol, &target.ty, &target.ty, span));
                }
                Ok(Self::node(
                    target.ty.clone(),
                    span,
                    ExprInner::Step {
                        target: Box::new(target),
                        op: *op,
                    },
                ))
            }

            parser::Expr::Cast { ty, expr } => {
                let target = self.resolve_type(ty)?;
                let value = self.expr_with_hint(expr, Some(&target))?;
                let castable = value.ty.is_dynamic()
                    || target.is_assignable_from(&value.ty)
                    || value.ty.is_assignable_from(&target);
                if !castable {
                    self.check_coercion(&value.ty, &target, &span)?;
                }
                Ok(Self::node(
                    target.clone(),
                    span,
                    ExprInner::Cast {
                        target,
                        expr: Box::new(value),
                    },
                ))
            }

            parser::Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.condition(cond)?;
                let then_branch = self.expr_with_hint(then_branch, hint)?;
                let else_branch = self.expr_with_hint(else_branch, hint)?;
                let ty = unify(&then_branch.ty, &else_branch.ty);
                Ok(Self::node(
                    ty,
                    span,
                    ExprInner::Ternary {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                    },
                ))
            }

            parser::Expr::New { ty, args } => {
                let ty = self.resolve_type(ty)?;
                let args = self.exprs(args)?;
                self.construct(ty, args, span)
            }

            parser::Expr::NewArray { ty, items } => {
                let array = self.resolve_type(ty)?;
                let element = array.element_type();
                let items = self.array_items(items, &element)?;
                Ok(Self::node(
                    array,
                    span,
                    ExprInner::NewArray { element, items },
                ))
            }

            parser::Expr::NewSizedArray { ty, len } => {
                let element = self.resolve_type(ty)?;
                let len = self.expr(len)?;
                if !len.ty.is_numeric() && !len.ty.is_dynamic() {
                    self.check_coercion(&len.ty, &TypeDescriptor::integer(), &len.span)?;
                }
                Ok(Self::node(
                    TypeDescriptor::array_of(element.clone()),
                    span,
                    ExprInner::NewSizedArray {
                        element,
                        len: Box::new(len),
                    },
                ))
            }

            parser::Expr::InlineArray(items) => {
                let element = match hint {
                    Some(hint) if hint.is_array() => hint.element_type(),
                    _ => {
                        let analyzed = self.exprs(items)?;
                        let element = common_type(analyzed.iter().map(|e| &e.ty));
                        return Ok(Self::node(
                            TypeDescriptor::array_of(element.clone()),
                            span,
                            ExprInner::NewArray {
                                element,
                                items: analyzed,
                            },
                        ));
                    }
                };
                let items = self.array_items(items, &element)?;
                Ok(Self::node(
                    TypeDescriptor::array_of(element.clone()),
                    span,
                    ExprInner::NewArray { element, items },
                ))
            }

            parser::Expr::InlineList(items) => {
                let items = self.exprs(items)?;
                let element = common_type(items.iter().map(|e| &e.ty));
                let ty = TypeDescriptor::list_of(element);
                self.env.set_last_type_parameters(ty.params());
                Ok(Self::node(ty, span, ExprInner::InlineList(items)))
            }

            parser::Expr::InlineMap(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| Ok((self.expr(*k)?, self.expr(*v)?)))
                    .collect::<Result<Vec<_>>>()?;
                let key = common_type(entries.iter().map(|(k, _)| &k.ty));
                let value = common_type(entries.iter().map(|(_, v)| &v.ty));
                let ty = TypeDescriptor::map_of(key, value);
                self.env.set_last_type_parameters(ty.params());
                Ok(Self::node(ty, span, ExprInner::InlineMap(entries)))
            }
        }
    }

    fn exprs(&mut self, exprs: &[&'a parser::Expr<'a>]) -> Result<Vec<Expr>> {
        exprs.iter().map(|e| self.expr(*e)).collect()
    }

    fn array_items(
        &mut self,
        items: &[&'a parser::Expr<'a>],
        element: &TypeDescriptor,
    ) -> Result<Vec<Expr>> {
        items
            .iter()
            .map(|item| {
                let item = self.expr_with_hint(*item, Some(element))?;
                self.check_coercion(&item.ty, element, &item.span)?;
                Ok(item)
            })
            .collect()
    }

    fn literal(literal: &Literal<'_>, span: Span) -> Expr {
        let (ty, constant) = match literal {
            Literal::Int(i) => (TypeDescriptor::integer(), Constant::Int(*i)),
            Literal::Long(l) => (TypeDescriptor::long(), Constant::Long(*l)),
            Literal::Double(d) => (TypeDescriptor::double(), Constant::Double(*d)),
            Literal::Bool(b) => (TypeDescriptor::boolean(), Constant::Bool(*b)),
            Literal::Str(s) => (TypeDescriptor::string(), Constant::Str((*s).into())),
            Literal::Null => (TypeDescriptor::null(), Constant::Null),
        };
        Self::node(ty, span, ExprInner::Constant(constant))
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    fn unresolved_member(&self, receiver: &TypeDescriptor, member: &str, span: Span) -> CompileError {
        self.error(
            CompileErrorKind::UnresolvedMember {
                receiver: receiver.to_string(),
                member: member.to_string(),
            },
            span,
        )
    }

    /// The class a `Class`-typed receiver stands for.
    fn static_target(receiver: &Expr) -> Option<Arc<Class>> {
        match &receiver.inner {
            ExprInner::ClassRef(class) => Some(class.clone()),
            _ if receiver.ty.kind() == ClassKind::Class => receiver
                .ty
                .params()
                .first()
                .map(|param| param.class().clone())
                .filter(|class| !class.is_dynamic()),
            _ => None,
        }
    }

    fn member(&mut self, receiver: Expr, name: &str, span: Span) -> Result<Expr> {
        let receiver_ty = receiver.ty.clone();

        if let Some(class) = Self::static_target(&receiver) {
            if let Some(field) = class.static_field(name) {
                let ty = field.ty().clone();
                self.env.set_last_type_parameters(ty.params());
                return Ok(Self::node(
                    ty,
                    span,
                    ExprInner::StaticField {
                        class,
                        field: name.into(),
                    },
                ));
            }
        }

        let ty = match receiver_ty.kind() {
            ClassKind::Object | ClassKind::Null => {
                if self.strong() && self.strict() {
                    return Err(self.unresolved_member(&receiver_ty, name, span));
                }
                TypeDescriptor::object()
            }
            ClassKind::Map => receiver_ty.value_type(),
            ClassKind::Array if name == "length" => TypeDescriptor::integer(),
            _ => match self.member_type(&receiver_ty, name) {
                Some(ty) => ty,
                None if self.strong() => {
                    return Err(self.unresolved_member(&receiver_ty, name, span));
                }
                None => TypeDescriptor::object(),
            },
        };
        self.env.set_last_type_parameters(ty.params());
        let site = self.site();
        Ok(Self::node(
            ty,
            span,
            ExprInner::Property {
                receiver: Box::new(receiver),
                name: name.into(),
                site,
            },
        ))
    }

    /// Static type of property `name` read from a `receiver`, with the
    /// receiver's generic arguments substituted.
    fn member_type(&self, receiver: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        let class = receiver.class();
        if let Some(property) = class.property(name) {
            if property.is_readable() {
                return Some(property.ty().resolve(receiver));
            }
        }
        class
            .getter_method(name)
            .map(|getter| getter.ret().resolve(receiver))
    }

    fn method_call(
        &mut self,
        receiver: Expr,
        name: &str,
        args: Vec<Expr>,
        span: Span,
    ) -> Result<Expr> {
        let receiver_ty = receiver.ty.clone();
        let arg_types: Vec<TypeDescriptor> = args.iter().map(|a| a.ty.clone()).collect();

        let ty = match Self::static_target(&receiver) {
            Some(class) if !class.static_methods(name).is_empty() => {
                let owner = TypeDescriptor::of(&class);
                let candidates = class.static_methods(name);
                self.select_overload(&owner, &candidates, name, &arg_types, &span)?
            }
            _ if receiver_ty.is_dynamic() || receiver_ty.is_null() => {
                if self.strong() && self.strict() {
                    return Err(self.unresolved_member(&receiver_ty, name, span));
                }
                TypeDescriptor::object()
            }
            _ => {
                let candidates = receiver_ty.class().methods(name);
                if candidates.is_empty() {
                    if self.strong() {
                        return Err(self.no_such_method(&receiver_ty, name, &arg_types, span));
                    }
                    TypeDescriptor::object()
                } else {
                    self.select_overload(&receiver_ty, &candidates, name, &arg_types, &span)?
                }
            }
        };

        self.env.set_last_type_parameters(ty.params());
        let site = self.site();
        Ok(Self::node(
            ty,
            span,
            ExprInner::MethodCall {
                receiver: Box::new(receiver),
                name: name.into(),
                args,
                site,
            },
        ))
    }

    /// Pick the best of `candidates` for `args`; the result is the chosen
    /// method's return type, resolved against `owner`.
    fn select_overload(
        &self,
        owner: &TypeDescriptor,
        candidates: &[Arc<Method>],
        name: &str,
        args: &[TypeDescriptor],
        span: &Span,
    ) -> Result<TypeDescriptor> {
        let params: Vec<Vec<TypeDescriptor>> = candidates
            .iter()
            .map(|m| m.params().iter().map(|p| p.resolve(owner)).collect())
            .collect();
        match overload::resolve(&params, args, |from, to| registry().can_coerce(from, to)) {
            Resolution::Unique { index, coerced } => {
                tracing::trace!(name, index, coerced, "resolved overload");
                Ok(candidates[index].ret().resolve(owner))
            }
            Resolution::Deferred => {
                let returns: Vec<TypeDescriptor> = candidates
                    .iter()
                    .filter(|m| m.arity() == args.len())
                    .map(|m| m.ret().resolve(owner))
                    .collect();
                Ok(match returns.split_first() {
                    Some((first, rest)) if rest.iter().all(|r| r == first) => first.clone(),
                    _ => TypeDescriptor::object(),
                })
            }
            Resolution::Ambiguous(indices) => Err(self.error(
                CompileErrorKind::AmbiguousOverload {
                    receiver: owner.to_string(),
                    name: name.to_string(),
                    candidates: indices
                        .iter()
                        .map(|&i| signature(name, &params[i]))
                        .collect(),
                },
                span.clone(),
            )),
            Resolution::NoMatch => Err(self.no_such_method(owner, name, args, span.clone())),
        }
    }

    fn no_such_method(
        &self,
        receiver: &TypeDescriptor,
        name: &str,
        args: &[TypeDescriptor],
        span: Span,
    ) -> CompileError {
        self.error(
            CompileErrorKind::NoSuchMethod {
                receiver: receiver.to_string(),
                name: name.to_string(),
                args: args.iter().map(ToString::to_string).collect(),
            },
            span,
        )
    }

    fn call(&mut self, name: &str, args: &[&'a parser::Expr<'a>], span: Span) -> Result<Expr> {
        if name == "convert" && args.len() == 2 {
            let value = self.expr(args[0])?;
            let target = self.expr(args[1])?;
            let ty = match Self::static_target(&target) {
                Some(class) => TypeDescriptor::of(&class),
                None => TypeDescriptor::object(),
            };
            return Ok(Self::node(
                ty,
                span,
                ExprInner::Convert {
                    value: Box::new(value),
                    target: Box::new(target),
                },
            ));
        }

        let function = match self.env.import(name) {
            Some(Import::Function(function)) => Some(function.clone()),
            _ => self.functions.get(name).cloned(),
        };
        let args = self.exprs(args)?;

        if let Some(function) = function {
            let arg_types: Vec<TypeDescriptor> = args.iter().map(|a| a.ty.clone()).collect();
            let params = [function.params().to_vec()];
            if overload::resolve(&params, &arg_types, |from, to| registry().can_coerce(from, to))
                == Resolution::NoMatch
            {
                return Err(self.error(
                    CompileErrorKind::NoSuchMethod {
                        receiver: "function".to_string(),
                        name: name.to_string(),
                        args: arg_types.iter().map(ToString::to_string).collect(),
                    },
                    span,
                ));
            }
            let ty = function.ret().clone();
            return Ok(Self::node(ty, span, ExprInner::FunctionCall { function, args }));
        }

        // A bare call is a method of the root context.
        let receiver = self.this_node(span.clone());
        self.method_call(receiver, name, args, span)
    }

    fn index(&mut self, receiver: Expr, index: Expr, span: Span) -> Result<Expr> {
        let receiver_ty = receiver.ty.clone();
        let ty = match receiver_ty.kind() {
            ClassKind::List | ClassKind::Array => receiver_ty.element_type(),
            ClassKind::Map => receiver_ty.value_type(),
            ClassKind::Object | ClassKind::Null => {
                if self.strong() && self.strict() {
                    return Err(self.unresolved_member(&receiver_ty, "[]", span));
                }
                TypeDescriptor::object()
            }
            _ => {
                return Err(self.error(
                    CompileErrorKind::NotIndexable {
                        ty: receiver_ty.to_string(),
                    },
                    span,
                ));
            }
        };
        self.env.set_last_type_parameters(ty.params());
        let site = self.site();
        Ok(Self::node(
            ty,
            span,
            ExprInner::Index {
                receiver: Box::new(receiver),
                index: Box::new(index),
                site,
            },
        ))
    }

    fn construct(&mut self, ty: TypeDescriptor, args: Vec<Expr>, span: Span) -> Result<Expr> {
        let class = ty.class().clone();
        let constructors = class.constructors();
        let arg_types: Vec<TypeDescriptor> = args.iter().map(|a| a.ty.clone()).collect();
        let params: Vec<Vec<TypeDescriptor>> = constructors
            .iter()
            .map(|c| c.params().iter().map(|p| p.resolve(&ty)).collect())
            .collect();
        let resolution = if constructors.is_empty() && args.is_empty() {
            // Default construction from slot defaults.
            Resolution::Deferred
        } else {
            overload::resolve(&params, &arg_types, |from, to| registry().can_coerce(from, to))
        };
        let ctor = match resolution {
            Resolution::Unique { index, .. } => Some(index),
            Resolution::Deferred => None,
            Resolution::Ambiguous(indices) => {
                return Err(self.error(
                    CompileErrorKind::AmbiguousOverload {
                        receiver: ty.to_string(),
                        name: "new".to_string(),
                        candidates: indices
                            .iter()
                            .map(|&i| signature(class.name(), &params[i]))
                            .collect(),
                    },
                    span,
                ));
            }
            Resolution::NoMatch => {
                return Err(self.no_such_method(&ty, "new", &arg_types, span));
            }
        };
        self.env.set_last_type_parameters(ty.params());
        Ok(Self::node(
            ty,
            span,
            ExprInner::New { class, args, ctor },
        ))
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn not_assignable(&self, span: Span) -> CompileError {
        self.error(
            CompileErrorKind::NotAssignable {
                what: span.str_of(self.parsed.ann.source).to_string(),
            },
            span,
        )
    }

    fn assign(
        &mut self,
        target: &'a parser::Expr<'a>,
        op: AssignOp,
        value: &'a parser::Expr<'a>,
        span: Span,
    ) -> Result<Expr> {
        let (target, value) = match op {
            AssignOp::Assign => {
                let value = self.expr(value)?;
                let (target, coerce_to) = self.assign_target(target, &value.ty)?;
                if let Some(to) = &coerce_to {
                    self.check_coercion(&value.ty, to, &value.span)?;
                }
                let ty = coerce_to.clone().unwrap_or_else(|| value.ty.clone());
                return Ok(Self::node(
                    ty,
                    span,
                    ExprInner::Assign {
                        target: Box::new(target),
                        op,
                        value: Box::new(value),
                        coerce_to,
                    },
                ));
            }
            AssignOp::Compound(_) => {
                let target = self.expr(target)?;
                let value = self.expr(value)?;
                (target, value)
            }
        };
        if !target.is_assignable() {
            return Err(self.not_assignable(target.span.clone()));
        }
        let AssignOp::Compound(binary) = op else {
            return Err(self.not_assignable(span));
        };
        let result = self.arithmetic_type(binary, &target.ty, &value.ty, &span)?;
        let coerce_to = (!target.ty.is_dynamic()).then(|| target.ty.clone());
        if let Some(to) = &coerce_to {
            self.check_coercion(&result, to, &span)?;
        }
        Ok(Self::node(
            coerce_to.clone().unwrap_or(result),
            span,
            ExprInner::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
                coerce_to,
            },
        ))
    }

    /// Analyze the left side of `=`. Returns the target and the static type
    /// stored values are converted to, if known.
    fn assign_target(
        &mut self,
        target: &'a parser::Expr<'a>,
        value_ty: &TypeDescriptor,
    ) -> Result<(Expr, Option<TypeDescriptor>)> {
        let span = self.span_of(target);
        let node = match target {
            parser::Expr::Ident(name) => {
                if let Some(ty) = self.scopes.lookup(name) {
                    Self::node(ty.clone(), span, ExprInner::Local((*name).into()))
                } else if let Some(ty) = self.env.variable_type(name) {
                    Self::node(ty.clone(), span, ExprInner::Local((*name).into()))
                } else if let Some(ty) = self.env.input_type(name) {
                    let ty = ty.clone();
                    let site = self.site();
                    Self::node(
                        ty,
                        span,
                        ExprInner::Input {
                            name: (*name).into(),
                            site,
                        },
                    )
                } else if self.context_member_type(name).is_some() {
                    self.ident(name, span)?
                } else {
                    // First assignment to an unknown name declares it.
                    let ty = if value_ty.is_null() {
                        TypeDescriptor::object()
                    } else {
                        value_ty.clone()
                    };
                    tracing::trace!(name, %ty, "variable declared by assignment");
                    self.env.declare_variable(name, ty.clone());
                    return Ok((
                        Self::node(ty, span, ExprInner::Local((*name).into())),
                        None,
                    ));
                }
            }
            parser::Expr::Field { .. } | parser::Expr::Index { .. } => {
                let node = self.expr(target)?;
                if let ExprInner::Property { receiver, name, .. } = &node.inner {
                    self.check_writable(&receiver.ty, name, &span)?;
                }
                node
            }
            _ => return Err(self.not_assignable(span)),
        };
        if !node.is_assignable() {
            return Err(self.not_assignable(node.span.clone()));
        }
        let coerce_to = (!node.ty.is_dynamic()).then(|| node.ty.clone());
        Ok((node, coerce_to))
    }

    fn check_writable(&self, receiver: &TypeDescriptor, name: &str, span: &Span) -> Result<()> {
        if receiver.is_dynamic() || receiver.kind() == ClassKind::Map {
            return Ok(());
        }
        let class = receiver.class();
        let writable = match class.property(name) {
            Some(property) => property.is_writable(),
            None => class.setter_method(name).is_some(),
        };
        if !writable && self.strong() {
            return Err(self.error(
                CompileErrorKind::NotAssignable {
                    what: format!("{}.{}", receiver, name),
                },
                span.clone(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn invalid_operands(
        &self,
        op: &str,
        left: &TypeDescriptor,
        right: &TypeDescriptor,
        span: Span,
    ) -> CompileError {
        self.error(
            CompileErrorKind::InvalidOperands {
                op: op.to_string(),
                left: left.to_string(),
                right: right.to_string(),
            },
            span,
        )
    }

    fn arithmetic_type(
        &self,
        op: BinaryOp,
        left: &TypeDescriptor,
        right: &TypeDescriptor,
        span: &Span,
    ) -> Result<TypeDescriptor> {
        if op == BinaryOp::Add && (left.is_string() || right.is_string()) {
            return Ok(TypeDescriptor::string());
        }
        if let Some(ty) = promote(left, right) {
            return Ok(ty);
        }
        if left.is_dynamic() || right.is_dynamic() || !self.strong() {
            return Ok(TypeDescriptor::object());
        }
        Err(self.invalid_operands(op.symbol(), left, right, span.clone()))
    }

    fn comparable(left: &TypeDescriptor, right: &TypeDescriptor) -> bool {
        left.is_dynamic()
            || right.is_dynamic()
            || (left.is_numeric() && right.is_numeric())
            || (left.is_string() && right.is_string())
    }
}

fn signature(name: &str, params: &[TypeDescriptor]) -> String {
    let params: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("{}({})", name, params.join(", "))
}

fn numeric_rank(ty: &TypeDescriptor) -> Option<u8> {
    match ty.kind() {
        ClassKind::Integer => Some(0),
        ClassKind::Long => Some(1),
        ClassKind::Double => Some(2),
        _ => None,
    }
}

/// The wider of two numeric types.
fn promote(left: &TypeDescriptor, right: &TypeDescriptor) -> Option<TypeDescriptor> {
    let (l, r) = (numeric_rank(left)?, numeric_rank(right)?);
    Some(if l >= r { left.clone() } else { right.clone() })
}

/// The most specific type both `a` and `b` fit in.
pub(crate) fn unify(a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
    if a == b || b.is_null() {
        return a.clone();
    }
    if a.is_null() {
        return b.clone();
    }
    if let Some(ty) = promote(a, b) {
        return ty;
    }
    if a.is_assignable_from(b) && !a.params().is_empty() {
        return a.clone();
    }
    if b.is_assignable_from(a) && !b.params().is_empty() {
        return b.clone();
    }
    if b.class().is_subclass_of(a.class()) {
        return TypeDescriptor::new(a.class().clone());
    }
    if a.class().is_subclass_of(b.class()) {
        return TypeDescriptor::new(b.class().clone());
    }
    TypeDescriptor::object()
}

fn common_type<'t>(types: impl Iterator<Item = &'t TypeDescriptor>) -> TypeDescriptor {
    types
        .fold(None, |acc: Option<TypeDescriptor>, ty| {
            Some(match acc {
                None => ty.clone(),
                Some(acc) => unify(&acc, ty),
            })
        })
        .filter(|ty| !ty.is_null())
        .unwrap_or_else(TypeDescriptor::object)
}
