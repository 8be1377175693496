//! Core evaluation logic.

use ecow::EcoString;

use crate::analyzer::typed_expr::{Expr, ExprInner, SiteId, TypedExpr};
use crate::api::ExecutionOptions;
use crate::coercion::registry;
use crate::evaluator::operators;
use crate::evaluator::{ExecutionError, ResourceExceededError, RuntimeError};
use crate::optimizer::CallSite;
use crate::optimizer::introspect;
use crate::parser::{AssignOp, BinaryOp, BoolOp, StepOp, UnaryOp};
use crate::scope_stack::ScopeStack;
use crate::types::{ClassKind, TypeDescriptor, builtins};
use crate::values::{Value, Variables};

/// How a statement finished.
enum Flow {
    Normal(Value),
    Return(Value),
}

/// An assignment target with its receiver and index already evaluated.
enum Place<'t> {
    Name(&'t Expr),
    Property {
        receiver: Value,
        name: &'t EcoString,
        site: SiteId,
    },
    Index {
        receiver: Value,
        index: Value,
        site: SiteId,
    },
}

/// Evaluator for analyzed expressions.
///
/// Block locals live in `frames`; top-level variables are read from and
/// written to the caller's `vars`.
pub struct Evaluator<'e> {
    options: &'e ExecutionOptions,
    sites: &'e [CallSite],
    root: &'e Value,
    vars: &'e mut Variables,
    frames: ScopeStack<Value>,
    depth: usize,
    iterations: usize,
}

type Result<T> = core::result::Result<T, ExecutionError>;

impl<'e> Evaluator<'e> {
    pub fn new(
        options: &'e ExecutionOptions,
        sites: &'e [CallSite],
        root: &'e Value,
        vars: &'e mut Variables,
    ) -> Self {
        Self {
            options,
            sites,
            root,
            vars,
            frames: ScopeStack::new(),
            depth: 0,
            iterations: 0,
        }
    }

    /// Run a statement sequence; its value is the value of the last
    /// statement or of the `return` that ended it.
    pub fn run(&mut self, typed: &TypedExpr) -> Result<Value> {
        match self.exec_body(&typed.body)? {
            Flow::Normal(value) | Flow::Return(value) => Ok(value),
        }
    }

    /// Write `value` through the single assignable expression of a setter.
    pub fn run_set(&mut self, typed: &TypedExpr, value: Value) -> Result<()> {
        let Some(target) = typed.body.first() else {
            return Ok(());
        };
        let value = if typed.egress.is_dynamic() {
            value
        } else {
            registry()
                .convert_to(value, &typed.egress)
                .map_err(RuntimeError::from)?
        };
        self.store(target, value)
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(ResourceExceededError::StackOverflow {
                depth: self.depth,
                max_depth: self.options.max_depth,
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        self.iterations += 1;
        match self.options.max_iterations {
            Some(max) if self.iterations > max => {
                Err(ResourceExceededError::IterationLimit { max }.into())
            }
            _ => Ok(()),
        }
    }

    fn site(&self, id: SiteId) -> Option<&'e CallSite> {
        self.sites.get(id.index())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_body(&mut self, body: &[Expr]) -> Result<Flow> {
        let mut last = Value::Null;
        for stmt in body {
            match self.exec(stmt)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_block(&mut self, body: &[Expr]) -> Result<Flow> {
        self.frames.push();
        let flow = self.exec_body(body);
        let _ = self.frames.pop();
        flow
    }

    fn exec(&mut self, stmt: &Expr) -> Result<Flow> {
        self.enter()?;
        let flow = self.exec_inner(stmt);
        self.depth -= 1;
        flow
    }

    fn exec_inner(&mut self, stmt: &Expr) -> Result<Flow> {
        match &stmt.inner {
            ExprInner::Block(body) => self.exec_block(body),

            ExprInner::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.condition(cond)? {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(Flow::Normal(Value::Null))
                }
            }

            ExprInner::While { cond, body } => {
                while self.condition(cond)? {
                    self.tick()?;
                    if let flow @ Flow::Return(_) = self.exec_block(body)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(Value::Null))
            }

            ExprInner::For {
                init,
                cond,
                update,
                body,
            } => {
                self.frames.push();
                let flow = self.exec_for(init.as_deref(), cond.as_deref(), update, body);
                let _ = self.frames.pop();
                flow
            }

            ExprInner::ForEach {
                var,
                declared,
                iterable,
                body,
            } => {
                let items = items_of(self.eval(iterable)?)?;
                for item in items {
                    self.tick()?;
                    let item = match declared {
                        Some(ty) => convert(item, ty)?,
                        None => item,
                    };
                    self.frames.push();
                    let _ = self.frames.declare(var, item);
                    let flow = self.exec_body(body);
                    let _ = self.frames.pop();
                    if let flow @ Flow::Return(_) = flow? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(Value::Null))
            }

            ExprInner::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            _ => Ok(Flow::Normal(self.eval_inner(stmt)?)),
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&Expr>,
        cond: Option<&Expr>,
        update: &[Expr],
        body: &[Expr],
    ) -> Result<Flow> {
        if let Some(init) = init {
            self.exec(init)?;
        }
        loop {
            if let Some(cond) = cond {
                if !self.condition(cond)? {
                    break;
                }
            }
            self.tick()?;
            if let flow @ Flow::Return(_) = self.exec_block(body)? {
                return Ok(flow);
            }
            for step in update {
                self.eval(step)?;
            }
        }
        Ok(Flow::Normal(Value::Null))
    }

    /// Null is false; other non-booleans go through the registry.
    fn condition(&mut self, cond: &Expr) -> Result<bool> {
        truthy(self.eval(cond)?)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Evaluate an expression node.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value> {
        self.enter()?;
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.inner {
            ExprInner::Constant(constant) => Ok(constant.to_value()),

            ExprInner::Local(name) => Ok(self.read_local(name)),

            ExprInner::Input { name, site } => self.read_input(name, *site),

            ExprInner::This => Ok(self.root.clone()),

            ExprInner::ClassRef(class) => Ok(Value::Class(class.clone())),

            ExprInner::StaticField { class, field } => match class.static_field(field) {
                Some(field) => Ok(field.value().clone()),
                None => Err(RuntimeError::NoSuchMember {
                    class: class.name().into(),
                    member: field.clone(),
                }
                .into()),
            },

            ExprInner::Property {
                receiver,
                name,
                site,
            } => {
                let receiver = self.eval(receiver)?;
                let value = match self.site(*site) {
                    Some(site) => site.get(&receiver),
                    None => introspect::get_property(&receiver, name),
                };
                Ok(value?)
            }

            ExprInner::MethodCall {
                receiver,
                name,
                args,
                site,
            } => {
                let receiver = self.eval(receiver)?;
                let args = self.eval_all(args)?;
                let value = match self.site(*site) {
                    Some(site) => site.invoke(&receiver, args),
                    None => introspect::invoke(&receiver, name, args),
                };
                Ok(value?)
            }

            ExprInner::FunctionCall { function, args } => {
                let args = self.eval_all(args)?;
                let args = introspect::bind_args(function.params(), args)?;
                Ok(function.call(&args)?)
            }

            ExprInner::Convert { value, target } => {
                let value = self.eval(value)?;
                match self.eval(target)? {
                    Value::Class(class) => Ok(registry()
                        .convert(value, &class)
                        .map_err(RuntimeError::from)?),
                    other => Err(RuntimeError::ArgumentMismatch {
                        method: "convert".into(),
                        expected: "a Class".into(),
                        found: other.type_name(),
                    }
                    .into()),
                }
            }

            ExprInner::Index {
                receiver,
                index,
                site,
            } => {
                let receiver = self.eval(receiver)?;
                let index = self.eval(index)?;
                let value = match self.site(*site) {
                    Some(site) => site.get_index(&receiver, &index),
                    None => introspect::get_index(&receiver, &index),
                };
                Ok(value?)
            }

            ExprInner::Assign {
                target,
                op,
                value,
                coerce_to,
            } => {
                let place = self.place(target)?;
                let value = match op {
                    AssignOp::Assign => self.eval(value)?,
                    AssignOp::Compound(binary) => {
                        let current = self.read_place(&place)?;
                        let operand = self.eval(value)?;
                        operators::binary(*binary, current, operand)?
                    }
                };
                let value = match coerce_to {
                    Some(ty) => convert(value, ty)?,
                    None => value,
                };
                self.write_place(place, value.clone())?;
                Ok(value)
            }

            ExprInner::Declare {
                name,
                declared,
                init,
                scoped,
            } => {
                let value = match init {
                    Some(init) => self.eval(init)?,
                    None => Value::Null,
                };
                let value = match declared {
                    Some(ty) => convert(value, ty)?,
                    None => value,
                };
                if *scoped {
                    if self.frames.declare(name, value.clone()).is_err() {
                        self.vars.insert(name.to_string(), value.clone());
                    }
                } else {
                    self.vars.insert(name.to_string(), value.clone());
                }
                Ok(value)
            }

            ExprInner::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(operators::binary(*op, left, right)?)
            }

            ExprInner::Boolean { op, left, right } => {
                let left = self.condition(left)?;
                let result = match op {
                    BoolOp::And => left && self.condition(right)?,
                    BoolOp::Or => left || self.condition(right)?,
                };
                Ok(Value::Bool(result))
            }

            ExprInner::Comparison { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(Value::Bool(operators::compare(*op, &left, &right)?))
            }

            ExprInner::Unary { op, expr } => match op {
                UnaryOp::Neg => Ok(operators::negate(self.eval(expr)?)?),
                UnaryOp::Not => Ok(Value::Bool(!self.condition(expr)?)),
            },

            ExprInner::Step { target, op } => {
                let place = self.place(target)?;
                let old = self.read_place(&place)?;
                let delta = match op {
                    StepOp::Incr => BinaryOp::Add,
                    StepOp::Decr => BinaryOp::Sub,
                };
                let new = operators::binary(delta, old.clone(), Value::Int(1))?;
                let new = if target.ty.is_numeric() {
                    convert(new, &target.ty)?
                } else {
                    new
                };
                self.write_place(place, new)?;
                Ok(old)
            }

            ExprInner::Cast { target, expr } => {
                let value = self.eval(expr)?;
                convert(value, target)
            }

            ExprInner::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.condition(cond)? {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }

            ExprInner::New { class, args, ctor } => {
                let args = self.eval_all(args)?;
                Ok(introspect::construct(class, args, *ctor)?)
            }

            ExprInner::NewArray { element, items } => {
                let items = self
                    .eval_all(items)?
                    .into_iter()
                    .map(|item| convert(item, element))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(element.clone(), items))
            }

            ExprInner::NewSizedArray { element, len } => {
                let len = self.eval(len)?;
                let len = match convert(len, &TypeDescriptor::integer())? {
                    Value::Int(n) if n >= 0 => n as usize,
                    other => {
                        return Err(RuntimeError::IndexOutOfBounds {
                            index: other.as_i64().unwrap_or(-1),
                            len: 0,
                        }
                        .into());
                    }
                };
                Ok(Value::array(
                    element.clone(),
                    vec![default_value(element); len],
                ))
            }

            ExprInner::InlineList(items) => Ok(Value::list(self.eval_all(items)?)),

            ExprInner::InlineMap(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    pairs.push((self.eval(key)?, self.eval(value)?));
                }
                Ok(Value::map(pairs))
            }

            ExprInner::Block(_)
            | ExprInner::If { .. }
            | ExprInner::While { .. }
            | ExprInner::For { .. }
            | ExprInner::ForEach { .. }
            | ExprInner::Return(_) => match self.exec_inner(expr)? {
                Flow::Normal(value) | Flow::Return(value) => Ok(value),
            },

            ExprInner::Nop => Ok(Value::Null),
        }
    }

    // ------------------------------------------------------------------
    // Variables and stores
    // ------------------------------------------------------------------

    fn read_local(&self, name: &str) -> Value {
        self.frames
            .lookup(name)
            .or_else(|| self.vars.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Bindings first, then a member of the root context.
    fn read_input(&self, name: &EcoString, site: SiteId) -> Result<Value> {
        if let Some(value) = self.vars.get(name.as_str()) {
            return Ok(value.clone());
        }
        if self.root.is_null() {
            return Err(RuntimeError::UnboundInput { name: name.clone() }.into());
        }
        let value = match self.site(site) {
            Some(site) => site.get(self.root),
            None => introspect::get_property(self.root, name),
        };
        match value {
            Err(RuntimeError::NoSuchMember { .. }) => {
                Err(RuntimeError::UnboundInput { name: name.clone() }.into())
            }
            other => Ok(other?),
        }
    }

    fn store(&mut self, target: &Expr, value: Value) -> Result<()> {
        let place = self.place(target)?;
        self.write_place(place, value)
    }

    /// Evaluate the receiver and index of an assignment target once, so
    /// that a read-modify-write goes through the same element.
    fn place<'t>(&mut self, target: &'t Expr) -> Result<Place<'t>> {
        match &target.inner {
            ExprInner::Property {
                receiver,
                name,
                site,
            } => Ok(Place::Property {
                receiver: self.eval(receiver)?,
                name,
                site: *site,
            }),
            ExprInner::Index {
                receiver,
                index,
                site,
            } => {
                let receiver = self.eval(receiver)?;
                let index = self.eval(index)?;
                Ok(Place::Index {
                    receiver,
                    index,
                    site: *site,
                })
            }
            _ => Ok(Place::Name(target)),
        }
    }

    fn read_place(&mut self, place: &Place<'_>) -> Result<Value> {
        let value = match place {
            Place::Name(target) => return self.eval(target),
            Place::Property {
                receiver,
                name,
                site,
            } => match self.site(*site) {
                Some(site) => site.get(receiver),
                None => introspect::get_property(receiver, name),
            },
            Place::Index {
                receiver,
                index,
                site,
            } => match self.site(*site) {
                Some(site) => site.get_index(receiver, index),
                None => introspect::get_index(receiver, index),
            },
        };
        Ok(value?)
    }

    fn write_place(&mut self, place: Place<'_>, value: Value) -> Result<()> {
        match place {
            Place::Name(target) => self.store_name(target, value),
            Place::Property {
                receiver,
                name,
                site,
            } => {
                let stored = match self.site(site) {
                    Some(site) => site.set(&receiver, value),
                    None => introspect::set_property(&receiver, name, value),
                };
                Ok(stored?)
            }
            Place::Index {
                receiver,
                index,
                site,
            } => {
                let stored = match self.site(site) {
                    Some(site) => site.set_index(&receiver, index, value),
                    None => introspect::set_index(&receiver, index, value),
                };
                Ok(stored?)
            }
        }
    }

    fn store_name(&mut self, target: &Expr, value: Value) -> Result<()> {
        match &target.inner {
            ExprInner::Local(name) => {
                if let Err(value) = self.frames.assign(name, value) {
                    self.vars.insert(name.to_string(), value);
                }
                Ok(())
            }

            ExprInner::Input { name, site } => {
                if self.vars.contains_key(name.as_str()) || self.root.is_null() {
                    self.vars.insert(name.to_string(), value);
                    return Ok(());
                }
                let stored = match self.site(*site) {
                    Some(site) => site.set(self.root, value.clone()),
                    None => introspect::set_property(self.root, name, value.clone()),
                };
                match stored {
                    Err(RuntimeError::NoSuchMember { .. }) => {
                        self.vars.insert(name.to_string(), value);
                        Ok(())
                    }
                    other => Ok(other?),
                }
            }

            _ => Err(RuntimeError::InvalidOperands {
                op: "=".into(),
                left: target.ty.to_string().into(),
                right: value.type_name(),
            }
            .into()),
        }
    }
}

fn convert(value: Value, ty: &TypeDescriptor) -> Result<Value> {
    Ok(registry()
        .convert_to(value, ty)
        .map_err(RuntimeError::from)?)
}

fn items_of(iterable: Value) -> Result<Vec<Value>> {
    match iterable {
        Value::List(list) => Ok(list.snapshot()),
        Value::Array(array) => Ok(array.snapshot()),
        Value::Map(map) => Ok(map.keys()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(RuntimeError::NotIndexable {
            ty: other.type_name(),
        }
        .into()),
    }
}

fn truthy(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => match registry().convert(other.clone(), builtins::boolean()) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => Err(RuntimeError::NonBooleanCondition {
                found: other.type_name(),
            }
            .into()),
        },
    }
}

/// Initial element of `new T[n]`.
fn default_value(element: &TypeDescriptor) -> Value {
    match element.kind() {
        ClassKind::Integer => Value::Int(0),
        ClassKind::Long => Value::Long(0),
        ClassKind::Double => Value::Double(0.0),
        ClassKind::Boolean => Value::Bool(false),
        _ => Value::Null,
    }
}
