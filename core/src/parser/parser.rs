use core::cell::Cell;

use bumpalo::Bump;
use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::parser::error::{ParseError, convert_pest_error};
use crate::parser::parsed_expr::{Declarator, Expr, Literal, ParsedExpr, Stmt, TypeExpr};
use crate::parser::syntax::AnnotatedSource;
use crate::parser::{AssignOp, BinaryOp, BoolOp, ComparisonOp, Span, StepOp, UnaryOp};

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::infix(Rule::or, Assoc::Left))             // `||`
        .op(Op::infix(Rule::and, Assoc::Left))            // `&&`
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left)
        )                                                 // `==`, `!=`
        .op(
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left)
        )                                                 // `<`, `<=`, `>`, `>=`
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                 // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::rem, Assoc::Left)
        )                                                 // `*`, `/`, `%`
        .op(
            Op::prefix(Rule::neg) |
            Op::prefix(Rule::not) |
            Op::prefix(Rule::cast)
        )                                                 // `-`, `!`, `(T)`
        .op(
            Op::postfix(Rule::method_call) |
            Op::postfix(Rule::field) |
            Op::postfix(Rule::index) |
            Op::postfix(Rule::incr) |
            Op::postfix(Rule::decr)
        )                                                 // `.m()`, `.f`, `[i]`, `++`, `--`
        // (highest precedence)
        ;
}

/// Default limit on expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 500;

#[derive(Parser)]
#[grammar = "parser/brisk.pest"]
pub struct BriskParser;

type PestError = pest::error::Error<Rule>;

fn custom_error(span: pest::Span<'_>, message: impl Into<String>) -> PestError {
    PestError::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.into(),
        },
        span,
    )
}

fn is_keyword_token(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_if
            | Rule::kw_else
            | Rule::kw_while
            | Rule::kw_for
            | Rule::kw_return
            | Rule::kw_new
            | Rule::kw_import
            | Rule::assign_eq
    )
}

/// Inner pairs without keyword tokens.
fn children<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword_token(p.as_rule()))
}

pub fn parse<'a>(arena: &'a Bump, source: &'a str) -> Result<ParsedExpr<'a>, ParseError> {
    parse_with_max_depth(arena, source, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_max_depth<'a>(
    arena: &'a Bump,
    source: &'a str,
    max_depth: usize,
) -> Result<ParsedExpr<'a>, ParseError> {
    let ann = arena.alloc(AnnotatedSource::new(arena, source));
    let builder = TreeBuilder {
        arena,
        ann,
        depth: Cell::new(0),
        max_depth,
    };
    let result = BriskParser::parse(Rule::main, source).and_then(|pairs| {
        let statements = pairs
            .flatten()
            .find(|p| p.as_rule() == Rule::statements)
            .ok_or_else(|| custom_error(empty_span(source), "missing statements"))?;
        builder.statements(statements)
    });
    match result {
        Ok(body) => {
            tracing::debug!(statements = body.len(), "parsed source");
            Ok(ParsedExpr { body, ann })
        }
        Err(err) => Err(convert_pest_error(err, source)),
    }
}

fn empty_span(source: &str) -> pest::Span<'_> {
    let start = pest::Position::from_start(source);
    start.span(&start)
}

struct TreeBuilder<'a> {
    arena: &'a Bump,
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
    depth: Cell<usize>,
    max_depth: usize,
}

impl<'a> TreeBuilder<'a> {
    fn alloc(&self, expr: Expr<'a>, span: Span) -> &'a Expr<'a> {
        let expr = self.arena.alloc(expr);
        self.ann.add_span(expr, span);
        expr
    }

    fn span_of(&self, expr: &Expr<'a>) -> Span {
        self.ann.span_of(expr).unwrap_or_default()
    }

    fn statements(&self, pair: Pair<'_, Rule>) -> Result<&'a [Stmt<'a>], PestError> {
        let stmts = pair
            .into_inner()
            .map(|p| self.statement(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.arena.alloc_slice_fill_iter(stmts))
    }

    fn body(&self, pair: Pair<'_, Rule>) -> Result<&'a [Stmt<'a>], PestError> {
        let span = pair.as_span();
        let inner = children(pair)
            .next()
            .ok_or_else(|| custom_error(span, "empty body"))?;
        if inner.as_rule() == Rule::block {
            let statements = inner
                .into_inner()
                .next()
                .ok_or_else(|| custom_error(span, "missing block statements"))?;
            return self.statements(statements);
        }
        let stmt = self.statement(inner)?;
        Ok(self.arena.alloc_slice_fill_iter([stmt]))
    }

    fn statement(&self, pair: Pair<'_, Rule>) -> Result<Stmt<'a>, PestError> {
        let span = pair.as_span();
        match pair.as_rule() {
            Rule::block => {
                let statements = pair
                    .into_inner()
                    .next()
                    .ok_or_else(|| custom_error(span, "missing block statements"))?;
                Ok(Stmt::Block(self.statements(statements)?))
            }
            Rule::if_stmt => {
                let mut inner = children(pair);
                let cond = self.expr(next(&mut inner, span)?)?;
                let then_branch = self.body(next(&mut inner, span)?)?;
                let else_branch = inner.next().map(|p| self.body(p)).transpose()?;
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            Rule::while_stmt => {
                let mut inner = children(pair);
                let cond = self.expr(next(&mut inner, span)?)?;
                let body = self.body(next(&mut inner, span)?)?;
                Ok(Stmt::While { cond, body })
            }
            Rule::foreach_stmt => {
                let mut inner = children(pair);
                let var_pair = next(&mut inner, span)?;
                let iterable = self.expr(next(&mut inner, span)?)?;
                let body = self.body(next(&mut inner, span)?)?;
                let mut ty = None;
                let mut var = None;
                for part in var_pair.into_inner() {
                    match part.as_rule() {
                        Rule::type_expr => ty = Some(self.type_expr(part)?),
                        Rule::ident => var = Some(part),
                        _ => {}
                    }
                }
                let var = var.ok_or_else(|| custom_error(span, "missing loop variable"))?;
                Ok(Stmt::ForEach {
                    ty,
                    var: self.arena.alloc_str(var.as_str()),
                    span: var.as_span().into(),
                    iterable,
                    body,
                })
            }
            Rule::for_stmt => {
                let mut init = None;
                let mut cond = None;
                let mut update: &'a [&'a Expr<'a>] = &[];
                let mut body: &'a [Stmt<'a>] = &[];
                for part in children(pair) {
                    match part.as_rule() {
                        Rule::for_init => {
                            let stmt = self.statement(
                                part.into_inner()
                                    .next()
                                    .ok_or_else(|| custom_error(span, "empty initializer"))?,
                            )?;
                            init = Some(&*self.arena.alloc(stmt));
                        }
                        Rule::for_cond => {
                            let expr = part
                                .into_inner()
                                .next()
                                .ok_or_else(|| custom_error(span, "empty condition"))?;
                            cond = Some(self.expr(expr)?);
                        }
                        Rule::for_update => update = self.expr_list(part.into_inner())?,
                        Rule::body => body = self.body(part)?,
                        _ => {}
                    }
                }
                Ok(Stmt::For {
                    init,
                    cond,
                    update,
                    body,
                })
            }
            Rule::return_stmt => {
                let value = children(pair).next().map(|p| self.expr(p)).transpose()?;
                Ok(Stmt::Return(value))
            }
            Rule::import_stmt => {
                let mut path = "";
                let mut wildcard = false;
                for part in children(pair) {
                    match part.as_rule() {
                        Rule::qualified_name => path = self.arena.alloc_str(part.as_str()),
                        Rule::wildcard => wildcard = true,
                        _ => {}
                    }
                }
                Ok(Stmt::Import {
                    path,
                    wildcard,
                    span: span.into(),
                })
            }
            Rule::declaration => {
                let mut ty = None;
                let mut declarators = Vec::new();
                for part in children(pair) {
                    match part.as_rule() {
                        Rule::kw_var => ty = None,
                        Rule::type_expr => ty = Some(self.type_expr(part)?),
                        Rule::declarator => declarators.push(self.declarator(part)?),
                        other => {
                            return Err(custom_error(
                                part.as_span(),
                                format!("unexpected {other:?} in declaration"),
                            ));
                        }
                    }
                }
                Ok(Stmt::Declare {
                    ty,
                    declarators: self.arena.alloc_slice_fill_iter(declarators),
                })
            }
            _ => Ok(Stmt::Expr(self.expr(pair)?)),
        }
    }

    fn declarator(&self, pair: Pair<'_, Rule>) -> Result<Declarator<'a>, PestError> {
        let span = pair.as_span();
        let mut inner = children(pair);
        let name = next(&mut inner, span)?;
        let init = inner.next().map(|p| self.expr(p)).transpose()?;
        Ok(Declarator {
            name: self.arena.alloc_str(name.as_str()),
            span: name.as_span().into(),
            init,
        })
    }

    fn expr_list<'i>(
        &self,
        pairs: impl Iterator<Item = Pair<'i, Rule>>,
    ) -> Result<&'a [&'a Expr<'a>], PestError> {
        let exprs = pairs
            .filter(|p| !is_keyword_token(p.as_rule()))
            .map(|p| self.expr(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.arena.alloc_slice_copy(&exprs))
    }

    fn type_expr(&self, pair: Pair<'_, Rule>) -> Result<TypeExpr<'a>, PestError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let name = next(&mut inner, span)?;
        let mut ty = self.type_name(name)?;
        if let Some(dims) = inner.next() {
            ty.dims = count_dims(dims.as_str());
        }
        ty.span = span.into();
        Ok(ty)
    }

    fn type_name(&self, pair: Pair<'_, Rule>) -> Result<TypeExpr<'a>, PestError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let path = next(&mut inner, span)?;
        let args = match inner.next() {
            Some(args) => {
                let args = args
                    .into_inner()
                    .map(|p| self.type_expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                &*self.arena.alloc_slice_fill_iter(args)
            }
            None => &[],
        };
        Ok(TypeExpr {
            path: self.arena.alloc_str(path.as_str()),
            args,
            dims: 0,
            span: span.into(),
        })
    }

    fn expr(&self, pair: Pair<'_, Rule>) -> Result<&'a Expr<'a>, PestError> {
        let depth = self.depth.get() + 1;
        if depth > self.max_depth {
            return Err(custom_error(
                pair.as_span(),
                format!(
                    "Expression nesting depth exceeds maximum of {} levels",
                    self.max_depth
                ),
            ));
        }
        self.depth.set(depth);
        let result = self.expr_inner(pair);
        self.depth.set(depth - 1);
        result
    }

    fn expr_inner(&self, pair: Pair<'_, Rule>) -> Result<&'a Expr<'a>, PestError> {
        let span = pair.as_span();
        match pair.as_rule() {
            Rule::assignment => {
                let mut inner = pair.into_inner();
                let target = self.expr(next(&mut inner, span)?)?;
                let op = match next(&mut inner, span)?.as_str() {
                    "+=" => AssignOp::Compound(BinaryOp::Add),
                    "-=" => AssignOp::Compound(BinaryOp::Sub),
                    "*=" => AssignOp::Compound(BinaryOp::Mul),
                    "/=" => AssignOp::Compound(BinaryOp::Div),
                    "%=" => AssignOp::Compound(BinaryOp::Rem),
                    _ => AssignOp::Assign,
                };
                let value = self.expr(next(&mut inner, span)?)?;
                Ok(self.alloc(Expr::Assign { target, op, value }, span.into()))
            }

            Rule::expression => {
                let mut inner = pair.into_inner();
                let cond = self.expr(next(&mut inner, span)?)?;
                match inner.next() {
                    None => Ok(cond),
                    Some(tail) => {
                        let mut branches = tail.into_inner();
                        let then_branch = self.expr(next(&mut branches, span)?)?;
                        let else_branch = self.expr(next(&mut branches, span)?)?;
                        Ok(self.alloc(
                            Expr::Ternary {
                                cond,
                                then_branch,
                                else_branch,
                            },
                            span.into(),
                        ))
                    }
                }
            }

            Rule::op_expr | Rule::lvalue => self.pratt(pair.into_inner()),

            Rule::paren => self.expr(next(&mut pair.into_inner(), span)?),

            Rule::call => {
                let mut inner = pair.into_inner();
                let name = next(&mut inner, span)?;
                let args = self.expr_list(inner)?;
                Ok(self.alloc(
                    Expr::Call {
                        name: self.arena.alloc_str(name.as_str()),
                        args,
                    },
                    span.into(),
                ))
            }

            Rule::new_object => {
                let mut inner = children(pair);
                let ty = self.type_expr(next(&mut inner, span)?)?;
                let args = self.expr_list(inner)?;
                Ok(self.alloc(Expr::New { ty, args }, span.into()))
            }

            Rule::new_array => {
                let mut inner = children(pair);
                let mut ty = self.type_name(next(&mut inner, span)?)?;
                ty.dims = count_dims(next(&mut inner, span)?.as_str());
                let items = self.expr_list(next(&mut inner, span)?.into_inner())?;
                Ok(self.alloc(Expr::NewArray { ty, items }, span.into()))
            }

            Rule::new_sized_array => {
                let mut inner = children(pair);
                let ty = self.type_name(next(&mut inner, span)?)?;
                let len = self.expr(next(&mut inner, span)?)?;
                Ok(self.alloc(Expr::NewSizedArray { ty, len }, span.into()))
            }

            Rule::inline_array => {
                let items = self.expr_list(pair.into_inner())?;
                Ok(self.alloc(Expr::InlineArray(items), span.into()))
            }

            Rule::inline_list => {
                let items = self.expr_list(pair.into_inner())?;
                Ok(self.alloc(Expr::InlineList(items), span.into()))
            }

            Rule::inline_map => {
                let entries = pair
                    .into_inner()
                    .map(|entry| {
                        let entry_span = entry.as_span();
                        let mut kv = entry.into_inner();
                        let key = self.expr(next(&mut kv, entry_span)?)?;
                        let value = self.expr(next(&mut kv, entry_span)?)?;
                        Ok((key, value))
                    })
                    .collect::<Result<Vec<_>, PestError>>()?;
                Ok(self.alloc(
                    Expr::InlineMap(self.arena.alloc_slice_copy(&entries)),
                    span.into(),
                ))
            }

            Rule::integer => {
                let text = pair.as_str();
                let literal = match text.parse::<i32>() {
                    Ok(value) => Literal::Int(value),
                    Err(_) => Literal::Long(
                        text.parse()
                            .map_err(|_| custom_error(span, "invalid integer literal"))?,
                    ),
                };
                Ok(self.alloc(Expr::Literal(literal), span.into()))
            }

            Rule::long => {
                let text = pair.as_str().trim_end_matches(['L', 'l']);
                let value = text
                    .parse()
                    .map_err(|_| custom_error(span, "invalid integer literal"))?;
                Ok(self.alloc(Expr::Literal(Literal::Long(value)), span.into()))
            }

            Rule::double => {
                let text = pair.as_str().trim_end_matches(['d', 'D', 'f', 'F']);
                let value = text
                    .parse()
                    .map_err(|_| custom_error(span, "invalid float literal"))?;
                Ok(self.alloc(Expr::Literal(Literal::Double(value)), span.into()))
            }

            Rule::boolean => {
                let value = pair.as_str() == "true";
                Ok(self.alloc(Expr::Literal(Literal::Bool(value)), span.into()))
            }

            Rule::null => Ok(self.alloc(Expr::Literal(Literal::Null), span.into())),

            Rule::string => {
                let s = pair.as_str();
                let unescaped = unescape(&s[1..s.len() - 1])
                    .map_err(|message| custom_error(span, message))?;
                let text = self.arena.alloc_str(&unescaped);
                Ok(self.alloc(Expr::Literal(Literal::Str(text)), span.into()))
            }

            Rule::ident => Ok(self.alloc(
                Expr::Ident(self.arena.alloc_str(pair.as_str())),
                span.into(),
            )),

            other => Err(custom_error(span, format!("Unhandled rule: {other:?}"))),
        }
    }

    fn pratt(&self, pairs: Pairs<'_, Rule>) -> Result<&'a Expr<'a>, PestError> {
        PRATT_PARSER
            .map_primary(|primary| self.expr(primary))
            .map_prefix(|op, rhs| {
                let rhs = rhs?;
                let span = Span::combine(&op.as_span().into(), &self.span_of(rhs));
                let expr = match op.as_rule() {
                    Rule::neg => match rhs {
                        Expr::Literal(Literal::Int(i)) => Expr::Literal(Literal::Int(-*i)),
                        // `-2147483648` is still an int.
                        Expr::Literal(Literal::Long(l)) if *l == -(i32::MIN as i64) => {
                            Expr::Literal(Literal::Int(i32::MIN))
                        }
                        Expr::Literal(Literal::Long(l)) => Expr::Literal(Literal::Long(-*l)),
                        Expr::Literal(Literal::Double(d)) => Expr::Literal(Literal::Double(-*d)),
                        _ => Expr::Unary {
                            op: UnaryOp::Neg,
                            expr: rhs,
                        },
                    },
                    Rule::not => Expr::Unary {
                        op: UnaryOp::Not,
                        expr: rhs,
                    },
                    Rule::cast => {
                        let op_span = op.as_span();
                        let ty = self.type_expr(next(&mut op.into_inner(), op_span)?)?;
                        Expr::Cast { ty, expr: rhs }
                    }
                    other => {
                        return Err(custom_error(
                            op.as_span(),
                            format!("Unknown prefix operator: {other:?}"),
                        ));
                    }
                };
                Ok(self.alloc(expr, span))
            })
            .map_infix(|lhs, op, rhs| {
                let (lhs, rhs) = (lhs?, rhs?);
                let span = Span::combine(&self.span_of(lhs), &self.span_of(rhs));
                let binary = |op| Expr::Binary {
                    op,
                    left: lhs,
                    right: rhs,
                };
                let comparison = |op| Expr::Comparison {
                    op,
                    left: lhs,
                    right: rhs,
                };
                let expr = match op.as_rule() {
                    Rule::or => Expr::Boolean {
                        op: BoolOp::Or,
                        left: lhs,
                        right: rhs,
                    },
                    Rule::and => Expr::Boolean {
                        op: BoolOp::And,
                        left: lhs,
                        right: rhs,
                    },
                    Rule::eq => comparison(ComparisonOp::Eq),
                    Rule::ne => comparison(ComparisonOp::Neq),
                    Rule::lt => comparison(ComparisonOp::Lt),
                    Rule::le => comparison(ComparisonOp::Le),
                    Rule::gt => comparison(ComparisonOp::Gt),
                    Rule::ge => comparison(ComparisonOp::Ge),
                    Rule::add => binary(BinaryOp::Add),
                    Rule::sub => binary(BinaryOp::Sub),
                    Rule::mul => binary(BinaryOp::Mul),
                    Rule::div => binary(BinaryOp::Div),
                    Rule::rem => binary(BinaryOp::Rem),
                    other => {
                        return Err(custom_error(
                            op.as_span(),
                            format!("Unknown binary operator: {other:?}"),
                        ));
                    }
                };
                Ok(self.alloc(expr, span))
            })
            .map_postfix(|lhs, op| {
                let lhs = lhs?;
                let op_span = op.as_span();
                let span = Span::combine(&self.span_of(lhs), &op_span.into());
                let expr = match op.as_rule() {
                    Rule::method_call => {
                        let mut inner = op.into_inner();
                        let method = next(&mut inner, op_span)?;
                        Expr::MethodCall {
                            receiver: lhs,
                            method: self.arena.alloc_str(method.as_str()),
                            args: self.expr_list(inner)?,
                        }
                    }
                    Rule::field => {
                        let field = next(&mut op.into_inner(), op_span)?;
                        Expr::Field {
                            value: lhs,
                            field: self.arena.alloc_str(field.as_str()),
                        }
                    }
                    Rule::index => Expr::Index {
                        value: lhs,
                        index: self.expr(next(&mut op.into_inner(), op_span)?)?,
                    },
                    Rule::incr => Expr::Step {
                        target: lhs,
                        op: StepOp::Incr,
                    },
                    Rule::decr => Expr::Step {
                        target: lhs,
                        op: StepOp::Decr,
                    },
                    other => {
                        return Err(custom_error(
                            op_span,
                            format!("Unknown postfix operator: {other:?}"),
                        ));
                    }
                };
                Ok(self.alloc(expr, span))
            })
            .parse(pairs)
    }
}

fn next<'i>(
    inner: &mut impl Iterator<Item = Pair<'i, Rule>>,
    span: pest::Span<'_>,
) -> Result<Pair<'i, Rule>, PestError> {
    inner
        .next()
        .ok_or_else(|| custom_error(span, "missing expected pair in rule"))
}

fn count_dims(text: &str) -> usize {
    text.matches('[').count()
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid unicode escape '\\u{hex}'"))?;
                out.push(code);
            }
            Some(other) => return Err(format!("invalid escape sequence '\\{other}'")),
            None => return Err("dangling escape at end of string".to_string()),
        }
    }
    Ok(out)
}
