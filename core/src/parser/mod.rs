mod parsed_expr;
pub mod parser;
mod syntax;
pub mod error;

// Re-export the parser and rule enum for external use
pub use parser::BriskParser;
pub use parser::Rule;
pub use parser::parse;
pub use parser::parse_with_max_depth;

pub use error::{ParseError, ParseErrorKind};
pub use parsed_expr::{Declarator, Expr, Literal, ParsedExpr, Stmt, TypeExpr};
pub use syntax::AnnotatedSource;
pub use syntax::{AssignOp, BinaryOp, BoolOp, ComparisonOp, Span, StepOp, UnaryOp};

#[cfg(test)]
mod parse_test;

#[cfg(test)]
mod rule_valid_test;
