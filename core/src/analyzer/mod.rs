pub mod analyzer;
pub mod environment;
pub mod error;
pub mod typed_expr;


pub use analyzer::{analyze, analyze_setter};
pub use environment::{TypeEnvironment, TypeEnvironmentConfig};
pub use error::{CompileError, CompileErrorKind};
pub use typed_expr::{Constant, Expr, ExprInner, SiteId, TypedExpr};
