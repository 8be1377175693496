//! Per-call-site accessor binding.
//!
//! Every property, method and index access of a compiled expression owns a
//! [`CallSite`]. The first time a site runs it inspects the receiver's
//! class and binds an [`Accessor`]: either the universal one, which
//! introspects on every call, or a specialized one valid only for that exact
//! class. The binding is cached; a receiver of another class is a cache
//! miss that rebinds the site (last resolved class wins).
//!
//! Which kind of accessor a site builds is decided by the expression's own
//! [`AccessorStrategy`], if its environment sets one, and otherwise by the
//! process-wide default. Changing the default only affects sites that have
//! not resolved yet.

mod accessor;
mod call_site;
pub(crate) mod introspect;

#[cfg(test)]
mod optimizer_test;

use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

pub use accessor::{Accessor, AccessorKind};
pub use call_site::{CallSite, Member};

use crate::api::Error;

/// How call sites bind their accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessorStrategy {
    /// Introspect the receiver on every access.
    Universal,
    /// Bind to the receiver's exact class, falling back to `Universal`
    /// when the member cannot be specialized.
    Specialized,
}

impl AccessorStrategy {
    pub fn name(self) -> &'static str {
        match self {
            AccessorStrategy::Universal => "universal",
            AccessorStrategy::Specialized => "specialized",
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            AccessorStrategy::Universal => 0,
            AccessorStrategy::Specialized => 1,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => AccessorStrategy::Universal,
            _ => AccessorStrategy::Specialized,
        }
    }
}

impl fmt::Display for AccessorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccessorStrategy {
    type Err = Error;

    /// Accepts `universal` (alias `reflective`) and `specialized` (alias
    /// `asm`), ignoring case.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "universal" | "reflective" => Ok(AccessorStrategy::Universal),
            "specialized" | "asm" => Ok(AccessorStrategy::Specialized),
            _ => Err(Error::Api(format!("unknown accessor strategy '{}'", name))),
        }
    }
}

/// Shared by every engine in the process; never reset implicitly.
static DEFAULT_STRATEGY: AtomicU8 = AtomicU8::new(1);

/// Select the strategy used by call sites whose expression does not choose
/// one. Call sites that already resolved keep their strategy.
pub fn set_default_accessor_strategy(name: &str) -> Result<(), Error> {
    let strategy: AccessorStrategy = name.parse()?;
    let previous = DEFAULT_STRATEGY.swap(strategy.to_bits(), Ordering::SeqCst);
    tracing::debug!(
        from = AccessorStrategy::from_bits(previous).name(),
        to = strategy.name(),
        "default accessor strategy changed"
    );
    Ok(())
}

pub fn get_default_accessor_strategy() -> AccessorStrategy {
    AccessorStrategy::from_bits(DEFAULT_STRATEGY.load(Ordering::SeqCst))
}
