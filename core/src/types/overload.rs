//! Overload resolution shared by the analyzer (static argument types) and
//! the universal accessor (runtime argument classes).
//!
//! 1. Filter candidates by arity.
//! 2. Keep candidates whose every parameter accepts its argument as is.
//! 3. Failing that, keep candidates reachable through registered coercions.
//! 4. Pick the most specific survivor; ties go to the candidate whose
//!    parameters, read left to right, are declared on the most derived class.

use crate::types::TypeDescriptor;

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single best candidate; `coerced` is set when at least one argument
    /// needs conversion before the call.
    Unique { index: usize, coerced: bool },
    /// Some argument types are unknown and several candidates remain; the
    /// choice is left to runtime.
    Deferred,
    /// Several candidates are equally specific.
    Ambiguous(Vec<usize>),
    /// No candidate accepts the arguments.
    NoMatch,
}

/// Resolve a call with argument types `args` against `candidates`, each
/// given as its list of parameter types.
///
/// `coercible(from, to)` reports whether a value of `from` may be converted
/// to `to`.
pub fn resolve<F>(candidates: &[Vec<TypeDescriptor>], args: &[TypeDescriptor], coercible: F) -> Resolution
where
    F: Fn(&TypeDescriptor, &TypeDescriptor) -> bool,
{
    let by_arity: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, params)| params.len() == args.len())
        .map(|(i, _)| i)
        .collect();

    if by_arity.is_empty() {
        return Resolution::NoMatch;
    }

    let has_dynamic_arg = args.iter().any(TypeDescriptor::is_dynamic);
    if has_dynamic_arg && by_arity.len() > 1 {
        return Resolution::Deferred;
    }

    let assignable: Vec<usize> = by_arity
        .iter()
        .copied()
        .filter(|&i| {
            candidates[i]
                .iter()
                .zip(args)
                .all(|(param, arg)| param.is_assignable_from(arg) || arg.is_dynamic())
        })
        .collect();
    if !assignable.is_empty() {
        return pick_most_specific(candidates, &assignable, false);
    }

    let convertible: Vec<usize> = by_arity
        .iter()
        .copied()
        .filter(|&i| {
            candidates[i]
                .iter()
                .zip(args)
                .all(|(param, arg)| {
                    param.is_assignable_from(arg) || arg.is_dynamic() || coercible(arg, param)
                })
        })
        .collect();
    if !convertible.is_empty() {
        return pick_most_specific(candidates, &convertible, true);
    }

    Resolution::NoMatch
}

fn more_specific(a: &[TypeDescriptor], b: &[TypeDescriptor]) -> bool {
    a.iter().zip(b).all(|(pa, pb)| pb.is_assignable_from(pa))
}

fn pick_most_specific(candidates: &[Vec<TypeDescriptor>], viable: &[usize], coerced: bool) -> Resolution {
    if let [only] = viable {
        return Resolution::Unique {
            index: *only,
            coerced,
        };
    }

    let maximal: Vec<usize> = viable
        .iter()
        .copied()
        .filter(|&i| {
            viable
                .iter()
                .all(|&j| i == j || more_specific(&candidates[i], &candidates[j]))
        })
        .collect();
    if let [only] = maximal.as_slice() {
        return Resolution::Unique {
            index: *only,
            coerced,
        };
    }

    // Left-to-right tie break on inheritance depth of each parameter.
    let pool = if maximal.is_empty() { viable.to_vec() } else { maximal };
    let mut best = pool.clone();
    let arity = candidates[pool[0]].len();
    for position in 0..arity {
        let deepest = best
            .iter()
            .map(|&i| candidates[i][position].class().depth())
            .max()
            .unwrap_or(0);
        best.retain(|&i| candidates[i][position].class().depth() == deepest);
        if best.len() == 1 {
            return Resolution::Unique {
                index: best[0],
                coerced,
            };
        }
    }
    Resolution::Ambiguous(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassBuilder, builtins};
    use pretty_assertions::assert_eq;

    fn never(_: &TypeDescriptor, _: &TypeDescriptor) -> bool {
        false
    }

    #[test]
    fn filters_by_arity() {
        let candidates = vec![
            vec![TypeDescriptor::integer()],
            vec![TypeDescriptor::integer(), TypeDescriptor::integer()],
        ];
        assert_eq!(
            resolve(&candidates, &[TypeDescriptor::integer(), TypeDescriptor::integer()], never),
            Resolution::Unique {
                index: 1,
                coerced: false
            }
        );
        assert_eq!(resolve(&candidates, &[], never), Resolution::NoMatch);
    }

    #[test]
    fn prefers_most_specific_parameter() {
        let base = ClassBuilder::new("Base").build();
        let derived = ClassBuilder::new("Derived").extends(&base).build();
        let candidates = vec![
            vec![TypeDescriptor::object()],
            vec![TypeDescriptor::of(&base)],
            vec![TypeDescriptor::of(&derived)],
        ];
        assert_eq!(
            resolve(&candidates, &[TypeDescriptor::of(&derived)], never),
            Resolution::Unique {
                index: 2,
                coerced: false
            }
        );
        assert_eq!(
            resolve(&candidates, &[TypeDescriptor::of(&base)], never),
            Resolution::Unique {
                index: 1,
                coerced: false
            }
        );
    }

    #[test]
    fn falls_back_to_coercion() {
        let candidates = vec![vec![TypeDescriptor::string()]];
        let resolution = resolve(&candidates, &[TypeDescriptor::integer()], |from, to| {
            from.is_numeric() && to.is_string()
        });
        assert_eq!(
            resolution,
            Resolution::Unique {
                index: 0,
                coerced: true
            }
        );
    }

    #[test]
    fn coercion_alongside_dynamic_argument() {
        let candidates = vec![vec![TypeDescriptor::integer(), TypeDescriptor::integer()]];
        let resolution = resolve(
            &candidates,
            &[TypeDescriptor::string(), TypeDescriptor::object()],
            |from, to| from.is_string() && to.is_numeric(),
        );
        assert_eq!(
            resolution,
            Resolution::Unique {
                index: 0,
                coerced: true
            }
        );
    }

    #[test]
    fn dynamic_argument_with_several_candidates_is_deferred() {
        let candidates = vec![vec![TypeDescriptor::string()], vec![TypeDescriptor::integer()]];
        assert_eq!(
            resolve(&candidates, &[TypeDescriptor::object()], never),
            Resolution::Deferred
        );
    }

    #[test]
    fn unrelated_candidates_accepting_null_are_ambiguous() {
        let candidates = vec![vec![TypeDescriptor::string()], vec![TypeDescriptor::integer()]];
        assert_eq!(
            resolve(&candidates, &[TypeDescriptor::of(builtins::null())], never),
            Resolution::Ambiguous(vec![0, 1])
        );
    }
}
