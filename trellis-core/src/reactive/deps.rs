//! Dependency Sequences
//!
//! Effects and memos declare what they depend on as an ordered sequence of
//! [`Dep`] values. On every render pass the new sequence is compared against
//! the one stored by the previous run, slot by slot.
//!
//! # Comparison Rules
//!
//! The comparison is positional and shallow:
//!
//! - Two sequences of different length always count as changed.
//! - Slot `i` of the new sequence is compared only with slot `i` of the old.
//! - Value dependencies ([`Dep::value`] and the `From` impls for primitives)
//!   compare with `==`. Floats compare by bit pattern, so `NaN` is equal to
//!   itself and `0.0` differs from `-0.0`.
//! - Identity dependencies ([`Dep::identity`]) compare by pointer. Two
//!   different `Arc`s holding equal data are *different* dependencies.
//! - Slots of different types are never equal.
//!
//! Nothing is compared deeply through shared structures. A caller that
//! mutates data behind an `Arc` and passes the same `Arc` again will not
//! re-run its effect; that is the contract, not a bug.
//!
//! # Absent vs Empty
//!
//! [`Deps::Always`] (no list at all) makes an effect run after every pass.
//! An empty tracked list ([`Deps::once`]) can never differ from itself, so
//! the effect runs on first registration only.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use smallvec::SmallVec;

/// Object-safe equality for type-erased dependency values.
trait DynEq: Any + Send + Sync {
    fn dyn_eq(&self, other: &dyn Any) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynEq for T
where
    T: PartialEq + Send + Sync + 'static,
{
    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone)]
enum Repr {
    Value {
        value: Arc<dyn DynEq>,
        type_name: &'static str,
    },
    Identity(Arc<dyn Any + Send + Sync>),
}

/// A single slot of a dependency sequence.
#[derive(Clone)]
pub struct Dep(Repr);

impl Dep {
    /// A dependency compared with `==`.
    pub fn value<T>(value: T) -> Self
    where
        T: PartialEq + Send + Sync + 'static,
    {
        Self(Repr::Value {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        })
    }

    /// A dependency compared by pointer identity of the shared allocation.
    ///
    /// The dependency keeps the allocation alive, so a freed address can
    /// never be reused by a later value and mistaken for the same one.
    pub fn identity<T>(shared: &Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self(Repr::Identity(shared.clone()))
    }

    /// Shallow, per-slot comparison.
    pub fn same(&self, other: &Dep) -> bool {
        match (&self.0, &other.0) {
            (Repr::Value { value: a, .. }, Repr::Value { value: b, .. }) => {
                DynEq::dyn_eq(&**a, DynEq::as_any(&**b))
            }
            (Repr::Identity(a), Repr::Identity(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Value { type_name, .. } => write!(f, "Value({type_name})"),
            Repr::Identity(shared) => write!(f, "Identity({:p})", Arc::as_ptr(shared) as *const ()),
        }
    }
}

macro_rules! dep_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Dep {
                fn from(value: $ty) -> Self {
                    Dep::value(value)
                }
            }
        )*
    };
}

dep_from_value!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    Duration,
);

impl From<&str> for Dep {
    fn from(value: &str) -> Self {
        Dep::value(value.to_owned())
    }
}

/// Floats compare by bit pattern, so `NaN` is equal to itself.
#[derive(PartialEq)]
struct F32Bits(u32);

#[derive(PartialEq)]
struct F64Bits(u64);

impl From<f32> for Dep {
    fn from(value: f32) -> Self {
        Dep::value(F32Bits(value.to_bits()))
    }
}

impl From<f64> for Dep {
    fn from(value: f64) -> Self {
        Dep::value(F64Bits(value.to_bits()))
    }
}

/// The dependency declaration of one effect or memo.
#[derive(Clone, Debug, Default)]
pub enum Deps {
    /// No dependency list: due on every pass.
    #[default]
    Always,

    /// A positional sequence compared against the previous run.
    Tracked(SmallVec<[Dep; 4]>),
}

impl Deps {
    /// Run on every pass.
    pub fn always() -> Self {
        Deps::Always
    }

    /// Run on first registration only.
    pub fn once() -> Self {
        Deps::Tracked(SmallVec::new())
    }

    /// Build a tracked sequence.
    pub fn tracked<I>(deps: I) -> Self
    where
        I: IntoIterator<Item = Dep>,
    {
        Deps::Tracked(deps.into_iter().collect())
    }

    /// Whether an entry declaring `self` is due, given what its last run stored.
    ///
    /// `previous` is `None` when the entry has never run.
    pub fn changed_since(&self, previous: Option<&Deps>) -> bool {
        match (self, previous) {
            (_, None) | (Deps::Always, _) | (Deps::Tracked(_), Some(Deps::Always)) => true,
            (Deps::Tracked(next), Some(Deps::Tracked(prev))) => {
                next.len() != prev.len() || next.iter().zip(prev.iter()).any(|(a, b)| !a.same(b))
            }
        }
    }

    /// Number of tracked slots (zero for [`Deps::Always`]).
    pub fn len(&self) -> usize {
        match self {
            Deps::Always => 0,
            Deps::Tracked(deps) => deps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a [`Deps::Tracked`] sequence from values convertible into [`Dep`].
///
/// `deps![]` is the run-once declaration.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::reactive::Deps::once()
    };
    ($($dep:expr),+ $(,)?) => {
        $crate::reactive::Deps::tracked([$($crate::reactive::Dep::from($dep)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_never_equal_their_bit_patterns() {
        assert_ne!(Dep::from(1.0_f32), Dep::from(1.0_f32.to_bits()));
        assert_ne!(Dep::from(1.0_f64), Dep::from(1.0_f64.to_bits()));
        assert_ne!(Dep::from(1.0_f32), Dep::from(1.0_f64));
        assert_eq!(Dep::from(f64::NAN), Dep::from(f64::NAN));
    }

    #[test]
    fn first_registration_is_always_due() {
        assert!(Deps::once().changed_since(None));
        assert!(Deps::always().changed_since(None));
        assert!(deps![1, 2].changed_since(None));
    }

    #[test]
    fn empty_list_runs_once() {
        let stored = Deps::once();
        assert!(!Deps::once().changed_since(Some(&stored)));
    }

    #[test]
    fn absent_list_runs_every_time() {
        let stored = Deps::always();
        assert!(Deps::always().changed_since(Some(&stored)));
    }

    #[test]
    fn positional_comparison() {
        let stored = deps![1, "a"];
        assert!(!deps![1, "a"].changed_since(Some(&stored)));
        assert!(deps![2, "a"].changed_since(Some(&stored)));
        assert!(deps!["a", 1].changed_since(Some(&stored)));
        assert!(deps![1].changed_since(Some(&stored)));
    }

    #[test]
    fn different_types_never_match() {
        assert_ne!(Dep::from(1_i32), Dep::from(1_i64));
    }

    #[test]
    fn identity_ignores_equal_contents() {
        let a = Arc::new(vec![1, 2, 3]);
        let b = Arc::new(vec![1, 2, 3]);

        assert_eq!(Dep::identity(&a), Dep::identity(&a.clone()));
        assert_ne!(Dep::identity(&a), Dep::identity(&b));
    }

    #[test]
    fn floats_compare_by_bits() {
        assert_eq!(Dep::from(f64::NAN), Dep::from(f64::NAN));
        assert_ne!(Dep::from(0.0_f64), Dep::from(-0.0_f64));
    }

    #[test]
    fn value_deps_accept_any_partial_eq() {
        #[derive(PartialEq)]
        struct Query {
            term: String,
            page: u32,
        }

        let a = Dep::value(Query { term: "rust".into(), page: 1 });
        let b = Dep::value(Query { term: "rust".into(), page: 1 });
        let c = Dep::value(Query { term: "rust".into(), page: 2 });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
