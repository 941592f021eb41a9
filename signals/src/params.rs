use std::any::{Any, TypeId};
use std::fmt;

use crate::error::ArgumentMismatch;

/// One declared parameter of a signal
#[derive(Clone, Copy)]
pub struct Param {
    id: TypeId,
    name: &'static str,
}

impl Param {
    pub fn of<T: Any>() -> Self { Self { id: TypeId::of::<T>(), name: std::any::type_name::<T>() } }

    pub fn type_id(&self) -> TypeId { self.id }

    pub fn type_name(&self) -> &'static str { self.name }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}
impl Eq for Param {}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name) }
}

/// The argument shape a signal dispatches with, and that every callback bound to it must accept.
///
/// Built with [`params!`](crate::params) or incrementally:
/// ```
/// use signal_slots::*;
///
/// let shape = Params::of::<i32>().with::<String>();
/// assert_eq!(shape, params![i32, String]);
/// assert_eq!(shape.to_string(), "i32, alloc::string::String");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    /// The empty shape: signals that dispatch no arguments
    pub fn new() -> Self { Self(Vec::new()) }

    pub fn of<T: Any>() -> Self { Self(vec![Param::of::<T>()]) }

    pub fn with<T: Any>(mut self) -> Self {
        self.0.push(Param::of::<T>());
        self
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> { self.0.iter() }

    /// Verifies that `args` has this shape: same arity and the same concrete type at every position.
    pub fn check(&self, args: &[&dyn Any]) -> Result<(), ArgumentMismatch> {
        if args.len() != self.0.len() {
            return Err(ArgumentMismatch { expected: self.clone(), supplied: args.len(), position: None });
        }
        // `<dyn Any>::type_id` so we read the referent's type, not the reference's
        match self.iter().zip(args).position(|(param, arg)| <dyn Any>::type_id(*arg) != param.type_id()) {
            Some(position) => Err(ArgumentMismatch { expected: self.clone(), supplied: args.len(), position: Some(position) }),
            None => Ok(()),
        }
    }
}

impl From<Vec<Param>> for Params {
    fn from(params: Vec<Param>) -> Self { Self(params) }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, param) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(param.type_name())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "({self})") }
}

/// Declares a [`Params`] shape from a list of types
#[macro_export]
macro_rules! params {
    () => { $crate::Params::new() };
    ($($ty:ty),+ $(,)?) => { $crate::Params::from(vec![$($crate::Param::of::<$ty>()),+]) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_accepts_matching_args() {
        let shape = params![i32, String];
        let name = "ping".to_string();
        assert!(shape.check(&[&7i32, &name]).is_ok());
        assert!(Params::new().check(&[]).is_ok());
    }

    #[test]
    fn test_check_reports_arity() {
        let err = params![i32, String].check(&[&7i32]).unwrap_err();
        assert_eq!(err.supplied, 1);
        assert_eq!(err.position, None);
    }

    #[test]
    fn test_check_reports_first_bad_position() {
        let err = params![i32, String, u8].check(&[&7i32, &"not a String", &1u8]).unwrap_err();
        assert_eq!(err.position, Some(1));
    }

    #[test]
    fn test_equality_ignores_names() {
        assert_eq!(Params::of::<u64>(), params![u64]);
        assert_ne!(params![u64], params![u32]);
        assert_ne!(params![u64], params![u64, u64]);
    }
}
