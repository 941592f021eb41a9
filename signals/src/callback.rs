use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ArgumentMismatch, BindingError, BoxError, DispatchError, InvokeError};
use crate::params::{Param, Params};

/// Type-erased invocable: receives the listener and the dispatched arguments
pub type Invocable<T> = Arc<dyn Fn(&T, &[&dyn Any]) -> Result<(), InvokeError> + Send + Sync + 'static>;

/// A callback bound to one listener type and one argument shape.
///
/// Cloning a `Callback` shares the same underlying invocable.
pub struct Callback<T: ?Sized> {
    name: Cow<'static, str>,
    params: Params,
    invoke: Invocable<T>,
}

impl<T: ?Sized> Clone for Callback<T> {
    fn clone(&self) -> Self { Self { name: self.name.clone(), params: self.params.clone(), invoke: Arc::clone(&self.invoke) } }
}

impl<T: ?Sized> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).field("params", &self.params).finish()
    }
}

impl<T: ?Sized> Callback<T> {
    /// Builds a callback from a raw invocable. The invocable is only ever called with
    /// arguments that passed `params.check`.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, params: Params, invoke: F) -> Self
    where F: Fn(&T, &[&dyn Any]) -> Result<(), InvokeError> + Send + Sync + 'static {
        Self { name: name.into(), params, invoke: Arc::new(invoke) }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn params(&self) -> &Params { &self.params }

    /// Renames this callback; the name is what errors report
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Checks the argument shape, then invokes. Errors carry the callback name and the supplied arity.
    pub(crate) fn invoke(&self, target: &T, args: &[&dyn Any]) -> Result<(), DispatchError> {
        let arity = args.len();
        if let Err(source) = self.params.check(args) {
            return Err(DispatchError::Argument { callback: self.name.to_string(), arity, source });
        }
        (self.invoke)(target, args).map_err(|err| match err {
            InvokeError::Arguments(source) => DispatchError::Argument { callback: self.name.to_string(), arity, source },
            InvokeError::Listener(source) => DispatchError::Invocation { callback: self.name.to_string(), arity, source },
        })
    }
}

/// Return types a callback closure may have
pub trait CallbackOutput {
    fn into_result(self) -> Result<(), InvokeError>;
}

impl CallbackOutput for () {
    fn into_result(self) -> Result<(), InvokeError> { Ok(()) }
}

impl<E> CallbackOutput for Result<(), E>
where E: Into<BoxError>
{
    fn into_result(self) -> Result<(), InvokeError> { self.map_err(InvokeError::listener) }
}

/// Trait for types that can be converted into callbacks for listeners of type `T`.
///
/// `M` is an inference marker that keeps the per-arity implementations apart; callers never name it.
pub trait IntoCallback<T: ?Sized, M> {
    fn into_callback(self) -> Callback<T>;
}

impl<T: ?Sized> IntoCallback<T, ()> for Callback<T> {
    fn into_callback(self) -> Callback<T> { self }
}

fn take<'a, A: Any>(args: &mut std::slice::Iter<'a, &dyn Any>, params: &Params, supplied: usize) -> Result<&'a A, InvokeError> {
    let position = params.len().saturating_sub(args.len());
    args.next()
        .and_then(|arg| arg.downcast_ref::<A>())
        .ok_or_else(|| InvokeError::Arguments(ArgumentMismatch { expected: params.clone(), supplied, position: Some(position) }))
}

macro_rules! impl_into_callback {
    ($($arg:ident $val:ident),*) => {
        impl<T, F, R, $($arg),*> IntoCallback<T, fn($(&$arg),*) -> R> for F
        where
            T: ?Sized,
            F: Fn(&T, $(&$arg),*) -> R + Send + Sync + 'static,
            R: CallbackOutput,
            $($arg: Any,)*
        {
            #[allow(unused_mut, unused_variables)]
            fn into_callback(self) -> Callback<T> {
                let params = Params::from(vec![$(Param::of::<$arg>()),*]);
                let shape = params.clone();
                Callback::new(std::any::type_name::<F>(), params, move |target: &T, args: &[&dyn Any]| {
                    let supplied = args.len();
                    let mut args = args.iter();
                    $(let $val = take::<$arg>(&mut args, &shape, supplied)?;)*
                    (self)(target, $($val),*).into_result()
                })
            }
        }
    };
}

impl_into_callback!();
impl_into_callback!(A1 a1);
impl_into_callback!(A1 a1, A2 a2);
impl_into_callback!(A1 a1, A2 a2, A3 a3);
impl_into_callback!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_into_callback!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_into_callback!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);

/// Inference marker for channel-backed callbacks
#[doc(hidden)]
pub struct Forward<V>(PhantomData<fn(V)>);

#[derive(Debug, thiserror::Error)]
#[error("listener channel is closed")]
struct ChannelClosed;

fn forward<T, V>(name: &'static str, send: impl Fn(V) -> bool + Send + Sync + 'static) -> Callback<T>
where
    T: ?Sized,
    V: Any + Clone,
{
    Callback::new(name, Params::of::<V>(), move |_: &T, args: &[&dyn Any]| {
        let value = take::<V>(&mut args.iter(), &Params::of::<V>(), args.len())?;
        if send(value.clone()) { Ok(()) } else { Err(InvokeError::listener(ChannelClosed)) }
    })
}

// Channel senders forward a clone of the single dispatched value
impl<T, V> IntoCallback<T, Forward<V>> for std::sync::mpsc::Sender<V>
where
    T: ?Sized,
    V: Any + Clone + Send,
{
    fn into_callback(self) -> Callback<T> { forward("std::sync::mpsc::Sender", move |value| self.send(value).is_ok()) }
}

#[cfg(feature = "tokio")]
impl<T, V> IntoCallback<T, Forward<V>> for tokio::sync::mpsc::UnboundedSender<V>
where
    T: ?Sized,
    V: Any + Clone + Send,
{
    fn into_callback(self) -> Callback<T> { forward("tokio::sync::mpsc::UnboundedSender", move |value| self.send(value).is_ok()) }
}

/// Named callbacks for one listener type, resolved at `add` time.
///
/// ```
/// use signal_slots::*;
///
/// #[derive(Clone, PartialEq, Eq, Hash)]
/// struct Door(&'static str);
/// impl Door {
///     fn on_knock(&self, times: &u32) { println!("{} knocked {times} times", self.0) }
/// }
///
/// let handlers = Handlers::<Door>::new().with("on_knock", Door::on_knock);
/// let signal = Signal::new(params![u32]);
/// signal.add(Door("front"), handlers.resolve("on_knock").unwrap()).unwrap();
/// signal.dispatch(&[&3u32]).unwrap();
/// assert!(handlers.resolve("on_ring").is_err());
/// ```
pub struct Handlers<T: ?Sized> {
    callbacks: HashMap<&'static str, Callback<T>>,
}

impl<T: ?Sized> Default for Handlers<T> {
    fn default() -> Self { Self { callbacks: HashMap::new() } }
}

impl<T: ?Sized> Handlers<T> {
    pub fn new() -> Self { Self::default() }

    /// Registers `callback` under `name`, replacing any callback already registered there
    pub fn register<C, M>(&mut self, name: &'static str, callback: C)
    where C: IntoCallback<T, M> {
        self.callbacks.insert(name, callback.into_callback().named(name));
    }

    pub fn with<C, M>(mut self, name: &'static str, callback: C) -> Self
    where C: IntoCallback<T, M> {
        self.register(name, callback);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Callback<T>, BindingError> {
        self.callbacks
            .get(name)
            .cloned()
            .ok_or_else(|| BindingError::UnknownCallback { listener_type: std::any::type_name::<T>(), callback: name.to_string() })
    }
}
