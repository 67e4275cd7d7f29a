//! Providers for contextual parameters.
//!
//! A contextual parameter takes its value from the caller's environment
//! (their location, their selection, ...) rather than from typed input,
//! whenever the caller supports it.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::caller::Caller;
use crate::value::Value;
use crate::value::ValueType;

pub trait ContextProvider: Send + Sync {
    fn value_type(&self) -> ValueType;

    /// Value for `caller`, or a reason it cannot be derived.
    fn provide(&self, caller: &dyn Caller) -> Result<Value, String>;
}

/// [`ContextProvider`] built from a closure returning a concrete type.
pub struct ContextFn<T, F> {
    provide: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ContextFn<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&dyn Caller) -> Result<T, String> + Send + Sync,
{
    pub fn new(provide: F) -> Self {
        Self {
            provide,
            _marker: PhantomData,
        }
    }
}

impl<T, F> ContextProvider for ContextFn<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&dyn Caller) -> Result<T, String> + Send + Sync,
{
    fn value_type(&self) -> ValueType {
        ValueType::of::<T>()
    }

    fn provide(&self, caller: &dyn Caller) -> Result<Value, String> {
        (self.provide)(caller).map(Value::new)
    }
}

#[derive(Clone, Default)]
pub struct ContextRegistry {
    providers: HashMap<ValueType, Arc<dyn ContextProvider>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider`, replacing any earlier one for the same type.
    pub fn register(&mut self, provider: impl ContextProvider + 'static) -> &mut Self {
        self.providers
            .insert(provider.value_type(), Arc::new(provider));
        self
    }

    /// Shorthand for registering a [`ContextFn`].
    pub fn register_fn<T, F>(&mut self, provide: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn Caller) -> Result<T, String> + Send + Sync + 'static,
    {
        self.register(ContextFn::new(provide))
    }

    pub fn find(&self, ty: ValueType) -> Option<&dyn ContextProvider> {
        self.providers.get(&ty).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
