//! Value parsers: raw token text to typed [`Value`]s.
//!
//! [`ValueParser`] is the object-safe contract the binder works with.
//! Most parsers are easier to write against [`TypedParser`], which
//! [`ParserRegistry::register_typed`] adapts.

mod builtin;
mod choice;

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

pub use builtin::BoolParser;
pub use builtin::FloatParser;
pub use builtin::IntParser;
pub use builtin::StringParser;
pub use builtin::apply_multipliers;
pub use choice::ChoiceParser;

use crate::value::Value;
use crate::value::ValueType;

/// Result of parsing one raw token.
#[derive(Debug, Clone)]
pub enum Parsed<T = Value> {
    Value(T),
    /// The input cannot be read as this type; carries a human-readable reason.
    Failed(String),
    /// Several values fit the input equally well.
    Ambiguous(Vec<T>),
}

impl<T> Parsed<T> {
    pub fn map<U>(self, f: impl Fn(T) -> U) -> Parsed<U> {
        match self {
            Parsed::Value(value) => Parsed::Value(f(value)),
            Parsed::Failed(reason) => Parsed::Failed(reason),
            Parsed::Ambiguous(options) => Parsed::Ambiguous(options.into_iter().map(f).collect()),
        }
    }
}

pub trait ValueParser: Send + Sync {
    fn value_type(&self) -> ValueType;

    fn supports(&self, ty: ValueType) -> bool {
        self.value_type() == ty
    }

    fn parse(&self, raw: &str) -> Parsed;

    /// Inverse of [`ValueParser::parse`]; used to show disambiguation choices.
    fn render(&self, value: &Value) -> String;
}

/// Parser written against a concrete output type.
pub trait TypedParser: Send + Sync + 'static {
    type Output: Any + Send + Sync;

    fn parse(&self, raw: &str) -> Parsed<Self::Output>;

    fn render(&self, value: &Self::Output) -> String;
}

struct Typed<P>(P);

impl<P: TypedParser> ValueParser for Typed<P> {
    fn value_type(&self) -> ValueType {
        ValueType::of::<P::Output>()
    }

    fn parse(&self, raw: &str) -> Parsed {
        self.0.parse(raw).map(Value::new)
    }

    fn render(&self, value: &Value) -> String {
        match value.downcast_ref::<P::Output>() {
            Some(inner) => self.0.render(inner),
            None => format!("{value:?}"),
        }
    }
}

/// Parsers available to the binder, looked up by declared type.
///
/// Later registrations take precedence, so a host can override a built-in.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn ValueParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with parsers for `bool`, `i8`..`i64`, `f32`, `f64`
    /// and `String`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_typed(BoolParser)
            .register_typed(IntParser::<i8>::new())
            .register_typed(IntParser::<i16>::new())
            .register_typed(IntParser::<i32>::new())
            .register_typed(IntParser::<i64>::new())
            .register_typed(FloatParser::<f32>::new())
            .register_typed(FloatParser::<f64>::new())
            .register_typed(StringParser);
        registry
    }

    pub fn register(&mut self, parser: impl ValueParser + 'static) -> &mut Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    pub fn register_typed<P: TypedParser>(&mut self, parser: P) -> &mut Self {
        self.register(Typed(parser))
    }

    pub fn find(&self, ty: ValueType) -> Option<&dyn ValueParser> {
        self.parsers
            .iter()
            .rev()
            .find(|parser| parser.supports(ty))
            .map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

/// Zero-sized marker shared by the generic numeric parsers.
pub(crate) type Marker<T> = PhantomData<fn() -> T>;
