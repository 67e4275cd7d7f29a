//! Type-erased argument values.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

/// Runtime tag for the declared type of a parameter or a parsed value.
#[derive(Clone, Copy)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    pub fn of<T: Any>() -> Self {
        let full = std::any::type_name::<T>();
        // `alloc::string::String` reads better as `String`; generic types keep
        // their full path since splitting them would mangle the arguments.
        let name = if full.contains('<') {
            full
        } else {
            full.rsplit("::").next().unwrap_or(full)
        };
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A parsed or contextual argument. Cloning shares the underlying value.
#[derive(Clone)]
pub struct Value {
    ty: ValueType,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            ty: ValueType::of::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// True when the stored value really is of the type it is tagged with.
    pub fn is_well_typed(&self) -> bool {
        (*self.inner).type_id() == self.ty.id
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_names_are_short() {
        assert_eq!(ValueType::of::<String>().name(), "String");
        assert_eq!(ValueType::of::<i32>().name(), "i32");
        assert_eq!(ValueType::of::<bool>().to_string(), "bool");
    }

    #[test]
    fn equality_follows_type_identity() {
        assert_eq!(ValueType::of::<i64>(), ValueType::of::<i64>());
        assert!(ValueType::of::<i64>() != ValueType::of::<i32>());
        assert!(ValueType::of::<u8>().is::<u8>());
    }

    #[test]
    fn values_downcast_to_their_type() {
        let value = Value::new(42_i32);
        assert_eq!(value.value_type(), ValueType::of::<i32>());
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));
        assert_eq!(value.downcast_ref::<i64>(), None);
        assert!(value.is_well_typed());
    }
}
