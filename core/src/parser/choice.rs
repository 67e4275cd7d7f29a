use std::any::Any;
use std::fmt::Display;

use super::Parsed;
use super::TypedParser;

/// Parser over a fixed set of options, matched by their display form.
///
/// Matching is case-insensitive: an exact match wins outright, otherwise
/// every option that contains the input (or is contained by it) is a
/// candidate. More than one candidate is reported as ambiguous.
pub struct ChoiceParser<T> {
    options: Vec<T>,
}

impl<T> ChoiceParser<T>
where
    T: Display + Clone + Any + Send + Sync,
{
    pub fn new(options: impl IntoIterator<Item = T>) -> Self {
        Self {
            options: options.into_iter().collect(),
        }
    }

    pub fn options(&self) -> &[T] {
        &self.options
    }

    /// Options compatible with `input`, in declaration order.
    pub fn possibilities(&self, input: &str) -> Vec<T> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return self.options.clone();
        }
        self.options
            .iter()
            .filter(|option| {
                let shown = option.to_string().trim().to_lowercase();
                shown == needle || shown.contains(&needle) || needle.contains(&shown)
            })
            .cloned()
            .collect()
    }
}

impl<T> TypedParser for ChoiceParser<T>
where
    T: Display + Clone + Any + Send + Sync,
{
    type Output = T;

    fn parse(&self, raw: &str) -> Parsed<T> {
        let needle = raw.trim().to_lowercase();
        if let Some(exact) = self
            .options
            .iter()
            .find(|option| option.to_string().trim().to_lowercase() == needle)
        {
            return Parsed::Value(exact.clone());
        }

        let mut candidates = self.possibilities(raw);
        match candidates.len() {
            0 => {
                let known: Vec<String> = self.options.iter().map(ToString::to_string).collect();
                Parsed::Failed(format!("'{raw}' is not one of: {}", known.join(", ")))
            }
            1 => Parsed::Value(candidates.remove(0)),
            _ => Parsed::Ambiguous(candidates),
        }
    }

    fn render(&self, value: &T) -> String {
        value.to_string()
    }
}
