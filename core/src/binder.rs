//! Assigns the tokens left after resolution to a command's parameters.
//!
//! Binding runs in fixed phases. Tokens are first classified as keyed
//! (`key=value`), dash flags (`-name`) or plain positional values. Keyed
//! tokens and flags claim parameters by name, positional values fill what
//! is left in declaration order, and defaults and context providers cover
//! the rest. Only then are raw strings parsed into typed values, prompting
//! the caller when a parser finds several equally good candidates.

use std::fmt;
use std::sync::Arc;

use edict_fuzzy::Named;
use tracing::debug;

use crate::caller::Caller;
use crate::config::EdictConfig;
use crate::context::ContextRegistry;
use crate::disambiguation::DisambiguationChannel;
use crate::error::EdictError;
use crate::error::Result;
use crate::parser::Parsed;
use crate::parser::ParserRegistry;
use crate::tree::ParameterSpec;
use crate::value::Value;

/// An input token that could not be used, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadArgument {
    pub token: String,
    pub reason: String,
}

impl BadArgument {
    fn new(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BadArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' failed because of: {}", self.token, self.reason)
    }
}

/// A parameter that ended up without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInput {
    pub parameter: String,
    pub value_type: &'static str,
    /// Set when a value was given but could not be turned into this type.
    pub reason: Option<String>,
}

impl MissingInput {
    fn new(param: &ParameterSpec, reason: Option<String>) -> Self {
        Self {
            parameter: param.name().to_string(),
            value_type: param.value_type().name(),
            reason,
        }
    }
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing input for parameter {} ({})",
            self.parameter, self.value_type
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

/// Values for every parameter of a command, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
}

impl BoundArgs {
    /// Typed value of parameter `name`; `None` if absent or of another type.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.value(name).and_then(Value::downcast_ref)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug)]
pub enum BindOutcome {
    Complete(BoundArgs),
    Missing(Vec<MissingInput>),
}

/// Result of binding: either every parameter got a value or some are
/// missing. Bad tokens are reported in both cases.
#[derive(Debug)]
pub struct Binding {
    pub outcome: BindOutcome,
    pub bad_args: Vec<BadArgument>,
}

impl Binding {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, BindOutcome::Complete(_))
    }
}

enum Token<'a> {
    Keyed {
        raw: &'a str,
        key: &'a str,
        value: &'a str,
    },
    Flag {
        raw: &'a str,
        name: &'a str,
    },
    Keyless(&'a str),
}

fn classify(raw: &str) -> std::result::Result<Token<'_>, BadArgument> {
    let mut parts = raw.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => {
            let key = key.trim_start_matches('-');
            if key.is_empty() || value.is_empty() {
                Err(BadArgument::new(raw, "Empty value after splitting on '='"))
            } else {
                Ok(Token::Keyed { raw, key, value })
            }
        }
        (_, Some(_), Some(_)) => Err(BadArgument::new(raw, "Too many '=' signs in input")),
        _ => match raw.strip_prefix('-') {
            Some(name) if name.starts_with(char::is_alphabetic) => Ok(Token::Flag { raw, name }),
            _ => Ok(Token::Keyless(raw)),
        },
    }
}

/// Name matching passes, most precise first.
#[derive(Clone, Copy)]
enum NamePass {
    Exact,
    Containing,
    Contained,
}

impl NamePass {
    const ALL: [NamePass; 3] = [NamePass::Exact, NamePass::Containing, NamePass::Contained];

    fn accepts(self, name: &str, key: &str) -> bool {
        match self {
            NamePass::Exact => name == key,
            NamePass::Containing => name.contains(key),
            NamePass::Contained => key.contains(name),
        }
    }
}

/// Finds an open parameter for `key`: an exact name or alias first, then
/// a name containing the key, then a name the key contains.
fn claim_by_name(
    params: &[ParameterSpec],
    open: &[bool],
    key: &str,
    booleans_only: bool,
) -> Option<usize> {
    let key = key.to_lowercase();
    NamePass::ALL.into_iter().find_map(|pass| {
        params
            .iter()
            .enumerate()
            .filter(|(i, param)| open[*i] && (!booleans_only || param.is_boolean()))
            .find(|(_, param)| {
                param
                    .names()
                    .any(|name| pass.accepts(&name.to_lowercase(), &key))
            })
            .map(|(i, _)| i)
    })
}

pub struct ParameterBinder<'a> {
    parsers: &'a ParserRegistry,
    contexts: &'a ContextRegistry,
    disambiguation: &'a DisambiguationChannel,
    config: &'a EdictConfig,
}

impl<'a> ParameterBinder<'a> {
    pub fn new(
        parsers: &'a ParserRegistry,
        contexts: &'a ContextRegistry,
        disambiguation: &'a DisambiguationChannel,
        config: &'a EdictConfig,
    ) -> Self {
        Self {
            parsers,
            contexts,
            disambiguation,
            config,
        }
    }

    /// Binds `tokens` to `params`.
    ///
    /// Recoverable problems are reported in the returned [`Binding`]; an
    /// `Err` means the engine itself is inconsistent, such as a parameter
    /// type with no parser or a parser producing the wrong type.
    pub async fn bind(
        &self,
        params: &[ParameterSpec],
        tokens: &[String],
        caller: &Arc<dyn Caller>,
    ) -> Result<Binding> {
        let mut bad_args = Vec::new();
        let mut raw: Vec<Option<String>> = vec![None; params.len()];
        let open = |raw: &[Option<String>]| raw.iter().map(Option::is_none).collect::<Vec<_>>();

        let mut keyed = Vec::new();
        let mut flags = Vec::new();
        let mut keyless = Vec::new();
        for token in tokens {
            match classify(token) {
                Ok(Token::Keyed { raw, key, value }) => keyed.push((raw, key, value)),
                Ok(Token::Flag { raw, name }) => flags.push((raw, name)),
                Ok(Token::Keyless(value)) => keyless.push(value),
                Err(bad) => bad_args.push(bad),
            }
        }

        for (token, key, value) in keyed {
            match claim_by_name(params, &open(&raw), key, false) {
                Some(i) => raw[i] = Some(value.to_string()),
                None => bad_args.push(BadArgument::new(
                    token,
                    "Could not match any parameter's name",
                )),
            }
        }

        for (token, name) in flags {
            match claim_by_name(params, &open(&raw), name, true) {
                Some(i) => raw[i] = Some("true".to_string()),
                None => bad_args.push(BadArgument::new(
                    token,
                    "Could not match any parameter's name",
                )),
            }
        }

        let mut keyless = keyless.into_iter();
        for slot in raw.iter_mut().filter(|slot| slot.is_none()) {
            match keyless.next() {
                Some(value) => *slot = Some(value.to_string()),
                None => break,
            }
        }
        bad_args.extend(
            keyless.map(|token| BadArgument::new(token, "No parameter left to assign this value to")),
        );

        for (param, slot) in params.iter().zip(raw.iter_mut()) {
            if slot.is_none()
                && let Some(default) = param.default()
            {
                *slot = Some(default.to_string());
            }
        }

        let missing: Vec<MissingInput> = params
            .iter()
            .zip(&raw)
            .filter(|(param, slot)| {
                slot.is_none() && !(param.is_contextual() && caller.can_use_context())
            })
            .map(|(param, _)| MissingInput::new(param, None))
            .collect();
        if !missing.is_empty() {
            debug!(missing = missing.len(), "insufficient input");
            return Ok(Binding {
                outcome: BindOutcome::Missing(missing),
                bad_args,
            });
        }

        let mut values: Vec<Option<Value>> = vec![None; params.len()];
        let mut missing = Vec::new();

        for ((param, slot), value) in params.iter().zip(&raw).zip(values.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            let provider = self
                .contexts
                .find(param.value_type())
                .ok_or_else(|| missing_collaborator("context provider", param))?;
            match provider.provide(caller.as_ref()) {
                Ok(provided) => *value = Some(provided),
                Err(reason) => missing.push(MissingInput::new(param, Some(reason))),
            }
        }

        for ((param, slot), value) in params.iter().zip(&raw).zip(values.iter_mut()) {
            let Some(input) = slot else {
                continue;
            };
            let parser = self
                .parsers
                .find(param.value_type())
                .ok_or_else(|| missing_collaborator("value parser", param))?;
            match parser.parse(input) {
                Parsed::Value(parsed) => *value = Some(parsed),
                Parsed::Failed(reason) => {
                    bad_args.push(BadArgument::new(
                        input.as_str(),
                        format!(
                            "Cannot parse this input to parameter {} of type {}",
                            param.name(),
                            param.value_type()
                        ),
                    ));
                    missing.push(MissingInput::new(param, Some(reason)));
                }
                Parsed::Ambiguous(options) => {
                    debug!(
                        param = param.name(),
                        options = options.len(),
                        "ambiguous input"
                    );
                    match self
                        .disambiguation
                        .pick(caller, param, options, parser, self.config)
                        .await
                    {
                        Some(picked) => *value = Some(picked),
                        None => {
                            bad_args.push(BadArgument::new(
                                input.as_str(),
                                "Lead to multiple options, but none were picked.",
                            ));
                            missing.push(MissingInput::new(param, None));
                        }
                    }
                }
            }
        }

        if !missing.is_empty() {
            return Ok(Binding {
                outcome: BindOutcome::Missing(missing),
                bad_args,
            });
        }

        let mut bound = BoundArgs::default();
        for (param, value) in params.iter().zip(values) {
            let Some(value) = value else {
                return Err(EdictError::internal(format!(
                    "parameter '{}' has no value after binding",
                    param.name()
                )));
            };
            if value.value_type() != param.value_type() || !value.is_well_typed() {
                return Err(EdictError::internal(format!(
                    "parameter '{}' expects {} but was bound to {}",
                    param.name(),
                    param.value_type(),
                    value.value_type()
                )));
            }
            bound.values.push((param.name().to_string(), value));
        }

        Ok(Binding {
            outcome: BindOutcome::Complete(bound),
            bad_args,
        })
    }
}

fn missing_collaborator(what: &str, param: &ParameterSpec) -> EdictError {
    EdictError::internal(format!(
        "no {what} for type {} of parameter '{}'",
        param.value_type(),
        param.name()
    ))
}
