//! The command hierarchy: categories route deeper, leaves run.
//!
//! A [`CommandTree`] is assembled once by [`CategoryBuilder`] and is
//! immutable afterwards; every category's [`NameIndex`] is built exactly
//! once, over its direct children, when the category is built.

mod builder;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use edict_fuzzy::NameIndex;
use edict_fuzzy::Named;

pub use builder::CategoryBuilder;
pub use builder::LeafBuilder;

use crate::binder::BoundArgs;
use crate::caller::Caller;
use crate::caller::Message;
use crate::context::ContextRegistry;
use crate::error::EdictError;
use crate::error::Result;
use crate::parser::ParserRegistry;
use crate::permission::PermissionNode;
use crate::value::ValueType;

/// A declared command parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    name: String,
    aliases: Vec<String>,
    description: String,
    value_type: ValueType,
    default: Option<String>,
    contextual: bool,
}

impl ParameterSpec {
    pub fn new<T: Any>(name: impl Into<String>) -> Self {
        Self::of_type(name, ValueType::of::<T>())
    }

    pub fn of_type(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            value_type,
            default: None,
            contextual: false,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Raw input used when the caller gives none. Blank defaults are ignored.
    pub fn default_value(mut self, raw: impl Into<String>) -> Self {
        let raw: String = raw.into();
        self.default = (!raw.trim().is_empty()).then_some(raw);
        self
    }

    pub fn contextual(mut self) -> Self {
        self.contextual = true;
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_contextual(&self) -> bool {
        self.contextual
    }

    pub fn is_boolean(&self) -> bool {
        self.value_type.is::<bool>()
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    /// Optional parameters sort after required ones: contextual adds 1 and a
    /// default adds 2.
    pub(crate) fn ordering_weight(&self) -> u8 {
        u8::from(self.contextual) + 2 * u8::from(self.default.is_some())
    }
}

impl Named for ParameterSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// What a handler sees about the dispatch that invoked it.
#[derive(Clone)]
pub struct CommandContext {
    caller: Arc<dyn Caller>,
    path: Vec<String>,
    input: String,
}

impl CommandContext {
    pub fn new(caller: Arc<dyn Caller>, path: Vec<String>, input: impl Into<String>) -> Self {
        Self {
            caller,
            path,
            input: input.into(),
        }
    }

    pub fn caller(&self) -> &dyn Caller {
        self.caller.as_ref()
    }

    /// Primary names from the root to the running command.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The cleaned input line.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reply(&self, text: impl Into<String>) {
        self.caller.send(Message::Text(text.into()));
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("caller", &self.caller.id())
            .field("path", &self.path)
            .field("input", &self.input)
            .finish()
    }
}

pub trait CommandHandler: Send + Sync {
    fn invoke(&self, ctx: &CommandContext, args: &BoundArgs) -> anyhow::Result<()>;
}

impl<F> CommandHandler for F
where
    F: Fn(&CommandContext, &BoundArgs) -> anyhow::Result<()> + Send + Sync,
{
    fn invoke(&self, ctx: &CommandContext, args: &BoundArgs) -> anyhow::Result<()> {
        self(ctx, args)
    }
}

#[derive(Debug)]
pub enum CommandNode {
    Category(Category),
    Leaf(Leaf),
}

impl CommandNode {
    pub fn permission(&self) -> &PermissionNode {
        match self {
            CommandNode::Category(category) => &category.permission,
            CommandNode::Leaf(leaf) => &leaf.permission,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CommandNode::Category(category) => &category.description,
            CommandNode::Leaf(leaf) => &leaf.description,
        }
    }
}

impl Named for CommandNode {
    fn name(&self) -> &str {
        match self {
            CommandNode::Category(category) => &category.name,
            CommandNode::Leaf(leaf) => &leaf.name,
        }
    }

    fn aliases(&self) -> &[String] {
        match self {
            CommandNode::Category(category) => &category.aliases,
            CommandNode::Leaf(leaf) => &leaf.aliases,
        }
    }
}

#[derive(Debug)]
pub struct Category {
    name: String,
    aliases: Vec<String>,
    description: String,
    permission: PermissionNode,
    children: NameIndex<CommandNode>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn permission(&self) -> &PermissionNode {
        &self.permission
    }

    pub fn children(&self) -> &NameIndex<CommandNode> {
        &self.children
    }
}

pub struct Leaf {
    name: String,
    aliases: Vec<String>,
    description: String,
    permission: PermissionNode,
    params: Vec<ParameterSpec>,
    handler: Arc<dyn CommandHandler>,
    sync: bool,
}

impl Leaf {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn permission(&self) -> &PermissionNode {
        &self.permission
    }

    /// Parameters, required ones first.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        Arc::clone(&self.handler)
    }

    /// Whether the command must run through the host's synchronous executor.
    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// One-line usage such as `give item=<String> [amount=<i32>]`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for param in &self.params {
            let token = format!("{}=<{}>", param.name(), param.value_type());
            if param.default().is_some() || param.is_contextual() {
                usage.push_str(&format!(" [{token}]"));
            } else {
                usage.push(' ');
                usage.push_str(&token);
            }
        }
        usage
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("params", &self.params)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

/// Immutable command hierarchy under a synthetic root category.
#[derive(Debug)]
pub struct CommandTree {
    root: Category,
}

impl CommandTree {
    pub fn root(&self) -> &Category {
        &self.root
    }

    /// Checks that every parameter type can actually be produced: a parser
    /// for each declared type and a context provider for each contextual one.
    pub fn validate(&self, parsers: &ParserRegistry, contexts: &ContextRegistry) -> Result<()> {
        fn walk(
            category: &Category,
            parsers: &ParserRegistry,
            contexts: &ContextRegistry,
        ) -> Result<()> {
            for node in category.children().iter() {
                match node {
                    CommandNode::Category(child) => walk(child, parsers, contexts)?,
                    CommandNode::Leaf(leaf) => {
                        for param in leaf.params() {
                            if param.is_contextual() && contexts.find(param.value_type()).is_none()
                            {
                                return Err(EdictError::MissingContextProvider {
                                    command: leaf.name().to_string(),
                                    parameter: param.name().to_string(),
                                    value_type: param.value_type().name(),
                                });
                            }
                            if parsers.find(param.value_type()).is_none() {
                                return Err(EdictError::MissingParser {
                                    command: leaf.name().to_string(),
                                    parameter: param.name().to_string(),
                                    value_type: param.value_type().name(),
                                });
                            }
                        }
                    }
                }
            }
            Ok(())
        }

        walk(&self.root, parsers, contexts)
    }
}
