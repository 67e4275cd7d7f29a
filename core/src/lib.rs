//! `edict-core`: fuzzy command dispatch.
//!
//! Free-text input is resolved against a permission-gated command tree, the
//! remaining tokens are bound to typed parameters, and the matched command
//! is invoked. The main entry point is [`Dispatcher`].

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod binder;
pub mod caller;
pub mod config;
pub mod context;
pub mod disambiguation;
pub mod dispatcher;
mod error;
pub mod parser;
pub mod permission;
pub mod resolver;
pub mod tree;
pub mod value;

pub use binder::BadArgument;
pub use binder::BindOutcome;
pub use binder::Binding;
pub use binder::BoundArgs;
pub use binder::MissingInput;
pub use binder::ParameterBinder;
pub use caller::Caller;
pub use caller::CallerId;
pub use caller::Message;
pub use config::ConfigLoader;
pub use config::EdictConfig;
pub use context::ContextProvider;
pub use context::ContextRegistry;
pub use disambiguation::DisambiguationChannel;
pub use dispatcher::DispatchOutcome;
pub use dispatcher::DispatchRequest;
pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherBuilder;
pub use dispatcher::InlineExecutor;
pub use dispatcher::Received;
pub use dispatcher::SyncExecutor;
pub use dispatcher::clean_input;
pub use error::EdictError;
pub use error::Result;
pub use parser::ChoiceParser;
pub use parser::Parsed;
pub use parser::ParserRegistry;
pub use parser::TypedParser;
pub use parser::ValueParser;
pub use permission::PermissionNode;
pub use resolver::Resolution;
pub use resolver::Resolver;
pub use tree::CategoryBuilder;
pub use tree::CommandContext;
pub use tree::CommandHandler;
pub use tree::CommandNode;
pub use tree::CommandTree;
pub use tree::LeafBuilder;
pub use tree::ParameterSpec;
pub use value::Value;
pub use value::ValueType;
