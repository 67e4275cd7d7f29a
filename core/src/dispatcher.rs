//! Runs one line of input from cleaning through to the command handler.

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use edict_fuzzy::Named;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use uuid::Uuid;

use crate::binder::BadArgument;
use crate::binder::BindOutcome;
use crate::binder::BoundArgs;
use crate::binder::MissingInput;
use crate::binder::ParameterBinder;
use crate::caller::Caller;
use crate::caller::Message;
use crate::caller::permits;
use crate::config::EdictConfig;
use crate::context::ContextRegistry;
use crate::disambiguation::DisambiguationChannel;
use crate::error::Result;
use crate::parser::ParserRegistry;
use crate::resolver::Resolution;
use crate::resolver::Resolver;
use crate::tree::Category;
use crate::tree::CommandContext;
use crate::tree::CommandHandler;
use crate::tree::CommandNode;
use crate::tree::CommandTree;

/// Normalizes raw input: single spaces only, no doubled `=` or `-`, and no
/// spaces around `=`.
pub fn clean_input(input: &str) -> String {
    let mut cleaned = input.split_whitespace().collect::<Vec<_>>().join(" ");
    loop {
        let next = cleaned
            .replace("==", "=")
            .replace("--", "-")
            .replace(" =", "=")
            .replace("= ", "=");
        if next == cleaned {
            return cleaned;
        }
        cleaned = next;
    }
}

/// One line of input from one caller.
pub struct DispatchRequest {
    pub caller: Arc<dyn Caller>,
    pub input: String,
    /// Run on the current task instead of a spawned one.
    pub force_sync: bool,
}

impl DispatchRequest {
    pub fn new(caller: Arc<dyn Caller>, input: impl Into<String>) -> Self {
        Self {
            caller,
            input: input.into(),
            force_sync: false,
        }
    }

    pub fn force_sync(mut self) -> Self {
        self.force_sync = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and returned successfully.
    Ran { path: Vec<String> },
    /// Input stopped at a category (or was blank); its contents were listed.
    Help { path: Vec<String> },
    NoMatch,
    /// A command was found but its parameters could not all be bound.
    Rejected {
        missing: Vec<MissingInput>,
        bad_args: Vec<BadArgument>,
    },
    /// Something went wrong inside the engine or the handler. The caller was
    /// given `correlation` to quote.
    Failed { correlation: String },
}

impl DispatchOutcome {
    pub fn ran(&self) -> bool {
        matches!(self, DispatchOutcome::Ran { .. })
    }
}

/// Where commands marked `sync` are run, e.g. a host's main-thread queue.
pub trait SyncExecutor: Send + Sync {
    fn execute(&self, job: Box<dyn FnOnce() + Send>);
}

/// Runs jobs immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl SyncExecutor for InlineExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        job();
    }
}

/// What [`Dispatcher::receive`] did with a line of text.
#[derive(Debug)]
pub enum Received {
    /// The text answered a pending prompt.
    Reply,
    /// The text was dispatched as a new command.
    Dispatched(JoinHandle<DispatchOutcome>),
}

struct Inner {
    tree: CommandTree,
    parsers: ParserRegistry,
    contexts: ContextRegistry,
    config: EdictConfig,
    executor: Arc<dyn SyncExecutor>,
    disambiguation: DisambiguationChannel,
}

/// Entry point: owns the command tree and everything needed to run it.
///
/// Cloning is cheap and clones share pending prompts.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

pub struct DispatcherBuilder {
    tree: CommandTree,
    parsers: ParserRegistry,
    contexts: ContextRegistry,
    config: EdictConfig,
    executor: Arc<dyn SyncExecutor>,
}

impl DispatcherBuilder {
    /// Replaces the built-in parsers.
    pub fn parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn contexts(mut self, contexts: ContextRegistry) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn config(mut self, config: EdictConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn SyncExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Fails if the configuration is out of range or some parameter type
    /// has no parser (or no context provider, for contextual parameters).
    pub fn build(self) -> Result<Dispatcher> {
        self.config.validate()?;
        self.tree.validate(&self.parsers, &self.contexts)?;
        Ok(Dispatcher {
            inner: Arc::new(Inner {
                tree: self.tree,
                parsers: self.parsers,
                contexts: self.contexts,
                config: self.config,
                executor: self.executor,
                disambiguation: DisambiguationChannel::new(),
            }),
        })
    }
}

impl Dispatcher {
    /// Starts a dispatcher over `tree` with the built-in parsers, no context
    /// providers, default configuration and an [`InlineExecutor`].
    pub fn builder(tree: CommandTree) -> DispatcherBuilder {
        DispatcherBuilder {
            tree,
            parsers: ParserRegistry::with_builtins(),
            contexts: ContextRegistry::new(),
            config: EdictConfig::default(),
            executor: Arc::new(InlineExecutor),
        }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.inner.tree
    }

    pub fn config(&self) -> &EdictConfig {
        &self.inner.config
    }

    pub fn disambiguation(&self) -> &DisambiguationChannel {
        &self.inner.disambiguation
    }

    /// Runs `request` to completion. Unless the request or the configuration
    /// forces synchronous dispatch, the work happens on a spawned task.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchOutcome {
        if request.force_sync || self.inner.config.force_sync {
            return self.run(request).await;
        }

        let caller = Arc::clone(&request.caller);
        let this = self.clone();
        match tokio::spawn(async move { this.run(request).await }).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.internal_failure(caller.as_ref(), &format!("dispatch task failed: {err}"))
            }
        }
    }

    /// Routes text from `caller`: an answer to their pending prompt if they
    /// have one, otherwise a new command. Must be called inside a tokio
    /// runtime.
    pub fn receive(&self, caller: Arc<dyn Caller>, text: &str) -> Received {
        if self.inner.disambiguation.post_reply(&caller.id(), text) {
            debug!(caller = %caller.id(), "delivered reply to pending prompt");
            return Received::Reply;
        }
        let this = self.clone();
        let request = DispatchRequest::new(caller, text);
        Received::Dispatched(tokio::spawn(async move { this.dispatch(request).await }))
    }

    /// Completion candidates for partially typed `input`.
    pub fn suggest(&self, input: &str, caller: &dyn Caller) -> Result<Vec<String>> {
        Resolver::new(&self.inner.tree, self.inner.config.match_threshold).suggest(input, caller)
    }

    /// Abandons every pending prompt.
    pub fn shutdown(&self) {
        self.inner.disambiguation.shutdown();
    }

    async fn run(&self, request: DispatchRequest) -> DispatchOutcome {
        let DispatchRequest { caller, input, .. } = request;
        let input = clean_input(&input);
        let tokens: Vec<String> = input.split_whitespace().map(String::from).collect();

        if tokens.is_empty() {
            send_help(caller.as_ref(), self.inner.tree.root(), &[]);
            return DispatchOutcome::Help { path: Vec::new() };
        }

        let resolver = Resolver::new(&self.inner.tree, self.inner.config.match_threshold);
        let resolution = match resolver.resolve(&tokens, caller.as_ref()) {
            Ok(resolution) => resolution,
            Err(err) => return self.internal_failure(caller.as_ref(), &err.to_string()),
        };
        let (leaf, path, remaining) = match resolution {
            Resolution::NoMatch => {
                send_no_match(caller.as_ref(), self.inner.tree.root());
                info!(caller = %caller.id(), input = %input, "no command matched");
                return DispatchOutcome::NoMatch;
            }
            Resolution::Category { category, path } => {
                send_help(caller.as_ref(), category, &path);
                return DispatchOutcome::Help { path };
            }
            Resolution::Leaf {
                leaf,
                path,
                remaining,
                ..
            } => (leaf, path, remaining),
        };

        let binder = ParameterBinder::new(
            &self.inner.parsers,
            &self.inner.contexts,
            &self.inner.disambiguation,
            &self.inner.config,
        );
        let binding = match binder.bind(leaf.params(), &remaining, &caller).await {
            Ok(binding) => binding,
            Err(err) => return self.internal_failure(caller.as_ref(), &err.to_string()),
        };

        if !binding.bad_args.is_empty() {
            caller.send(Message::error("Some of your inputs were bad & ignored:"));
            for bad in &binding.bad_args {
                caller.send(Message::error(format!(" - {bad}")));
            }
        }

        let args = match binding.outcome {
            BindOutcome::Complete(args) => args,
            BindOutcome::Missing(missing) => {
                caller.send(Message::error("Some parameters did not get a value:"));
                for entry in &missing {
                    caller.send(Message::error(format!(" - {entry}")));
                }
                caller.send(Message::error(format!("Usage: {}", leaf.usage())));
                caller.send(Message::error(
                    "Please try running the command again after fixing the parameters",
                ));
                info!(
                    caller = %caller.id(),
                    command = %path.join(" "),
                    missing = missing.len(),
                    "command rejected"
                );
                return DispatchOutcome::Rejected {
                    missing,
                    bad_args: binding.bad_args,
                };
            }
        };

        let ctx = CommandContext::new(Arc::clone(&caller), path.clone(), input);
        let result = if leaf.is_sync() {
            self.invoke_sync(leaf.handler(), ctx, args).await
        } else {
            invoke(leaf.handler().as_ref(), &ctx, &args)
        };

        match result {
            Ok(()) => {
                info!(caller = %caller.id(), command = %path.join(" "), "command ran");
                DispatchOutcome::Ran { path }
            }
            Err(reason) => self.internal_failure(caller.as_ref(), &reason),
        }
    }

    async fn invoke_sync(
        &self,
        handler: Arc<dyn CommandHandler>,
        ctx: CommandContext,
        args: BoundArgs,
    ) -> std::result::Result<(), String> {
        let (tx, rx) = oneshot::channel();
        self.inner.executor.execute(Box::new(move || {
            let _ = tx.send(invoke(handler.as_ref(), &ctx, &args));
        }));
        rx.await
            .unwrap_or_else(|_| Err("synchronous executor dropped the command".to_string()))
    }

    fn internal_failure(&self, caller: &dyn Caller, reason: &str) -> DispatchOutcome {
        let correlation = Uuid::new_v4().to_string();
        error!(
            correlation = %correlation,
            caller = %caller.id(),
            reason,
            "internal error while dispatching"
        );
        caller.send(Message::error(format!(
            "An internal error occurred while running your command. \
             Please contact an administrator with code: {correlation}"
        )));
        DispatchOutcome::Failed { correlation }
    }
}

/// Calls the handler, turning both errors and panics into a reason string.
fn invoke(
    handler: &dyn CommandHandler,
    ctx: &CommandContext,
    args: &BoundArgs,
) -> std::result::Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(ctx, args))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(format!("handler panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn send_help(caller: &dyn Caller, category: &Category, path: &[String]) {
    if path.is_empty() {
        caller.send(Message::text("Available commands:"));
    } else {
        caller.send(Message::text(format!("Commands under '{}':", path.join(" "))));
    }
    for node in category
        .children()
        .iter()
        .filter(|node| permits(caller, node.permission()))
    {
        let mut line = match node {
            CommandNode::Category(child) => format!(" - {} ...", child.name()),
            CommandNode::Leaf(leaf) => format!(" - {}", leaf.usage()),
        };
        if !node.description().is_empty() {
            line.push_str(": ");
            line.push_str(node.description());
        }
        caller.send(Message::text(line));
    }
}

fn send_no_match(caller: &dyn Caller, root: &Category) {
    let options: Vec<&str> = root
        .children()
        .iter()
        .filter(|node| permits(caller, node.permission()))
        .map(Named::name)
        .collect();
    caller.send(Message::error(format!(
        "Failed to run any commands for your input. Please try (one of): {}",
        options.join(", ")
    )));
}
