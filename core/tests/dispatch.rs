#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use edict_core::BoundArgs;
use edict_core::Caller;
use edict_core::CallerId;
use edict_core::CategoryBuilder;
use edict_core::ChoiceParser;
use edict_core::CommandContext;
use edict_core::CommandTree;
use edict_core::ContextRegistry;
use edict_core::DispatchOutcome;
use edict_core::DispatchRequest;
use edict_core::Dispatcher;
use edict_core::EdictConfig;
use edict_core::EdictError;
use edict_core::LeafBuilder;
use edict_core::Message;
use edict_core::ParameterSpec;
use edict_core::ParserRegistry;
use edict_core::PermissionNode;
use edict_core::Received;
use edict_core::SyncExecutor;
use pretty_assertions::assert_eq;

struct TestCaller {
    id: &'static str,
    denied: Vec<&'static str>,
    messages: Mutex<Vec<Message>>,
}

impl TestCaller {
    fn new(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            denied: Vec::new(),
            messages: Mutex::new(Vec::new()),
        })
    }

    fn denied(id: &'static str, denied: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            id,
            denied,
            messages: Mutex::new(Vec::new()),
        })
    }

    fn lines(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl Caller for TestCaller {
    fn id(&self) -> CallerId {
        CallerId::new(self.id)
    }

    fn name(&self) -> &str {
        self.id
    }

    fn send(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    fn has_permission(&self, node: &PermissionNode) -> bool {
        !self.denied.contains(&node.as_str())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Colour(&'static str);

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, name: &'static str) -> LeafBuilder {
    let log = Arc::clone(log);
    LeafBuilder::new(name, move |ctx: &CommandContext, args: &BoundArgs| {
        let mut entry = ctx.path().join(" ");
        for (param, value) in args.iter() {
            let shown = value
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| value.downcast_ref::<i32>().map(ToString::to_string))
                .or_else(|| value.downcast_ref::<Colour>().map(ToString::to_string))
                .unwrap_or_default();
            entry.push_str(&format!(" {param}={shown}"));
        }
        log.lock().unwrap().push(entry);
        Ok(())
    })
}

fn sample_tree(log: &Log) -> CommandTree {
    CategoryBuilder::new("edict")
        .category(
            CategoryBuilder::new("test")
                .description("Testing commands")
                .command(record(log, "command").description("Does nothing")),
        )
        .category(
            CategoryBuilder::new("admin")
                .permission("admin")
                .command(record(log, "reload")),
        )
        .command(
            record(log, "give")
                .param(ParameterSpec::new::<String>("item"))
                .param(ParameterSpec::new::<i32>("amount").default_value("1")),
        )
        .command(record(log, "paint").param(ParameterSpec::new::<Colour>("colour")))
        .command(
            LeafBuilder::new("fail", |_: &CommandContext, _: &BoundArgs| {
                Err(anyhow::anyhow!("database unavailable"))
            }),
        )
        .command(LeafBuilder::new(
            "explode",
            |_: &CommandContext, _: &BoundArgs| -> anyhow::Result<()> { panic!("kaboom") },
        ))
        .build()
        .expect("tree should build")
}

fn parsers() -> ParserRegistry {
    let mut parsers = ParserRegistry::with_builtins();
    parsers.register_typed(ChoiceParser::new([
        Colour("red"),
        Colour("green"),
        Colour("greenish"),
    ]));
    parsers
}

fn dispatcher(log: &Log, config: EdictConfig) -> Dispatcher {
    Dispatcher::builder(sample_tree(log))
        .parsers(parsers())
        .config(config)
        .build()
        .expect("dispatcher should build")
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn abbreviated_input_runs_nested_command() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let caller = TestCaller::new("alice");

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "tes comman"))
        .await;

    assert_eq!(
        outcome,
        DispatchOutcome::Ran {
            path: vec!["test".to_string(), "command".to_string()]
        }
    );
    assert_eq!(entries(&log), vec!["test command"]);
}

#[tokio::test]
async fn unknown_input_lists_top_level_commands() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let caller = TestCaller::denied("bob", vec!["admin"]);

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "zzz"))
        .await;

    assert_eq!(outcome, DispatchOutcome::NoMatch);
    assert!(!outcome.ran());
    assert_eq!(
        caller.lines(),
        vec![
            "Failed to run any commands for your input. Please try (one of): test, give, paint, fail, explode"
        ]
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn denied_commands_do_not_resolve() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());

    let guest = TestCaller::denied("guest", vec!["admin"]);
    let outcome = dispatcher
        .dispatch(DispatchRequest::new(guest, "admin reload"))
        .await;
    assert_eq!(outcome, DispatchOutcome::NoMatch);

    let admin = TestCaller::new("root");
    let outcome = dispatcher
        .dispatch(DispatchRequest::new(admin, "admin reload"))
        .await;
    assert!(outcome.ran());
}

#[tokio::test]
async fn arguments_bind_with_defaults_and_suffixes() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let caller = TestCaller::new("alice");

    dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "give  amount = 2k   sword"))
        .await;
    dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "give bow"))
        .await;

    assert_eq!(
        entries(&log),
        vec!["give item=sword amount=2000", "give item=bow amount=1"]
    );
}

#[tokio::test]
async fn missing_input_rejects_without_running() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let caller = TestCaller::new("alice");

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "give amount=3 colour=red"))
        .await;

    let DispatchOutcome::Rejected { missing, bad_args } = outcome else {
        panic!("expected a rejection, got {outcome:?}");
    };
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].parameter, "item");
    assert_eq!(bad_args.len(), 1);
    assert_eq!(
        caller.lines(),
        vec![
            "Some of your inputs were bad & ignored:",
            " - 'colour=red' failed because of: Could not match any parameter's name",
            "Some parameters did not get a value:",
            " - Missing input for parameter item (String)",
            "Usage: give item=<String> [amount=<i32>]",
            "Please try running the command again after fixing the parameters",
        ]
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn category_and_blank_input_show_help() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let caller = TestCaller::new("alice");

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "test"))
        .await;
    assert_eq!(
        outcome,
        DispatchOutcome::Help {
            path: vec!["test".to_string()]
        }
    );
    assert_eq!(
        caller.lines(),
        vec!["Commands under 'test':", " - command: Does nothing"]
    );

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "   "))
        .await;
    assert_eq!(outcome, DispatchOutcome::Help { path: Vec::new() });
}

#[tokio::test]
async fn ambiguous_value_is_resolved_by_reply() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let caller = TestCaller::new("carol");
    let as_caller: Arc<dyn Caller> = caller.clone();

    let Received::Dispatched(handle) = dispatcher.receive(Arc::clone(&as_caller), "paint gree")
    else {
        panic!("nothing was pending, so the input should dispatch");
    };

    let id = CallerId::new("carol");
    while !dispatcher.disambiguation().has_pending(&id) {
        tokio::task::yield_now().await;
    }
    assert!(matches!(
        dispatcher.receive(Arc::clone(&as_caller), "greenish"),
        Received::Reply
    ));

    let outcome = handle.await.expect("dispatch task");
    assert!(outcome.ran());
    assert_eq!(entries(&log), vec!["paint colour=greenish"]);
    let lines = caller.lines();
    assert_eq!(lines[0], "Pick a colour (Colour)");
    assert_eq!(
        lines[2],
        "Please pick a valid option.\n1) green\n2) greenish"
    );
}

#[tokio::test(start_paused = true)]
async fn unanswered_prompt_rejects_the_command() {
    let log = Log::default();
    let config = EdictConfig {
        option_pick_attempts: 2,
        option_pick_timeout_seconds: 5,
        ..Default::default()
    };
    let dispatcher = dispatcher(&log, config);
    let caller = TestCaller::new("dave");

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller.clone(), "paint gree"))
        .await;

    let DispatchOutcome::Rejected { missing, bad_args } = outcome else {
        panic!("expected a rejection, got {outcome:?}");
    };
    assert_eq!(missing[0].parameter, "colour");
    assert_eq!(
        bad_args[0].reason,
        "Lead to multiple options, but none were picked."
    );
    assert!(
        caller
            .lines()
            .contains(&"You did not enter a correct option within 2 tries.".to_string())
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn always_pick_first_skips_prompting() {
    let log = Log::default();
    let config = EdictConfig {
        always_pick_first_option: true,
        ..Default::default()
    };
    let dispatcher = dispatcher(&log, config);
    let caller = TestCaller::new("erin");

    let outcome = dispatcher
        .dispatch(DispatchRequest::new(caller, "paint gree").force_sync())
        .await;

    assert!(outcome.ran());
    assert_eq!(entries(&log), vec!["paint colour=green"]);
}

#[tokio::test]
async fn handler_errors_and_panics_get_correlation_codes() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());

    for input in ["fail", "explode"] {
        let caller = TestCaller::new("frank");
        let outcome = dispatcher
            .dispatch(DispatchRequest::new(caller.clone(), input))
            .await;
        let DispatchOutcome::Failed { correlation } = outcome else {
            panic!("expected a failure, got {outcome:?}");
        };
        assert_eq!(
            caller.lines(),
            vec![format!(
                "An internal error occurred while running your command. \
                 Please contact an administrator with code: {correlation}"
            )]
        );
    }
}

#[derive(Default)]
struct CountingExecutor {
    jobs: AtomicUsize,
}

impl SyncExecutor for CountingExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        self.jobs.fetch_add(1, Ordering::SeqCst);
        job();
    }
}

#[tokio::test]
async fn sync_commands_run_through_the_executor() {
    let log = Log::default();
    let tree = CategoryBuilder::new("root")
        .command(record(&log, "save").sync())
        .command(record(&log, "list"))
        .build()
        .expect("tree should build");
    let executor = Arc::new(CountingExecutor::default());
    let dispatcher = Dispatcher::builder(tree)
        .executor(executor.clone())
        .build()
        .expect("dispatcher should build");
    let caller = TestCaller::new("grace");

    assert!(
        dispatcher
            .dispatch(DispatchRequest::new(caller.clone(), "save"))
            .await
            .ran()
    );
    assert!(
        dispatcher
            .dispatch(DispatchRequest::new(caller.clone(), "list"))
            .await
            .ran()
    );

    assert_eq!(executor.jobs.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&log), vec!["save", "list"]);
}

#[test]
fn missing_parser_fails_dispatcher_construction() {
    let log = Log::default();
    let result = Dispatcher::builder(sample_tree(&log)).build();
    assert!(matches!(result, Err(EdictError::MissingParser { .. })));
}

#[test]
fn missing_context_provider_fails_dispatcher_construction() {
    #[derive(Debug)]
    struct Location;

    let tree = CategoryBuilder::new("root")
        .command(
            LeafBuilder::new("here", |_: &CommandContext, _: &BoundArgs| Ok(()))
                .param(ParameterSpec::new::<Location>("at").contextual()),
        )
        .build()
        .expect("tree should build");
    let result = Dispatcher::builder(tree)
        .contexts(ContextRegistry::new())
        .build();
    assert!(matches!(
        result,
        Err(EdictError::MissingContextProvider { .. })
    ));
}

#[test]
fn suggestions_follow_permissions() {
    let log = Log::default();
    let dispatcher = dispatcher(&log, EdictConfig::default());
    let guest = TestCaller::denied("guest", vec!["admin"]);
    assert_eq!(
        dispatcher.suggest("", guest.as_ref()).expect("suggest"),
        vec!["test", "give", "paint", "fail", "explode"]
    );
    assert_eq!(
        dispatcher.suggest("give sword ", guest.as_ref()).expect("suggest"),
        vec!["item=", "amount="]
    );
}
