//! Demo command set and console caller for the `edict` binary.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use edict_core::BoundArgs;
use edict_core::Caller;
use edict_core::CallerId;
use edict_core::CategoryBuilder;
use edict_core::ChoiceParser;
use edict_core::CommandContext;
use edict_core::CommandTree;
use edict_core::ContextRegistry;
use edict_core::Dispatcher;
use edict_core::EdictConfig;
use edict_core::LeafBuilder;
use edict_core::Message;
use edict_core::ParameterSpec;
use edict_core::Parsed;
use edict_core::ParserRegistry;
use edict_core::TypedParser;

/// The local user at the terminal. Holds every permission.
pub struct ConsoleCaller {
    name: String,
}

impl ConsoleCaller {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Caller for ConsoleCaller {
    fn id(&self) -> CallerId {
        CallerId::new(format!("console:{}", self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: Message) {
        match message {
            Message::Error(text) => println!("! {text}"),
            other => println!("{other}"),
        }
    }

    fn can_use_context(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Red,
    Green,
    Greenish,
    Blue,
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Colour::Red => "red",
            Colour::Green => "green",
            Colour::Greenish => "greenish",
            Colour::Blue => "blue",
        })
    }
}

/// Directory the caller is working in; filled from context unless typed.
#[derive(Debug, Clone)]
pub struct Workdir(pub PathBuf);

struct WorkdirParser;

impl TypedParser for WorkdirParser {
    type Output = Workdir;

    fn parse(&self, raw: &str) -> Parsed<Workdir> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Parsed::Failed("a directory cannot be blank".to_string());
        }
        Parsed::Value(Workdir(PathBuf::from(raw)))
    }

    fn render(&self, value: &Workdir) -> String {
        value.0.display().to_string()
    }
}

fn give(ctx: &CommandContext, args: &BoundArgs) -> anyhow::Result<()> {
    let item = args.get::<String>("item").context("item was not bound")?;
    let amount = args.get::<i32>("amount").copied().unwrap_or(1);
    if args.get::<bool>("silent").copied().unwrap_or(false) {
        return Ok(());
    }
    ctx.reply(format!("Gave {amount} x {item} to {}", ctx.caller().name()));
    Ok(())
}

fn paint(ctx: &CommandContext, args: &BoundArgs) -> anyhow::Result<()> {
    let colour = args.get::<Colour>("colour").context("colour was not bound")?;
    ctx.reply(format!("Painted everything {colour}"));
    Ok(())
}

fn whereami(ctx: &CommandContext, args: &BoundArgs) -> anyhow::Result<()> {
    let dir = args.get::<Workdir>("dir").context("dir was not bound")?;
    ctx.reply(format!("You are in {}", dir.0.display()));
    Ok(())
}

/// The command set the console serves.
pub fn demo_tree() -> edict_core::Result<CommandTree> {
    CategoryBuilder::new("edict")
        .command(
            LeafBuilder::new("give", give)
                .description("Hand out items")
                .param(ParameterSpec::new::<String>("item").alias("what"))
                .param(ParameterSpec::new::<i32>("amount").default_value("1"))
                .param(ParameterSpec::new::<bool>("silent").default_value("false")),
        )
        .command(
            LeafBuilder::new("paint", paint)
                .description("Pick a colour")
                .param(ParameterSpec::new::<Colour>("colour")),
        )
        .command(
            LeafBuilder::new("whereami", whereami)
                .description("Show the working directory")
                .param(ParameterSpec::new::<Workdir>("dir").contextual()),
        )
        .category(
            CategoryBuilder::new("test")
                .description("Commands for trying things out")
                .command(
                    LeafBuilder::new("command", |ctx: &CommandContext, _: &BoundArgs| {
                        ctx.reply("Test command ran");
                        Ok(())
                    })
                    .description("Does nothing interesting"),
                )
                .command(
                    LeafBuilder::new("fail", |_: &CommandContext, _: &BoundArgs| {
                        anyhow::bail!("this command always fails")
                    })
                    .description("Shows how handler errors are reported"),
                ),
        )
        .category(
            CategoryBuilder::new("admin")
                .permission("admin")
                .description("Administration")
                .command(
                    LeafBuilder::new("reload", |ctx: &CommandContext, _: &BoundArgs| {
                        ctx.reply("Reloaded");
                        Ok(())
                    })
                    .alias("rl")
                    .description("Pretend to reload")
                    .sync(),
                ),
        )
        .build()
}

/// Dispatcher over [`demo_tree`] with its extra parser and context provider.
pub fn demo_dispatcher(config: EdictConfig) -> edict_core::Result<Dispatcher> {
    let mut parsers = ParserRegistry::with_builtins();
    parsers.register_typed(WorkdirParser);
    parsers.register_typed(ChoiceParser::new([
        Colour::Red,
        Colour::Green,
        Colour::Greenish,
        Colour::Blue,
    ]));

    let mut contexts = ContextRegistry::new();
    contexts.register_fn(|_: &dyn Caller| {
        std::env::current_dir()
            .map(Workdir)
            .map_err(|err| format!("Cannot read the working directory: {err}"))
    });

    Dispatcher::builder(demo_tree()?)
        .parsers(parsers)
        .contexts(contexts)
        .config(config)
        .build()
}
