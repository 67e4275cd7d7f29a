//! Walks the command tree to find the command a line of input names.
//!
//! At each category the next token is looked up in that category's name
//! index, filtered by the caller's permissions. Matching categories are
//! walked recursively and matching leaves end the walk. Of every path found,
//! the deepest wins; equal depths keep the first one discovered, visiting
//! children in declaration order.

use edict_fuzzy::Named;
use edict_fuzzy::SearchMode;
use tracing::debug;

use crate::caller::Caller;
use crate::caller::permits;
use crate::error::Result;
use crate::tree::Category;
use crate::tree::CommandNode;
use crate::tree::CommandTree;
use crate::tree::Leaf;

#[derive(Debug)]
pub enum Resolution<'t> {
    /// A runnable command and the tokens left over for its parameters.
    Leaf {
        leaf: &'t Leaf,
        path: Vec<String>,
        remaining: Vec<String>,
        depth: usize,
    },
    /// Input ran out at a category; show its contents.
    Category {
        category: &'t Category,
        path: Vec<String>,
    },
    NoMatch,
}

impl Resolution<'_> {
    pub fn depth(&self) -> usize {
        match self {
            Resolution::Leaf { depth, .. } => *depth,
            Resolution::Category { path, .. } => path.len(),
            Resolution::NoMatch => 0,
        }
    }
}

pub struct Resolver<'t> {
    tree: &'t CommandTree,
    threshold: f64,
}

impl<'t> Resolver<'t> {
    pub fn new(tree: &'t CommandTree, threshold: f64) -> Self {
        Self { tree, threshold }
    }

    pub fn resolve(&self, tokens: &[String], caller: &dyn Caller) -> Result<Resolution<'t>> {
        let mut found = Vec::new();
        self.walk(self.tree.root(), tokens, Vec::new(), caller, &mut found)?;

        let mut best: Option<Resolution<'t>> = None;
        for candidate in found {
            if best
                .as_ref()
                .is_none_or(|current| candidate.depth() > current.depth())
            {
                best = Some(candidate);
            }
        }

        let resolution = best.unwrap_or(Resolution::NoMatch);
        debug!(
            input = %tokens.join(" "),
            depth = resolution.depth(),
            "resolved command path"
        );
        Ok(resolution)
    }

    fn walk(
        &self,
        category: &'t Category,
        tokens: &[String],
        path: Vec<String>,
        caller: &dyn Caller,
        found: &mut Vec<Resolution<'t>>,
    ) -> Result<()> {
        let Some((head, rest)) = tokens.split_first() else {
            found.push(Resolution::Category { category, path });
            return Ok(());
        };

        let hits = category.children().search(
            head,
            self.threshold,
            |node| permits(caller, node.permission()),
            SearchMode::Best,
        )?;

        for hit in hits {
            let mut next = path.clone();
            next.push(hit.item.name().to_string());
            match hit.item {
                CommandNode::Category(child) => self.walk(child, rest, next, caller, found)?,
                CommandNode::Leaf(leaf) => found.push(Resolution::Leaf {
                    leaf,
                    depth: next.len(),
                    path: next,
                    remaining: rest.to_vec(),
                }),
            }
        }
        Ok(())
    }

    /// Completion candidates for partially typed `input`.
    ///
    /// A trailing space means the last token is finished, so the children of
    /// the category reached so far are listed (primary names, then aliases).
    /// Otherwise the last token is matched fuzzily at the current level. Once
    /// a command is reached, its unfilled parameters are offered as `name=`.
    pub fn suggest(&self, input: &str, caller: &dyn Caller) -> Result<Vec<String>> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let finished = input.is_empty() || input.ends_with(char::is_whitespace);
        let (complete, partial) = match (finished, tokens.split_last()) {
            (false, Some((last, init))) => (init, Some(*last)),
            _ => (tokens.as_slice(), None),
        };

        let mut category = self.tree.root();
        for (i, token) in complete.iter().enumerate() {
            let hits = category.children().search(
                token,
                self.threshold,
                |node| permits(caller, node.permission()),
                SearchMode::Best,
            )?;
            match hits.first().map(|hit| hit.item) {
                Some(CommandNode::Category(child)) => category = child,
                Some(CommandNode::Leaf(leaf)) => {
                    return Ok(parameter_suggestions(leaf, &tokens[i + 1..]));
                }
                None => return Ok(Vec::new()),
            }
        }

        let permitted = category
            .children()
            .iter()
            .filter(|node| permits(caller, node.permission()));
        let Some(partial) = partial else {
            let mut names: Vec<String> = permitted
                .clone()
                .map(|node| node.name().to_string())
                .collect();
            names.extend(permitted.flat_map(|node| node.aliases().iter().cloned()));
            return Ok(names);
        };

        let mut hits = category.children().search(
            partial,
            self.threshold,
            |node| permits(caller, node.permission()),
            SearchMode::All,
        )?;
        hits.sort_by_key(|hit| hit.distance);
        Ok(hits
            .into_iter()
            .map(|hit| hit.item.name().to_string())
            .collect())
    }
}

fn parameter_suggestions(leaf: &Leaf, typed: &[&str]) -> Vec<String> {
    let used: Vec<String> = typed
        .iter()
        .filter_map(|token| token.split_once('='))
        .map(|(key, _)| key.trim_start_matches('-').to_lowercase())
        .collect();
    leaf.params()
        .iter()
        .filter(|param| {
            !param
                .names()
                .any(|name| used.iter().any(|key| key == &name.to_lowercase()))
        })
        .map(|param| format!("{}=", param.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BoundArgs;
    use crate::caller::CallerId;
    use crate::caller::Message;
    use crate::permission::PermissionNode;
    use crate::tree::CategoryBuilder;
    use crate::tree::CommandContext;
    use crate::tree::LeafBuilder;
    use crate::tree::ParameterSpec;
    use pretty_assertions::assert_eq;
    use std::any::Any;

    struct Guest {
        denied: Vec<&'static str>,
    }

    impl Caller for Guest {
        fn id(&self) -> CallerId {
            CallerId::new("guest")
        }

        fn name(&self) -> &str {
            "guest"
        }

        fn send(&self, _message: Message) {}

        fn has_permission(&self, node: &PermissionNode) -> bool {
            !self.denied.contains(&node.as_str())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn anyone() -> Guest {
        Guest { denied: Vec::new() }
    }

    fn noop(name: &str) -> LeafBuilder {
        LeafBuilder::new(name, |_: &CommandContext, _: &BoundArgs| Ok(()))
    }

    fn tokens(input: &str) -> Vec<String> {
        input.split_whitespace().map(String::from).collect()
    }

    fn sample_tree() -> CommandTree {
        CategoryBuilder::new("edict")
            .category(CategoryBuilder::new("test").command(noop("command")))
            .category(
                CategoryBuilder::new("admin")
                    .permission("admin")
                    .command(noop("reload").alias("rl")),
            )
            .command(
                noop("give")
                    .param(ParameterSpec::new::<String>("item"))
                    .param(ParameterSpec::new::<i32>("amount")),
            )
            .build()
            .expect("tree should build")
    }

    fn leaf_path(resolution: &Resolution<'_>) -> Option<Vec<String>> {
        match resolution {
            Resolution::Leaf { path, .. } => Some(path.clone()),
            _ => None,
        }
    }

    #[test]
    fn abbreviations_resolve_to_nested_leaf() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        let resolution = resolver
            .resolve(&tokens("tes comman"), &anyone())
            .expect("resolve");
        assert_eq!(
            leaf_path(&resolution),
            Some(vec!["test".to_string(), "command".to_string()])
        );
        assert_eq!(resolution.depth(), 2);
    }

    #[test]
    fn unknown_input_is_no_match() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        let resolution = resolver.resolve(&tokens("zzz"), &anyone()).expect("resolve");
        assert!(matches!(resolution, Resolution::NoMatch));
    }

    #[test]
    fn leftover_tokens_are_returned() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        let resolution = resolver
            .resolve(&tokens("give sword amount=3"), &anyone())
            .expect("resolve");
        match resolution {
            Resolution::Leaf { remaining, .. } => {
                assert_eq!(remaining, vec!["sword", "amount=3"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exhausted_input_at_category_asks_for_help() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        let resolution = resolver.resolve(&tokens("test"), &anyone()).expect("resolve");
        match resolution {
            Resolution::Category { category, path } => {
                assert_eq!(category.name(), "test");
                assert_eq!(path, vec!["test"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn denied_branches_are_invisible() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        let guest = Guest {
            denied: vec!["admin"],
        };
        let resolution = resolver.resolve(&tokens("admin rl"), &guest).expect("resolve");
        assert!(matches!(resolution, Resolution::NoMatch));

        let resolution = resolver
            .resolve(&tokens("admin rl"), &anyone())
            .expect("resolve");
        assert_eq!(
            leaf_path(&resolution),
            Some(vec!["admin".to_string(), "reload".to_string()])
        );
    }

    #[test]
    fn deepest_path_wins() {
        let tree = CategoryBuilder::new("root")
            .command(noop("seta"))
            .category(CategoryBuilder::new("setb").command(noop("list")))
            .build()
            .expect("tree should build");
        let resolver = Resolver::new(&tree, 0.6);
        let resolution = resolver
            .resolve(&tokens("set list"), &anyone())
            .expect("resolve");
        assert_eq!(
            leaf_path(&resolution),
            Some(vec!["setb".to_string(), "list".to_string()])
        );
    }

    #[test]
    fn equal_depth_keeps_first_declared() {
        let tree = CategoryBuilder::new("root")
            .category(CategoryBuilder::new("stats").command(noop("show")))
            .category(CategoryBuilder::new("state").command(noop("show")))
            .build()
            .expect("tree should build");
        let resolver = Resolver::new(&tree, 0.6);
        let resolution = resolver
            .resolve(&tokens("stat show"), &anyone())
            .expect("resolve");
        assert_eq!(
            leaf_path(&resolution),
            Some(vec!["stats".to_string(), "show".to_string()])
        );
    }

    #[test]
    fn suggestions_list_children_then_aliases() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        assert_eq!(
            resolver.suggest("", &anyone()).expect("suggest"),
            vec!["test", "admin", "give"]
        );
        assert_eq!(
            resolver.suggest("admin ", &anyone()).expect("suggest"),
            vec!["reload", "rl"]
        );
    }

    #[test]
    fn suggestions_complete_partial_tokens() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        assert_eq!(
            resolver.suggest("test com", &anyone()).expect("suggest"),
            vec!["command"]
        );
    }

    #[test]
    fn suggestions_offer_unfilled_parameters() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        assert_eq!(
            resolver.suggest("give item=sword ", &anyone()).expect("suggest"),
            vec!["amount="]
        );
    }

    #[test]
    fn suggestions_hide_denied_nodes() {
        let tree = sample_tree();
        let resolver = Resolver::new(&tree, 0.6);
        let guest = Guest {
            denied: vec!["admin"],
        };
        assert_eq!(
            resolver.suggest("", &guest).expect("suggest"),
            vec!["test", "give"]
        );
    }
}
