use std::collections::HashSet;
use std::sync::Arc;

use edict_fuzzy::NameIndex;
use edict_fuzzy::Named;

use super::Category;
use super::CommandContext;
use super::CommandHandler;
use super::CommandNode;
use super::CommandTree;
use super::Leaf;
use super::ParameterSpec;
use crate::binder::BoundArgs;
use crate::error::EdictError;
use crate::error::Result;
use crate::permission::PermissionNode;

/// Builder for a category, or for a whole tree when used as the root.
///
/// Permission segments extend the parent's node; a node without one inherits
/// its parent's permission.
#[derive(Default)]
pub struct CategoryBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    permission: Option<String>,
    children: Vec<NodeBuilder>,
}

enum NodeBuilder {
    Category(CategoryBuilder),
    Leaf(LeafBuilder),
}

impl CategoryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
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

    pub fn permission(mut self, segment: impl Into<String>) -> Self {
        self.permission = Some(segment.into());
        self
    }

    pub fn category(mut self, category: CategoryBuilder) -> Self {
        self.children.push(NodeBuilder::Category(category));
        self
    }

    pub fn command(mut self, leaf: LeafBuilder) -> Self {
        self.children.push(NodeBuilder::Leaf(leaf));
        self
    }

    /// Builds a tree with `self` as its root category.
    pub fn build(self) -> Result<CommandTree> {
        let root = build_category(self, &PermissionNode::unrestricted())?;
        Ok(CommandTree { root })
    }
}

pub struct LeafBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    permission: Option<String>,
    params: Vec<ParameterSpec>,
    handler: Arc<dyn CommandHandler>,
    sync: bool,
}

impl LeafBuilder {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&CommandContext, &BoundArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::with_handler(name, Arc::new(handler))
    }

    pub fn with_handler(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            permission: None,
            params: Vec::new(),
            handler,
            sync: false,
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

    pub fn permission(mut self, segment: impl Into<String>) -> Self {
        self.permission = Some(segment.into());
        self
    }

    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Route invocations through the host's synchronous executor.
    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }
}

fn build_category(builder: CategoryBuilder, parent: &PermissionNode) -> Result<Category> {
    check_own_names(&builder.name, &builder.aliases)?;
    if builder.children.is_empty() {
        return Err(EdictError::EmptyCategory { name: builder.name });
    }

    let permission = inherit(parent, builder.permission.as_deref());
    let mut seen = HashSet::new();
    let mut children = Vec::with_capacity(builder.children.len());
    for child in builder.children {
        let node = match child {
            NodeBuilder::Category(category) => {
                CommandNode::Category(build_category(category, &permission)?)
            }
            NodeBuilder::Leaf(leaf) => CommandNode::Leaf(build_leaf(leaf, &permission)?),
        };
        let names = match &node {
            CommandNode::Category(category) => names_of(category.name(), category.aliases()),
            CommandNode::Leaf(leaf) => names_of(leaf.name(), leaf.aliases()),
        };
        claim(&mut seen, &builder.name, names)?;
        children.push(node);
    }

    Ok(Category {
        name: builder.name,
        aliases: builder.aliases,
        description: builder.description,
        permission,
        children: NameIndex::build(children),
    })
}

fn build_leaf(builder: LeafBuilder, parent: &PermissionNode) -> Result<Leaf> {
    check_own_names(&builder.name, &builder.aliases)?;

    let mut seen = HashSet::new();
    for param in &builder.params {
        let names = names_of(param.name(), param.aliases());
        for name in &names {
            check_name(&builder.name, name)?;
        }
        claim(&mut seen, &builder.name, names)?;
    }

    let mut params = builder.params;
    params.sort_by_key(ParameterSpec::ordering_weight);

    Ok(Leaf {
        permission: inherit(parent, builder.permission.as_deref()),
        name: builder.name,
        aliases: builder.aliases,
        description: builder.description,
        params,
        handler: builder.handler,
        sync: builder.sync,
    })
}

fn inherit(parent: &PermissionNode, segment: Option<&str>) -> PermissionNode {
    match segment {
        Some(segment) => parent.child(segment),
        None => parent.clone(),
    }
}

fn names_of<'a>(name: &'a str, aliases: &'a [String]) -> Vec<&'a str> {
    std::iter::once(name)
        .chain(aliases.iter().map(String::as_str))
        .collect()
}

fn check_name(scope: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EdictError::EmptyName {
            scope: scope.to_string(),
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(EdictError::InvalidName {
            scope: scope.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

/// A node's own name and aliases must be valid and distinct.
fn check_own_names(name: &str, aliases: &[String]) -> Result<()> {
    let names = names_of(name, aliases);
    for candidate in &names {
        check_name(name, candidate)?;
    }
    claim(&mut HashSet::new(), name, names)
}

/// Records `names` in `seen`, failing on the first case-insensitive repeat.
fn claim(seen: &mut HashSet<String>, scope: &str, names: Vec<&str>) -> Result<()> {
    for name in names {
        if !seen.insert(name.to_lowercase()) {
            return Err(EdictError::DuplicateName {
                scope: scope.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
