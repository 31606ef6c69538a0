//! Fluent construction for nodes.

use crate::error::TreeError;
use crate::tree::action::{ActionDef, ActionResult};
use crate::tree::node::Node;
use crate::tree::validate::TypeSpec;
use crate::tree::watch::WatchHandler;
use futures_util::future::BoxFuture;
use serde_json::Value;

/// Declarative shape of one child: a leaf, a typed leaf, or a nested
/// branch.
pub enum ChildSpec {
    Leaf(Value),
    Typed(Value, TypeSpec),
    Branch(Vec<(String, ChildSpec)>),
}

impl ChildSpec {
    pub fn leaf(value: impl Into<Value>) -> Self {
        ChildSpec::Leaf(value.into())
    }

    pub fn typed(value: impl Into<Value>, ty: impl Into<TypeSpec>) -> Self {
        ChildSpec::Typed(value.into(), ty.into())
    }

    pub fn branch(children: impl IntoIterator<Item = (impl Into<String>, ChildSpec)>) -> Self {
        ChildSpec::Branch(
            children
                .into_iter()
                .map(|(name, spec)| (name.into(), spec))
                .collect(),
        )
    }
}

/// Builder for a node with children, actions, and watchers declared up
/// front. Obtained through [`Node::build`].
pub struct NodeBuilder {
    name: String,
    value: Option<Value>,
    ty: Option<TypeSpec>,
    children: Vec<(String, ChildSpec)>,
    actions: Vec<(String, ActionDef)>,
    watches: Vec<(String, WatchHandler)>,
}

impl NodeBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            ty: None,
            children: Vec::new(),
            actions: Vec::new(),
            watches: Vec::new(),
        }
    }

    /// The leaf scalar. Discarded if any child is declared.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Type constraint for the leaf scalar.
    pub fn typed(mut self, ty: impl Into<TypeSpec>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    /// Declare a leaf child.
    pub fn child(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.children.push((key.into(), ChildSpec::leaf(value)));
        self
    }

    /// Declare a typed leaf child.
    pub fn child_typed(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ty: impl Into<TypeSpec>,
    ) -> Self {
        self.children.push((key.into(), ChildSpec::typed(value, ty)));
        self
    }

    /// Declare a child from a spec (nesting branches).
    pub fn child_spec(mut self, key: impl Into<String>, spec: ChildSpec) -> Self {
        self.children.push((key.into(), spec));
        self
    }

    /// Register a synchronous action.
    pub fn action(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&Node, &[Value]) -> ActionResult + Send + Sync + 'static,
    ) -> Self {
        self.actions.push((name.into(), ActionDef::sync(handler, false)));
        self
    }

    /// Register a synchronous transactional action.
    pub fn action_transactional(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&Node, &[Value]) -> ActionResult + Send + Sync + 'static,
    ) -> Self {
        self.actions.push((name.into(), ActionDef::sync(handler, true)));
        self
    }

    /// Register an asynchronous action.
    pub fn action_async(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(Node, Vec<Value>) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.actions
            .push((name.into(), ActionDef::asynchronous(handler, false)));
        self
    }

    /// Register an asynchronous transactional action.
    pub fn action_async_transactional(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(Node, Vec<Value>) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.actions
            .push((name.into(), ActionDef::asynchronous(handler, true)));
        self
    }

    /// Watch a child field with a callback or a registered action name.
    pub fn watch(mut self, key: impl Into<String>, handler: impl Into<WatchHandler>) -> Self {
        self.watches.push((key.into(), handler.into()));
        self
    }

    /// Assemble the node. Children win over a declared scalar value, which
    /// is discarded; actions install after the tree exists so auto-setters
    /// are already in place; watchers register last so their baselines see
    /// the constructed values.
    pub fn finish(self) -> Result<Node, TreeError> {
        let node = Node::new(&self.name)?;
        if self.children.is_empty() {
            if let Some(ty) = self.ty {
                node.set_type(ty);
            }
            if let Some(value) = self.value {
                node.set_initial(value);
            }
        } else {
            if self.value.is_some() {
                tracing::warn!(node = %self.name, "scalar value discarded: children supplied");
            }
            for (key, spec) in self.children {
                attach(&node, &key, spec)?;
            }
        }
        for (name, def) in self.actions {
            node.install_action(&name, def)?;
        }
        for (key, handler) in self.watches {
            node.watch(&key, handler)?;
        }
        Ok(node)
    }
}

fn attach(parent: &Node, key: &str, spec: ChildSpec) -> Result<(), TreeError> {
    match spec {
        ChildSpec::Leaf(value) => {
            parent.add_child(key, value)?;
        }
        ChildSpec::Typed(value, ty) => {
            parent.add_child_typed(key, value, ty)?;
        }
        ChildSpec::Branch(children) => {
            let branch = parent.add_branch(key)?;
            for (name, child) in children {
                attach(&branch, &name, child)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::validate::TypeTag;
    use serde_json::json;

    #[test]
    fn a_value_builder_yields_an_active_leaf() {
        let node = Node::build("count").value(json!(3)).finish().unwrap();
        assert!(node.is_active());
        assert_eq!(node.value(), Some(json!(3)));
    }

    #[test]
    fn children_discard_a_declared_scalar_value() {
        let node = Node::build("person")
            .value(json!(1))
            .child("age", json!(50))
            .finish()
            .unwrap();
        assert!(node.has_children());
        assert_eq!(node.value(), None);
        assert_eq!(node.values(), json!({"age": 50}));
    }

    #[test]
    fn nested_branch_specs_build_recursively() {
        let node = Node::build("profile")
            .child("name", json!("Bob"))
            .child_spec(
                "pos",
                ChildSpec::branch([
                    ("x", ChildSpec::typed(json!(0), TypeTag::Number)),
                    ("y", ChildSpec::typed(json!(0), TypeTag::Number)),
                ]),
            )
            .finish()
            .unwrap();

        assert_eq!(
            node.values(),
            json!({"name": "Bob", "pos": {"x": 0, "y": 0}})
        );
        let pos = node.child("pos").unwrap();
        assert!(pos.has_children());
        pos.set_field("x", json!(5)).unwrap();
        assert_eq!(node.values()["pos"]["x"], json!(5));
    }

    #[test]
    fn duplicate_builder_children_fail_the_build() {
        let result = Node::build("person")
            .child("age", json!(1))
            .child("age", json!(2))
            .finish();
        assert_eq!(
            result.unwrap_err(),
            TreeError::DuplicateChild {
                node: "person".to_string(),
                key: "age".to_string(),
            }
        );
    }

    #[test]
    fn builder_actions_and_watches_are_registered() {
        let node = Node::build("coord")
            .child("x", json!(0))
            .action("noop", |_, _| Ok(None))
            .watch("x", "noop")
            .finish()
            .unwrap();
        assert!(node.action_names().contains(&"noop".to_string()));
    }
}
