//! Linked tree nodes.
//!
//! A [`Node`] is a cheap, cloneable handle. Children are owned through strong
//! references, the parent through a weak one, so a tree lives as long as a
//! handle to its root is held. Handle equality is node identity.
//!
//! Each node keeps its record with the children field detached (the payload).
//! [`Node::model`] re-attaches the models of the current children, so the record
//! view always mirrors the node structure.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, instrument};

use crate::config::TreeConfig;
use crate::errors::{TreeError, TreeResult};
use crate::record::Record;
use crate::traversal::{self, Strategy, VisitResult, WalkOptions};

struct NodeInner<R: Record> {
    payload: R,
    /// Whether the record carries a children field (mirrored by `model()`)
    has_children_field: bool,
    parent: Weak<RefCell<NodeInner<R>>>,
    children: Vec<Node<R>>,
    config: Rc<TreeConfig<R>>,
}

/// Tree node wrapping one record.
pub struct Node<R: Record = serde_json::Value> {
    inner: Rc<RefCell<NodeInner<R>>>,
}

impl<R: Record> Clone for Node<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: Record> PartialEq for Node<R> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R: Record> Eq for Node<R> {}

impl<R: Record> fmt::Debug for Node<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Node")
                .field("payload", &inner.payload)
                .field("children", &inner.children)
                .finish(),
            Err(_) => f.write_str("Node(<mutably borrowed>)"),
        }
    }
}

impl<R: Record> Node<R> {
    pub(crate) fn new(payload: R, has_children_field: bool, config: Rc<TreeConfig<R>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeInner {
                payload,
                has_children_field,
                parent: Weak::new(),
                children: Vec::new(),
                config,
            })),
        }
    }

    /// Link freshly parsed, already ordered children below this node.
    pub(crate) fn link_children(&self, children: Vec<Node<R>>) {
        for child in &children {
            child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        }
        self.inner.borrow_mut().children = children;
    }

    /// The record without its children field.
    pub fn payload(&self) -> Ref<'_, R> {
        Ref::map(self.inner.borrow(), |inner| &inner.payload)
    }

    pub fn payload_mut(&self) -> RefMut<'_, R> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.payload)
    }

    /// The full record: payload plus the models of the current children under
    /// the configured children field (present if the record had one or a
    /// child was ever added).
    pub fn model(&self) -> R {
        let inner = self.inner.borrow();
        let mut model = inner.payload.clone();
        if inner.has_children_field {
            let children = inner.children.iter().map(Node::model).collect();
            model.set_children(inner.config.children_field_name(), children);
        }
        model
    }

    pub fn config(&self) -> Rc<TreeConfig<R>> {
        Rc::clone(&self.inner.borrow().config)
    }

    /// The node this one is attached to.
    ///
    /// The parent link is weak: once every handle to the ancestors has been
    /// released, the ancestors are freed and this reports `None` even though
    /// `drop` was never called. Hold the root to keep a tree intact.
    pub fn parent(&self) -> Option<Node<R>> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Node { inner })
    }

    pub fn children(&self) -> Vec<Node<R>> {
        self.inner.borrow().children.clone()
    }

    /// True when [`Node::parent`] is `None`.
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.inner.borrow().children.is_empty()
    }

    /// Position among the parent's children, `None` for a root.
    pub fn index(&self) -> Option<usize> {
        let parent = self.parent()?;
        let siblings = parent.inner.borrow();
        let index = siblings.children.iter().position(|c| c == self);
        index
    }

    // ------------------------------------------------------------
    // Traversal and search
    // ------------------------------------------------------------

    /// Walk this subtree in pre-order; `false` from the callback stops the walk.
    pub fn walk<F, V>(&self, callback: F)
    where
        F: FnMut(&Node<R>) -> V,
        V: VisitResult,
    {
        self.walk_with(WalkOptions::default(), callback);
    }

    pub fn walk_with<F, V>(&self, options: WalkOptions, mut callback: F)
    where
        F: FnMut(&Node<R>) -> V,
        V: VisitResult,
    {
        traversal::walk(self, options.strategy, &mut callback);
    }

    /// Walk with a strategy given by name (`"pre"`, `"post"` or `"breadth"`).
    ///
    /// An unknown name fails before any node is visited.
    pub fn walk_named<F, V>(&self, strategy: &str, callback: F) -> TreeResult<()>
    where
        F: FnMut(&Node<R>) -> V,
        V: VisitResult,
    {
        let strategy: Strategy = strategy.parse()?;
        self.walk_with(WalkOptions::new(strategy), callback);
        Ok(())
    }

    /// All nodes of this subtree matching `predicate`, in pre-order.
    pub fn all<P>(&self, predicate: P) -> Vec<Node<R>>
    where
        P: FnMut(&Node<R>) -> bool,
    {
        self.all_with(WalkOptions::default(), predicate)
    }

    #[instrument(level = "trace", skip(self, predicate))]
    pub fn all_with<P>(&self, options: WalkOptions, mut predicate: P) -> Vec<Node<R>>
    where
        P: FnMut(&Node<R>) -> bool,
    {
        let mut matches = Vec::new();
        self.walk_with(options, |node| {
            if predicate(node) {
                matches.push(node.clone());
            }
        });
        matches
    }

    /// First node of this subtree matching `predicate`, in pre-order.
    pub fn first<P>(&self, predicate: P) -> Option<Node<R>>
    where
        P: FnMut(&Node<R>) -> bool,
    {
        self.first_with(WalkOptions::default(), predicate)
    }

    #[instrument(level = "trace", skip(self, predicate))]
    pub fn first_with<P>(&self, options: WalkOptions, mut predicate: P) -> Option<Node<R>>
    where
        P: FnMut(&Node<R>) -> bool,
    {
        let mut found = None;
        self.walk_with(options, |node| {
            if predicate(node) {
                found = Some(node.clone());
                false
            } else {
                true
            }
        });
        found
    }

    /// Nodes from the root down to and including this node.
    ///
    /// Starts at the highest ancestor still alive, see [`Node::parent`].
    pub fn get_path(&self) -> Vec<Node<R>> {
        let mut path = vec![self.clone()];
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            path.push(node);
        }
        path.reverse();
        path
    }

    // ------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------

    /// Attach `child` below this node and return it.
    ///
    /// With a comparator the child goes after every existing child that does
    /// not compare greater, otherwise it is appended. A child that already has
    /// a parent is detached from it first.
    #[instrument(level = "debug", skip(self, child))]
    pub fn add_child(&self, child: Node<R>) -> TreeResult<Node<R>> {
        self.ensure_not_ancestor(&child)?;
        child.drop();

        let position = self.insertion_index(&child);
        self.attach(&child, position);
        Ok(child)
    }

    /// Attach `child` at `index` (`0..=len`) below this node and return it.
    #[instrument(level = "debug", skip(self, child))]
    pub fn add_child_at_index(&self, child: Node<R>, index: usize) -> TreeResult<Node<R>> {
        if self.inner.borrow().config.has_comparator() {
            return Err(TreeError::ComparatorConflict);
        }
        self.ensure_not_ancestor(&child)?;

        let len = {
            let inner = self.inner.borrow();
            let already_here = inner.children.iter().any(|c| *c == child);
            inner.children.len() - usize::from(already_here)
        };
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len: len + 1 });
        }

        child.drop();
        self.attach(&child, index);
        Ok(child)
    }

    /// Move this node to `index` among its siblings and return it.
    #[instrument(level = "debug", skip(self))]
    pub fn set_index(&self, index: usize) -> TreeResult<Node<R>> {
        if self.inner.borrow().config.has_comparator() {
            return Err(TreeError::ComparatorConflict);
        }

        let Some(parent) = self.parent() else {
            return if index == 0 {
                Ok(self.clone())
            } else {
                Err(TreeError::IndexOutOfBounds { index, len: 1 })
            };
        };

        let mut inner = parent.inner.borrow_mut();
        let len = inner.children.len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        if let Some(old) = inner.children.iter().position(|c| c == self) {
            let node = inner.children.remove(old);
            inner.children.insert(index, node);
        }
        Ok(self.clone())
    }

    /// Detach this node (and its subtree) from its parent and return it.
    ///
    /// On a root this is a no-op.
    #[allow(clippy::should_implement_trait)]
    pub fn drop(&self) -> Node<R> {
        let parent = self.inner.borrow().parent.upgrade();
        if let Some(parent) = parent {
            parent
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(&c.inner, &self.inner));
            debug!("node detached from parent");
        }
        self.inner.borrow_mut().parent = Weak::new();
        self.clone()
    }

    /// Upper bound of `child` among the current children under the comparator,
    /// the end without one. The comparator sees full models.
    fn insertion_index(&self, child: &Node<R>) -> usize {
        let inner = self.inner.borrow();
        let Some(cmp) = inner.config.comparator() else {
            return inner.children.len();
        };
        let new = child.model();
        let index = inner
            .children
            .partition_point(|existing| cmp(&existing.model(), &new) != Ordering::Greater);
        index
    }

    fn attach(&self, child: &Node<R>, position: usize) {
        child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        let mut inner = self.inner.borrow_mut();
        inner.children.insert(position, child.clone());
        inner.has_children_field = true;
        debug!(position, children = inner.children.len(), "child attached");
    }

    /// Refuse to attach `candidate` below itself or below one of its descendants.
    fn ensure_not_ancestor(&self, candidate: &Node<R>) -> TreeResult<()> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node == *candidate {
                return Err(TreeError::CyclicAttachment);
            }
            current = node.parent();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;
    use serde_json::json;

    fn id(node: &Node) -> i64 {
        node.payload()["id"].as_i64().unwrap()
    }

    fn id_eq(wanted: i64) -> impl Fn(&Node) -> bool {
        move |node| id(node) == wanted
    }

    #[test]
    fn given_child_when_index_queried_then_reports_position_among_siblings() {
        let root = TreeBuilder::new()
            .parse(json!({"id": 1, "children": [{"id": 11}, {"id": 12}]}))
            .unwrap();
        assert_eq!(root.index(), None);
        assert_eq!(root.first(id_eq(12)).unwrap().index(), Some(1));
    }

    #[test]
    fn given_last_child_when_set_index_zero_then_model_order_follows() {
        let root = TreeBuilder::new()
            .parse(json!({"id": 1, "children": [{"id": 11}, {"id": 12}, {"id": 13}]}))
            .unwrap();
        root.first(id_eq(13)).unwrap().set_index(0).unwrap();
        assert_eq!(
            root.model(),
            json!({"id": 1, "children": [{"id": 13}, {"id": 11}, {"id": 12}]})
        );
    }

    #[test]
    fn given_index_past_end_when_set_index_then_fails() {
        let root = TreeBuilder::new()
            .parse(json!({"id": 1, "children": [{"id": 11}]}))
            .unwrap();
        let child = root.first(id_eq(11)).unwrap();
        assert!(matches!(
            child.set_index(1),
            Err(TreeError::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(root.set_index(0).is_ok());
        assert!(root.set_index(1).is_err());
    }

    #[test]
    fn given_comparator_when_positioning_explicitly_then_fails() {
        let builder = TreeBuilder::with_config(
            TreeConfig::new().with_comparator(|a: &serde_json::Value, b: &serde_json::Value| {
                a["id"].as_i64().cmp(&b["id"].as_i64())
            }),
        );
        let root = builder.parse(json!({"id": 1, "children": [{"id": 11}]})).unwrap();
        let extra = builder.parse(json!({"id": 12})).unwrap();
        assert!(matches!(
            root.add_child_at_index(extra, 0),
            Err(TreeError::ComparatorConflict)
        ));
        assert!(matches!(
            root.first(id_eq(11)).unwrap().set_index(0),
            Err(TreeError::ComparatorConflict)
        ));
    }

    #[test]
    fn given_ancestor_when_added_below_descendant_then_fails() {
        let root = TreeBuilder::new()
            .parse(json!({"id": 1, "children": [{"id": 11, "children": [{"id": 111}]}]}))
            .unwrap();
        let leaf = root.first(id_eq(111)).unwrap();
        assert!(matches!(
            leaf.add_child(root.clone()),
            Err(TreeError::CyclicAttachment)
        ));
        assert!(matches!(
            root.add_child(root.clone()),
            Err(TreeError::CyclicAttachment)
        ));
        assert_eq!(root.all(|_| true).len(), 3);
    }

    #[test]
    fn given_handles_when_compared_then_equality_is_identity() {
        let builder = TreeBuilder::new();
        let a = builder.parse(json!({"id": 1})).unwrap();
        let b = builder.parse(json!({"id": 1})).unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn given_comparator_on_child_count_when_adding_then_sees_nested_children() {
        fn child_count(record: &serde_json::Value) -> usize {
            record["children"].as_array().map_or(0, Vec::len)
        }
        let builder = TreeBuilder::with_config(TreeConfig::new().with_comparator(
            |a: &serde_json::Value, b: &serde_json::Value| child_count(a).cmp(&child_count(b)),
        ));
        let root = builder
            .parse(json!({"id": 1, "children": [
                {"id": 11, "children": [{"id": 111}, {"id": 112}]},
                {"id": 12}
            ]}))
            .unwrap();
        root.add_child(builder.parse(json!({"id": 13, "children": [{"id": 131}]})).unwrap())
            .unwrap();

        let ids: Vec<i64> = root.children().iter().map(id).collect();
        assert_eq!(ids, vec![12, 13, 11]);
    }

    #[test]
    fn given_released_root_when_child_queried_then_reports_no_parent() {
        let root = TreeBuilder::new()
            .parse(json!({"id": 1, "children": [{"id": 11, "children": [{"id": 111}]}]}))
            .unwrap();
        let leaf = root.first(id_eq(111)).unwrap();
        assert_eq!(leaf.get_path().len(), 3);

        std::mem::drop(root);
        assert!(leaf.is_root());
        assert_eq!(leaf.get_path().len(), 1);
    }
}
