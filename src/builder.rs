//! Builds linked node trees from nested records.

use std::rc::Rc;

use tracing::{debug, instrument};

use crate::config::{Settings, TreeConfig};
use crate::errors::{TreeError, TreeResult};
use crate::node::Node;
use crate::record::Record;

/// Configured factory turning records into node trees.
///
/// Every node it produces shares the builder's configuration, which
/// `Node::add_child` uses to keep children ordered.
#[derive(Debug)]
pub struct TreeBuilder<R: Record = serde_json::Value> {
    config: Rc<TreeConfig<R>>,
}

impl<R: Record> Default for TreeBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Clone for TreeBuilder<R> {
    fn clone(&self) -> Self {
        Self {
            config: Rc::clone(&self.config),
        }
    }
}

impl<R: Record> TreeBuilder<R> {
    /// Builder with the default children field ("children") and insertion order.
    pub fn new() -> Self {
        Self::with_config(TreeConfig::new())
    }

    pub fn with_config(config: TreeConfig<R>) -> Self {
        Self {
            config: Rc::new(config),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_config(settings.tree_config())
    }

    pub fn config(&self) -> &TreeConfig<R> {
        &self.config
    }

    /// Build a tree from `record` and return its root.
    ///
    /// The record is moved into the tree: children fields are detached onto the
    /// child nodes and, with a comparator, reordered. `Node::model` gives the
    /// record back in its current shape.
    ///
    /// # Errors
    ///
    /// `TreeError::InvalidModel` if the record, or any record nested under the
    /// children field at any depth, is not an object. Nothing is built then.
    #[instrument(level = "debug", skip(self, record))]
    pub fn parse(&self, record: R) -> TreeResult<Node<R>> {
        self.validate(&record)?;

        let field = self.config.children_field_name();
        let mut record = record;
        let children = record.take_children(field);
        let root = Node::new(record, children.is_some(), Rc::clone(&self.config));

        let mut stack = Vec::new();
        if let Some(children) = children {
            stack.push((root.clone(), children));
        }

        let mut count = 1usize;
        while let Some((parent, mut records)) = stack.pop() {
            if let Some(cmp) = self.config.comparator() {
                // whole records, children still attached; stable for equal keys
                records.sort_by(|a, b| cmp(a, b));
            }

            let mut nodes = Vec::with_capacity(records.len());
            for mut record in records {
                let grandchildren = record.take_children(field);
                let node = Node::new(record, grandchildren.is_some(), Rc::clone(&self.config));
                if let Some(grandchildren) = grandchildren {
                    stack.push((node.clone(), grandchildren));
                }
                nodes.push(node);
            }
            count += nodes.len();
            parent.link_children(nodes);
        }

        debug!(nodes = count, "tree parsed");
        Ok(root)
    }

    /// Check the whole record graph before anything gets linked.
    fn validate(&self, record: &R) -> TreeResult<()> {
        let field = self.config.children_field_name();
        let mut stack = vec![record];

        while let Some(current) = stack.pop() {
            if !current.is_record() {
                return Err(TreeError::InvalidModel);
            }
            if let Some(children) = current.children(field) {
                stack.extend(children.iter());
            }
        }
        Ok(())
    }
}
