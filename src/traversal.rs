//! Traversal engine behind `Node::walk`, `Node::all` and `Node::first`.
//!
//! All strategies are iterative: depth-first orders use an explicit stack,
//! breadth-first a queue. A node's children are snapshotted when the node is
//! expanded, so callbacks are free to inspect the tree while it is walked.

use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;

use tracing::{instrument, trace};

use crate::errors::TreeError;
use crate::node::Node;
use crate::record::Record;

/// Order in which a walk visits nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Node first, then each child subtree (depth-first pre-order)
    #[default]
    Pre,
    /// Each child subtree first, then the node (depth-first post-order)
    Post,
    /// Level by level, left to right
    Breadth,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::Pre => "pre",
            Strategy::Post => "post",
            Strategy::Breadth => "breadth",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Strategy::Pre),
            "post" => Ok(Strategy::Post),
            "breadth" => Ok(Strategy::Breadth),
            other => Err(TreeError::UnknownStrategy {
                strategy: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    pub strategy: Strategy,
}

impl WalkOptions {
    pub const fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }
}

impl From<Strategy> for WalkOptions {
    fn from(strategy: Strategy) -> Self {
        Self::new(strategy)
    }
}

/// Result of a walk callback.
///
/// Only `false` and `ControlFlow::Break` stop a walk; everything else continues.
pub trait VisitResult {
    fn is_stop(&self) -> bool;
}

impl VisitResult for () {
    fn is_stop(&self) -> bool {
        false
    }
}

impl VisitResult for bool {
    fn is_stop(&self) -> bool {
        !*self
    }
}

impl<B, C> VisitResult for ControlFlow<B, C> {
    fn is_stop(&self) -> bool {
        self.is_break()
    }
}

/// Visit `start` and its subtree in `strategy` order until `callback` stops the walk.
///
/// Returns `true` when the walk ran to completion, `false` when it was stopped.
#[instrument(level = "trace", skip(start, callback))]
pub(crate) fn walk<R, F, V>(start: &Node<R>, strategy: Strategy, callback: &mut F) -> bool
where
    R: Record,
    F: FnMut(&Node<R>) -> V,
    V: VisitResult,
{
    let completed = match strategy {
        Strategy::Pre => pre_order(start, callback),
        Strategy::Post => post_order(start, callback),
        Strategy::Breadth => breadth_first(start, callback),
    };
    if !completed {
        trace!(%strategy, "walk stopped by callback");
    }
    completed
}

fn pre_order<R, F, V>(start: &Node<R>, callback: &mut F) -> bool
where
    R: Record,
    F: FnMut(&Node<R>) -> V,
    V: VisitResult,
{
    let mut stack = vec![start.clone()];

    while let Some(node) = stack.pop() {
        if callback(&node).is_stop() {
            return false;
        }
        // Push children in reverse order for left-to-right traversal
        stack.extend(node.children().into_iter().rev());
    }
    true
}

fn post_order<R, F, V>(start: &Node<R>, callback: &mut F) -> bool
where
    R: Record,
    F: FnMut(&Node<R>) -> V,
    V: VisitResult,
{
    let mut stack = vec![(start.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            if callback(&node).is_stop() {
                return false;
            }
        } else {
            let children = node.children();
            stack.push((node, true));
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
    }
    true
}

fn breadth_first<R, F, V>(start: &Node<R>, callback: &mut F) -> bool
where
    R: Record,
    F: FnMut(&Node<R>) -> V,
    V: VisitResult,
{
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(node) = queue.pop_front() {
        if callback(&node).is_stop() {
            return false;
        }
        queue.extend(node.children());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_strategy_names_when_parsed_then_known_names_resolve() {
        assert_eq!("pre".parse::<Strategy>().unwrap(), Strategy::Pre);
        assert_eq!("post".parse::<Strategy>().unwrap(), Strategy::Post);
        assert_eq!("breadth".parse::<Strategy>().unwrap(), Strategy::Breadth);
    }

    #[test]
    fn given_unknown_strategy_when_parsed_then_error_lists_valid_strategies() {
        let err = "unknownStrategy".parse::<Strategy>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown tree walk strategy 'unknownStrategy'. Valid strategies are 'pre' [default], 'post' and 'breadth'."
        );
    }

    #[test]
    fn given_visit_results_when_checked_then_only_false_and_break_stop() {
        assert!(!().is_stop());
        assert!(!true.is_stop());
        assert!(false.is_stop());
        assert!(ControlFlow::<()>::Break(()).is_stop());
        assert!(!ControlFlow::<(), ()>::Continue(()).is_stop());
    }

    #[test]
    fn given_strategy_when_displayed_then_round_trips_through_from_str() {
        for strategy in [Strategy::Pre, Strategy::Post, Strategy::Breadth] {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!(WalkOptions::default().strategy, Strategy::Pre);
    }
}
