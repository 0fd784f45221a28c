//! Turn nested records into a linked tree of nodes.
//!
//! A [`TreeBuilder`] parses a record whose children live under a configurable
//! field into a [`Node`] tree. Nodes support pre-order, post-order and
//! breadth-first walks with early exit, predicate search, root paths, ordered
//! child insertion and subtree detachment.
//!
//! ```
//! use rstree::{Strategy, TreeBuilder, WalkOptions};
//! use serde_json::json;
//!
//! let root = TreeBuilder::new()
//!     .parse(json!({"id": 1, "children": [{"id": 11}, {"id": 12}]}))
//!     .unwrap();
//!
//! let node = root.first(|n| n.payload()["id"] == 12).unwrap();
//! assert_eq!(node.get_path().len(), 2);
//!
//! let mut ids = Vec::new();
//! root.walk_with(WalkOptions::new(Strategy::Post), |n| {
//!     ids.push(n.payload()["id"].as_i64().unwrap());
//! });
//! assert_eq!(ids, vec![11, 12, 1]);
//! ```

pub mod builder;
pub mod config;
pub mod errors;
pub mod node;
pub mod record;
pub mod traversal;
pub mod util;

pub use builder::TreeBuilder;
pub use crate::config::{Comparator, Settings, SortOrder, SortSettings, TreeConfig};
pub use errors::{TreeError, TreeResult};
pub use node::Node;
pub use record::{Record, SortKey};
pub use traversal::{Strategy, VisitResult, WalkOptions};
