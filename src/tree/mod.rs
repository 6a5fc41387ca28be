//! Hierarchy Tree
//!
//! Flat build maps, the merge rule between fetch rounds, and the pure
//! assembly step that turns them into the nested `NodeTree` forest.

pub mod assembler;
pub mod context;
pub mod merge;
pub mod node;

pub use assembler::assemble;
pub use context::{BuildContext, ChildList};
pub use merge::{merge, merge_forest};
pub use node::{expansion_set, find, preorder_ids, Children, NodeTree};
