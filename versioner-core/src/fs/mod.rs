//! File system primitives: exclusion matching, tree walking and copying.

pub mod copy;
pub mod matcher;
pub mod walker;

pub use copy::{copy_selected_folders, copy_tree, copy_tree_filtered, CopyStats};
pub use matcher::PathMatcher;
pub use walker::{calculate_total_size, walk_tree, TreeEntry};
