//! Directory tree rendering.

use std::collections::HashMap;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_INDENT: &str = "│   ";
const BLANK_INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TreeNode {
    Leaf,
    Directory(HashMap<String, TreeNode>),
}

/// Nested directory structure built from `/`-separated paths.
///
/// Children are kept unordered and sorted by name at render time, so the
/// output does not depend on insertion order.
#[derive(Debug, Clone, Default)]
pub struct DirectoryTree {
    root: HashMap<String, TreeNode>,
}

impl DirectoryTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a sequence of paths.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    /// Inserts a file path.
    ///
    /// Intermediate segments always become directories, replacing a leaf of
    /// the same name. The final segment becomes a leaf.
    pub fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').collect();
        insert_segments(&mut self.root, &segments);
    }

    /// Returns true if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Renders the tree with box-drawing connectors under `root_label`.
    #[must_use]
    pub fn render(&self, root_label: &str) -> String {
        let mut lines = vec![root_label.to_string()];
        render_level(&self.root, "", &mut lines);
        lines.join("\n")
    }
}

fn insert_segments(level: &mut HashMap<String, TreeNode>, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        level.insert((*first).to_string(), TreeNode::Leaf);
        return;
    }

    let node = level.entry((*first).to_string()).or_insert(TreeNode::Leaf);
    match node {
        TreeNode::Directory(children) => insert_segments(children, rest),
        TreeNode::Leaf => {
            let mut children = HashMap::new();
            insert_segments(&mut children, rest);
            *node = TreeNode::Directory(children);
        }
    }
}

fn render_level(level: &HashMap<String, TreeNode>, prefix: &str, lines: &mut Vec<String>) {
    let mut names: Vec<&String> = level.keys().collect();
    names.sort();

    let count = names.len();
    for (idx, name) in names.into_iter().enumerate() {
        let is_last = idx + 1 == count;
        let connector = if is_last { LAST_BRANCH } else { BRANCH };

        match &level[name] {
            TreeNode::Leaf => lines.push(format!("{prefix}{connector}{name}")),
            TreeNode::Directory(children) => {
                lines.push(format!("{prefix}{connector}{name}/"));
                let indent = if is_last { BLANK_INDENT } else { PIPE_INDENT };
                render_level(children, &format!("{prefix}{indent}"), lines);
            }
        }
    }
}

/// Renders the tree for a set of paths in one step.
#[must_use]
pub fn build_tree<S: AsRef<str>>(paths: &[S], root_label: &str) -> String {
    DirectoryTree::from_paths(paths).render(root_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tree() {
        let tree = build_tree(&["README.md", "src/index.js"], "test-project");

        assert_eq!(tree, "test-project\n├── README.md\n└── src/\n    └── index.js");
    }

    #[test]
    fn test_nested_guides() {
        let tree = build_tree(
            &["src/lib/a.rs", "src/main.rs", "tests/it.rs", "Cargo.toml"],
            "demo",
        );

        let expected = "\
demo
├── Cargo.toml
├── src/
│   ├── lib/
│   │   └── a.rs
│   └── main.rs
└── tests/
    └── it.rs";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_independent_of_input_order() {
        let forward = build_tree(&["a/b.txt", "a/c.txt", "d.txt"], "p");
        let reverse = build_tree(&["d.txt", "a/c.txt", "a/b.txt"], "p");

        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_leaf_promoted_to_directory() {
        let tree = build_tree(&["docs", "docs/intro.md"], "p");

        assert_eq!(tree, "p\n└── docs/\n    └── intro.md");
    }

    #[test]
    fn test_final_segment_replaces_then_promotes() {
        let mut tree = DirectoryTree::new();
        tree.insert("lib/a.rs");
        tree.insert("lib");
        tree.insert("lib/b.rs");
        tree.insert("lib/b.rs/inner.rs");

        assert_eq!(
            tree.render("p"),
            "p\n└── lib/\n    └── b.rs/\n        └── inner.rs"
        );
    }

    #[test]
    fn test_empty_tree_is_root_label() {
        let tree = DirectoryTree::new();

        assert!(tree.is_empty());
        assert_eq!(tree.render("empty"), "empty");
    }

    #[test]
    fn test_sorting_is_bytewise() {
        let tree = build_tree(&["b.txt", "B.txt", "a.txt"], "p");

        assert_eq!(tree, "p\n├── B.txt\n├── a.txt\n└── b.txt");
    }
}
