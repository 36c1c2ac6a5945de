//! Wildcard-capable addresses into the content tree.
//!
//! A key path is a list of segments. A segment is a literal name, `*`
//! (exactly one level) or `**` (zero or more levels). Matching walks the
//! content tree depth first with a cursor into the segment list.
//!
//! Synthetic containers (the composition root and the wrapper around a shape
//! layer's contents) are invisible to key paths: they always match and never
//! advance the cursor.

use crate::error::{LottieError, Result};
use std::fmt;

pub const WILDCARD: &str = "*";
pub const GLOBSTAR: &str = "**";

/// Stable identifier of a content node inside one composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub(crate) u32);

impl ContentId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a tree node presents itself to the matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeName<'a> {
    Named(&'a str),
    Container,
}

/// A node that key paths can walk through.
pub trait KeyPathElement {
    fn key_path_name(&self) -> NodeName<'_>;

    fn content_id(&self) -> ContentId;

    fn key_path_children(&self) -> Vec<&dyn KeyPathElement>;
}

#[derive(Clone, Debug, Default)]
pub struct KeyPath {
    keys: Vec<String>,
    resolved: Option<ContentId>,
}

impl PartialEq for KeyPath {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for KeyPath {}

impl KeyPath {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath {
            keys: keys.into_iter().map(Into::into).collect(),
            resolved: None,
        }
    }

    /// Parses a `.`-separated path such as `**.Fill 1`.
    pub fn parse(path: &str) -> Result<Self> {
        let keys: Vec<&str> = path
            .split('.')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(LottieError::EmptyKeyPath);
        }
        Ok(KeyPath::new(keys))
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Copy with `key` appended and no resolved target.
    pub fn add_key(&self, key: &str) -> KeyPath {
        let mut keys = self.keys.clone();
        keys.push(key.to_string());
        KeyPath {
            keys,
            resolved: None,
        }
    }

    /// Attaches the node this path resolved to, replacing any earlier one.
    pub fn resolve(mut self, target: ContentId) -> KeyPath {
        self.resolved = Some(target);
        self
    }

    pub fn resolved_target(&self) -> Option<ContentId> {
        self.resolved
    }

    fn ends_with_globstar(&self) -> bool {
        self.keys.last().is_some_and(|k| k == GLOBSTAR)
    }

    fn is_last(&self, depth: usize) -> bool {
        depth + 1 == self.keys.len()
    }

    pub fn matches(&self, node: NodeName<'_>, depth: usize) -> bool {
        let NodeName::Named(name) = node else {
            return true;
        };
        match self.keys.get(depth) {
            Some(key) => key == name || key == WILDCARD || key == GLOBSTAR,
            None => false,
        }
    }

    /// How far the cursor advances after `node` matched at `depth`.
    pub fn increment_depth_by(&self, node: NodeName<'_>, depth: usize) -> usize {
        let NodeName::Named(name) = node else {
            return 0;
        };
        match self.keys.get(depth) {
            Some(key) if key != GLOBSTAR => 1,
            Some(_) if self.is_last(depth) => 0,
            Some(_) if self.keys.get(depth + 1).is_some_and(|next| next == name) => 2,
            _ => 0,
        }
    }

    /// Whether the path terminates at `node` rather than at a descendant.
    pub fn fully_resolves_to(&self, node: NodeName<'_>, depth: usize) -> bool {
        let NodeName::Named(name) = node else {
            return false;
        };
        let len = self.keys.len();
        if depth >= len {
            return false;
        }
        let is_last = self.is_last(depth);
        let key = &self.keys[depth];

        if key != GLOBSTAR {
            let matches = key == name || key == WILDCARD;
            let terminates = is_last || (depth + 2 == len && self.ends_with_globstar());
            return matches && terminates;
        }

        let next_matches = self.keys.get(depth + 1).is_some_and(|next| next == name);
        if next_matches {
            return depth + 2 == len || (depth + 3 == len && self.ends_with_globstar());
        }
        if is_last {
            return true;
        }
        if depth + 1 < len - 1 {
            return false;
        }
        self.keys[depth + 1] == name
    }

    pub fn propagate_to_children(&self, node: NodeName<'_>, depth: usize) -> bool {
        if node == NodeName::Container {
            return true;
        }
        depth + 1 < self.keys.len() || self.keys.get(depth).is_some_and(|k| k == GLOBSTAR)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys.join("."))?;
        if let Some(target) = self.resolved {
            write!(f, " -> {target}")?;
        }
        Ok(())
    }
}

/// Depth-first resolution of `search` below `element`.
///
/// Every node the search fully resolves to is pushed onto `acc` as a
/// literal path with its target attached.
pub fn resolve_key_path(
    element: &dyn KeyPathElement,
    search: &KeyPath,
    depth: usize,
    current: &KeyPath,
    acc: &mut Vec<KeyPath>,
) {
    let name = element.key_path_name();
    if !search.matches(name, depth) {
        return;
    }

    let mut current = current.clone();
    if let NodeName::Named(literal) = name {
        current = current.add_key(literal);
        if search.fully_resolves_to(name, depth) {
            acc.push(current.clone().resolve(element.content_id()));
        }
    }

    if search.propagate_to_children(name, depth) {
        let next_depth = depth + search.increment_depth_by(name, depth);
        for child in element.key_path_children() {
            resolve_key_path(child, search, next_depth, &current, acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        id: u32,
        name: Option<&'static str>,
        children: Vec<Node>,
    }

    impl Node {
        fn named(id: u32, name: &'static str, children: Vec<Node>) -> Self {
            Node {
                id,
                name: Some(name),
                children,
            }
        }

        fn container(id: u32, children: Vec<Node>) -> Self {
            Node {
                id,
                name: None,
                children,
            }
        }
    }

    impl KeyPathElement for Node {
        fn key_path_name(&self) -> NodeName<'_> {
            self.name.map_or(NodeName::Container, NodeName::Named)
        }

        fn content_id(&self) -> ContentId {
            ContentId(self.id)
        }

        fn key_path_children(&self) -> Vec<&dyn KeyPathElement> {
            self.children.iter().map(|c| c as &dyn KeyPathElement).collect()
        }
    }

    fn hand(id: u32, name: &'static str) -> Node {
        Node::named(id, name, vec![Node::named(id + 1, "Fill", vec![])])
    }

    fn character() -> Node {
        Node::container(
            0,
            vec![Node::named(
                1,
                "Anything",
                vec![Node::container(
                    2,
                    vec![Node::named(
                        3,
                        "Body",
                        vec![hand(10, "Left Hand"), hand(20, "Right Hand")],
                    )],
                )],
            )],
        )
    }

    fn resolve(path: &KeyPath) -> Vec<KeyPath> {
        let mut acc = Vec::new();
        resolve_key_path(&character(), path, 0, &KeyPath::default(), &mut acc);
        acc
    }

    #[test]
    fn test_literal_path_matches_each_depth() {
        let path = KeyPath::new(["*", "Body", "Left Hand", "Fill"]);
        assert!(path.matches(NodeName::Named("Anything"), 0));
        assert!(path.matches(NodeName::Named("Body"), 1));
        assert!(path.matches(NodeName::Named("Left Hand"), 2));
        assert!(path.matches(NodeName::Named("Fill"), 3));
        assert!(!path.matches(NodeName::Named("Right Hand"), 2));
    }

    #[test]
    fn test_globstar_resolves_fill_at_any_depth() {
        let path = KeyPath::new(["**", "Fill"]);
        assert!(path.fully_resolves_to(NodeName::Named("Fill"), 0));
        assert!(!path.fully_resolves_to(NodeName::Named("Body"), 0));
        for name in ["Anything", "Body", "Left Hand"] {
            assert!(path.propagate_to_children(NodeName::Named(name), 0));
            assert_eq!(path.increment_depth_by(NodeName::Named(name), 0), 0);
        }
        assert_eq!(path.increment_depth_by(NodeName::Named("Fill"), 0), 2);

        let found = resolve(&path);
        let targets: Vec<_> = found.iter().filter_map(|p| p.resolved_target()).collect();
        assert_eq!(targets, vec![ContentId(11), ContentId(21)]);
        assert_eq!(
            found[0].keys(),
            &["Anything", "Body", "Left Hand", "Fill"].map(String::from)
        );
    }

    #[test]
    fn test_containers_are_transparent() {
        let path = KeyPath::new(["Anything", "Body"]);
        assert!(path.matches(NodeName::Container, 7));
        assert_eq!(path.increment_depth_by(NodeName::Container, 0), 0);
        assert!(path.propagate_to_children(NodeName::Container, 5));

        let found = resolve(&path);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].resolved_target(), Some(ContentId(3)));
    }

    #[test]
    fn test_wildcard_path_resolves_single_target() {
        let found = resolve(&KeyPath::new(["*", "Body", "Left Hand", "Fill"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].resolved_target(), Some(ContentId(11)));
        assert_eq!(found[0].to_string(), "Anything.Body.Left Hand.Fill -> #11");
    }

    #[test]
    fn test_trailing_globstar_resolves_node_and_descendants() {
        let found = resolve(&KeyPath::new(["Anything", "Body", "**"]));
        let targets: Vec<_> = found.iter().filter_map(|p| p.resolved_target()).collect();
        assert!(targets.contains(&ContentId(3)));
        assert!(targets.contains(&ContentId(10)));
        assert!(targets.contains(&ContentId(11)));
    }

    #[test]
    fn test_resolution_replaces_previous_target() {
        let path = KeyPath::new(["Body"]).resolve(ContentId(1)).resolve(ContentId(2));
        assert_eq!(path.resolved_target(), Some(ContentId(2)));
        assert_eq!(path, KeyPath::new(["Body"]));
    }

    #[test]
    fn test_parse() {
        let path = KeyPath::parse("**.Left Hand.Fill").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.keys()[1], "Left Hand");
        assert!(matches!(KeyPath::parse(" . "), Err(LottieError::EmptyKeyPath)));
    }

    #[test]
    fn test_no_match_past_end() {
        let path = KeyPath::new(["Body"]);
        assert!(!path.matches(NodeName::Named("Body"), 1));
        assert!(!path.fully_resolves_to(NodeName::Named("Body"), 1));
        assert!(!path.propagate_to_children(NodeName::Named("Body"), 0));
    }
}
