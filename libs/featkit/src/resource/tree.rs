use std::collections::BTreeMap;

use super::Resource;
use crate::error::{AssemblyError, AssemblyResult};

/// A node of the nested resource projection.
#[derive(Debug, Clone)]
pub enum Node {
    Branch(BTreeMap<String, Node>),
    Leaf(Resource),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&Resource> {
        match self {
            Node::Leaf(r) => Some(r),
            Node::Branch(_) => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Branch(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }
}

/// Trie over dotted keys: `"a.b.c"` lives at `{a:{b:{c: value}}}`.
///
/// A node never changes kind once created and a leaf is never replaced.
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
    roots: BTreeMap<String, Node>,
}

impl ResourceTree {
    pub fn roots(&self) -> &BTreeMap<String, Node> {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.');
        let mut node = self.roots.get(segments.next()?)?;
        for seg in segments {
            node = node.children()?.get(seg)?;
        }
        Some(node)
    }

    pub fn leaf(&self, path: &str) -> Option<&Resource> {
        self.get(path).and_then(Node::as_leaf)
    }

    /// Inserts `value` at `key`. Nothing is modified when the insertion is
    /// rejected.
    pub(crate) fn insert(
        &mut self,
        key: &str,
        value: Resource,
        feature: &str,
    ) -> AssemblyResult<()> {
        self.check_insert(key, feature)?;

        let segments: Vec<&str> = key.split('.').collect();
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| AssemblyError::InvalidKey {
                key: key.to_string(),
                reason: "key is empty".into(),
            })?;

        let mut level = &mut self.roots;
        for seg in parents {
            let node = level
                .entry((*seg).to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            let Node::Branch(children) = node else {
                return Err(AssemblyError::PathConflict {
                    key: key.to_string(),
                    segment: (*seg).to_string(),
                    feature: feature.to_string(),
                    reason: "an existing resource cannot become a namespace branch",
                });
            };
            level = children;
        }
        level.insert((*last).to_string(), Node::Leaf(value));
        Ok(())
    }

    fn check_insert(&self, key: &str, feature: &str) -> AssemblyResult<()> {
        let conflict = |upto: usize, reason: &'static str| AssemblyError::PathConflict {
            key: key.to_string(),
            segment: key.split('.').take(upto + 1).collect::<Vec<_>>().join("."),
            feature: feature.to_string(),
            reason,
        };

        let segments: Vec<&str> = key.split('.').collect();
        let last_idx = segments.len() - 1;
        let mut level = &self.roots;

        for (i, seg) in segments.iter().enumerate() {
            match (level.get(*seg), i == last_idx) {
                (None, _) => break,
                (Some(Node::Leaf(_)), false) => {
                    return Err(conflict(i, "an existing resource cannot become a namespace branch"))
                }
                (Some(Node::Leaf(_)), true) => {
                    return Err(conflict(i, "an existing resource cannot be overwritten"))
                }
                (Some(Node::Branch(_)), true) => {
                    return Err(conflict(
                        i,
                        "an existing namespace branch cannot be redefined as a resource",
                    ))
                }
                (Some(Node::Branch(next)), false) => level = next,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn dotted_keys_become_nested_branches() {
        let mut t = ResourceTree::default();
        t.insert("a.b.c", Resource::new(7u8), "f").unwrap();
        let a = t.roots().get("a").unwrap().children().unwrap();
        let b = a.get("b").unwrap().children().unwrap();
        assert_eq!(b.get("c").unwrap().as_leaf().unwrap().downcast_ref::<u8>(), Some(&7));
        assert_eq!(t.leaf("a.b.c").unwrap().downcast_ref::<u8>(), Some(&7));
        assert!(t.leaf("a.b").is_none());
    }

    #[test]
    fn leaf_cannot_become_branch() {
        let mut t = ResourceTree::default();
        t.insert("a.b", Resource::new(1u8), "one").unwrap();
        let err = t.insert("a.b.c", Resource::new(2u8), "two").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        match err {
            AssemblyError::PathConflict { segment, feature, .. } => {
                assert_eq!(segment, "a.b");
                assert_eq!(feature, "two");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn branch_cannot_become_leaf() {
        let mut t = ResourceTree::default();
        t.insert("a.b.c", Resource::new(1u8), "one").unwrap();
        let err = t.insert("a.b", Resource::new(2u8), "two").unwrap_err();
        match err {
            AssemblyError::PathConflict { segment, .. } => assert_eq!(segment, "a.b"),
            other => panic!("unexpected error: {other:?}"),
        }
        // rejected insert leaves the tree untouched
        assert!(t.get("a.b").unwrap().children().is_some());
    }

    #[test]
    fn siblings_share_branches() {
        let mut t = ResourceTree::default();
        t.insert("a.x", Resource::new(1u8), "f").unwrap();
        t.insert("a.y", Resource::new(2u8), "g").unwrap();
        assert_eq!(t.get("a").unwrap().children().unwrap().len(), 2);
    }
}
