//! Arena-backed trie of key sequences
//!
//! Nodes live in a flat vector and refer to their children by index, so the
//! whole tree is dropped (or cleared) in one go with its owner.

use std::collections::HashMap;

use super::action_map::{ActionId, ActionMap, FocusId, Slot};
use super::types::Keystroke;

/// Index of a node in the trie arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Default, Clone)]
struct Node {
    children: HashMap<Keystroke, NodeId>,
    /// Present exactly when a complete sequence ends here
    actions: Option<ActionMap>,
    /// Present when a cancel sequence ends here; the inner value is the
    /// optional action to run after cancelling
    cancel: Option<Option<ActionId>>,
}

/// Tree of keystrokes; every node with children is a valid prefix
#[derive(Debug, Clone)]
pub struct KeySequenceTrie {
    nodes: Vec<Node>,
}

impl KeySequenceTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// Drop every node except an empty root
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::default());
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Child reached from `node` by `keystroke`
    pub fn child(&self, node: NodeId, keystroke: Keystroke) -> Option<NodeId> {
        self.node(node).children.get(&keystroke).copied()
    }

    /// True when `node` is a prefix of a longer sequence
    pub fn has_children(&self, node: NodeId) -> bool {
        !self.node(node).children.is_empty()
    }

    pub fn action_map(&self, node: NodeId) -> Option<&ActionMap> {
        self.node(node).actions.as_ref()
    }

    /// Action a complete binding at `node` routes to for this focus
    pub fn select(&self, node: NodeId, focus: Option<&FocusId>) -> Option<ActionId> {
        self.action_map(node).and_then(|map| map.select(focus))
    }

    /// `Some(action)` when a cancel sequence ends at `node`
    pub fn cancel(&self, node: NodeId) -> Option<Option<ActionId>> {
        self.node(node).cancel
    }

    /// Walk from `from`, creating missing nodes, and return the last node
    fn walk_or_create(&mut self, from: NodeId, keystrokes: &[Keystroke]) -> NodeId {
        let mut current = from;
        for &stroke in keystrokes {
            current = match self.child(current, stroke) {
                Some(next) => next,
                None => {
                    let next = NodeId(self.nodes.len() as u32);
                    self.nodes.push(Node::default());
                    self.node_mut(current).children.insert(stroke, next);
                    next
                }
            };
        }
        current
    }

    /// Bind a sequence for a focus target (`None` binds the default slot)
    ///
    /// On conflict with a different real action, the existing action is
    /// returned and the trie is left without the new binding.
    pub fn insert(
        &mut self,
        keystrokes: &[Keystroke],
        target: Option<&FocusId>,
        slot: Slot,
    ) -> Result<NodeId, ActionId> {
        let leaf = self.walk_or_create(NodeId::ROOT, keystrokes);
        self.node_mut(leaf)
            .actions
            .get_or_insert_with(ActionMap::new)
            .insert(target, slot)?;
        Ok(leaf)
    }

    /// Attach a cancel sequence to the root and to every prefix node
    ///
    /// Only nodes that exist when this is called receive the binding, which
    /// is why cancel keys are installed after every other binding.
    pub fn install_cancel(&mut self, keystrokes: &[Keystroke], action: Option<ActionId>) {
        let levels: Vec<NodeId> = (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|&id| id == NodeId::ROOT || self.has_children(id))
            .collect();

        for level in levels {
            let leaf = self.walk_or_create(level, keystrokes);
            self.node_mut(leaf).cancel = Some(action);
        }
    }

    /// Depth-first listing of every complete binding with its keystrokes
    pub fn bindings(&self) -> Vec<(Vec<Keystroke>, &ActionMap)> {
        let mut out = Vec::new();
        let mut stack = vec![(NodeId::ROOT, Vec::new())];
        while let Some((id, path)) = stack.pop() {
            let node = self.node(id);
            if let Some(map) = node.actions.as_ref() {
                if !path.is_empty() {
                    out.push((path.clone(), map));
                }
            }
            let mut children: Vec<_> = node.children.iter().collect();
            children.sort_by(|a, b| b.0.cmp(a.0));
            for (stroke, child) in children {
                let mut next = path.clone();
                next.push(*stroke);
                stack.push((*child, next));
            }
        }
        out
    }
}

impl Default for KeySequenceTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::parse::parse_key_sequence;

    fn keys(text: &str) -> Vec<Keystroke> {
        parse_key_sequence(text).unwrap().to_vec()
    }

    const SAVE: ActionId = ActionId(1);
    const PREFIX: ActionId = ActionId(2);
    const QUIT: ActionId = ActionId(3);

    #[test]
    fn test_insert_creates_prefix_nodes() {
        let mut trie = KeySequenceTrie::new();
        let leaf = trie.insert(&keys("C-x C-s"), None, Slot::Action(SAVE)).unwrap();

        let cx = trie.child(NodeId::ROOT, keys("C-x")[0]).unwrap();
        assert!(trie.has_children(cx));
        assert!(trie.action_map(cx).is_none());
        assert_eq!(trie.child(cx, keys("C-s")[0]), Some(leaf));
        assert_eq!(trie.select(leaf, None), Some(SAVE));
    }

    #[test]
    fn test_binding_that_is_also_a_prefix() {
        let mut trie = KeySequenceTrie::new();
        trie.insert(&keys("C-x"), None, Slot::Action(PREFIX)).unwrap();
        trie.insert(&keys("C-x C-s"), None, Slot::Action(SAVE)).unwrap();

        let cx = trie.child(NodeId::ROOT, keys("C-x")[0]).unwrap();
        assert!(trie.has_children(cx));
        assert_eq!(trie.select(cx, None), Some(PREFIX));
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut trie = KeySequenceTrie::new();
        trie.insert(&keys("C-x C-s"), None, Slot::Action(SAVE)).unwrap();
        assert_eq!(
            trie.insert(&keys("C-x C-s"), None, Slot::Action(QUIT)),
            Err(SAVE)
        );
    }

    #[test]
    fn test_cancel_reaches_every_prefix_level() {
        let mut trie = KeySequenceTrie::new();
        trie.insert(&keys("C-x C-s"), None, Slot::Action(SAVE)).unwrap();
        trie.insert(&keys("C-c C-x C-q"), None, Slot::Action(QUIT)).unwrap();
        trie.install_cancel(&keys("C-g"), None);

        let cg = keys("C-g")[0];
        let cx = trie.child(NodeId::ROOT, keys("C-x")[0]).unwrap();
        let cc = trie.child(NodeId::ROOT, keys("C-c")[0]).unwrap();
        let ccx = trie.child(cc, keys("C-x")[0]).unwrap();

        for level in [NodeId::ROOT, cx, cc, ccx] {
            let leaf = trie.child(level, cg).expect("cancel key at every level");
            assert_eq!(trie.cancel(leaf), Some(None));
        }

        // Complete bindings don't turn into prefixes
        let save = trie.child(cx, keys("C-s")[0]).unwrap();
        assert!(!trie.has_children(save));
    }

    #[test]
    fn test_clear_resets_to_root() {
        let mut trie = KeySequenceTrie::new();
        trie.insert(&keys("C-x C-s"), None, Slot::Action(SAVE)).unwrap();
        assert!(!trie.is_empty());
        trie.clear();
        assert!(trie.is_empty());
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_bindings_listing() {
        let mut trie = KeySequenceTrie::new();
        trie.insert(&keys("C-x C-s"), None, Slot::Action(SAVE)).unwrap();
        trie.insert(&keys("C-q"), None, Slot::Action(QUIT)).unwrap();
        let listed = trie.bindings();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|(k, _)| *k == keys("C-x C-s")));
        assert!(listed.iter().any(|(k, _)| *k == keys("C-q")));
    }
}
