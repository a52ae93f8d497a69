use std::collections::HashMap;

use uuid::Uuid;

use crate::model::{Account, AccountNode};

/// Every node of the forest in pre-order.
pub fn flatten(forest: &[AccountNode]) -> Vec<&AccountNode> {
    let mut out = Vec::new();
    for root in forest {
        root.walk(&mut out);
    }
    out
}

/// Walks parent links up to the top-level ancestor.
///
/// Returns `account` itself when it is level 1 or has no parent, and stops at
/// the last node reached when a parent cannot be found in the forest.
pub fn resolve_root(account: &Account, forest: &[AccountNode]) -> Account {
    FlatIndex::new(forest).resolve_root(account).clone()
}

/// Id lookup over a flattened forest, built once per rebuild.
#[derive(Debug)]
pub struct FlatIndex<'a> {
    nodes: Vec<&'a AccountNode>,
    by_id: HashMap<Uuid, usize>,
}

impl<'a> FlatIndex<'a> {
    pub fn new(forest: &'a [AccountNode]) -> Self {
        let nodes = flatten(forest);
        let mut by_id = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            by_id.entry(node.account.id).or_insert(i);
        }
        Self { nodes, by_id }
    }

    pub fn get(&self, id: Uuid) -> Option<&'a AccountNode> {
        self.by_id.get(&id).map(|&i| self.nodes[i])
    }

    pub fn resolve_root<'b>(&self, account: &'b Account) -> &'b Account
    where
        'a: 'b,
    {
        let mut current = account;
        // a forest is acyclic, the bound only guards foreign input
        for _ in 0..=self.nodes.len() {
            if current.level == 1 {
                return current;
            }
            let Some(parent_id) = current.parent_id else {
                return current;
            };
            match self.get(parent_id) {
                Some(parent) => current = &parent.account,
                None => return current,
            }
        }
        current
    }

    /// The subtree rooted at `id`, pre-order, including the node itself.
    pub fn subtree(&self, id: Uuid) -> Vec<&'a AccountNode> {
        let mut out = Vec::new();
        if let Some(node) = self.get(id) {
            node.walk(&mut out);
        }
        out
    }
}
