use std::collections::HashSet;

use uuid::Uuid;

use crate::model::AccountNode;

/// Which tree nodes are currently open. View state only.
#[derive(Debug, Default, Clone)]
pub struct ExpandedNodes {
    ids: HashSet<Uuid>,
}

impl ExpandedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, id: Uuid) {
        self.ids.insert(id);
    }

    pub fn collapse(&mut self, id: Uuid) {
        self.ids.remove(&id);
    }

    pub fn toggle(&mut self, id: Uuid) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }
}

/// One line per visible node, indented by depth. `+` marks a closed group,
/// `-` an open one.
pub fn render_tree(forest: &[AccountNode], expanded: &ExpandedNodes) -> Vec<String> {
    let mut lines = Vec::new();
    for root in forest {
        render_node(root, 0, expanded, &mut lines);
    }
    lines
}

fn render_node(node: &AccountNode, depth: usize, expanded: &ExpandedNodes, lines: &mut Vec<String>) {
    let account = &node.account;
    let open = expanded.is_expanded(account.id);
    let marker = match (node.children.is_empty(), open) {
        (true, _) => ' ',
        (false, true) => '-',
        (false, false) => '+',
    };

    lines.push(format!(
        "{}{} {}  {} / {}",
        "  ".repeat(depth),
        marker,
        account.code,
        account.name_ar,
        account.name_en
    ));

    if open {
        for child in &node.children {
            render_node(child, depth + 1, expanded, lines);
        }
    }
}
