use std::collections::HashMap;

use log::{debug, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::HierarchyError;
use crate::model::{Account, AccountNode};

/// What to do with a record whose `parent_id` names no known account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave it out of the forest. Only records without a parent are roots.
    #[default]
    Drop,
    /// Treat it as an additional root.
    PromoteToRoot,
    /// Fail the rebuild.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    DanglingParent,
    /// Parent exists, but the chain never reaches a root: a cycle, or an
    /// ancestor that was itself dropped.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orphan {
    pub id: Uuid,
    pub code: String,
    pub parent_id: Option<Uuid>,
    pub reason: OrphanReason,
}

/// Roots with their nested children, plus every record that did not make it
/// into the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    pub roots: Vec<AccountNode>,
    pub orphans: Vec<Orphan>,
}

impl Forest {
    pub fn len(&self) -> usize {
        self.roots.iter().map(count_nodes).sum()
    }
}

fn count_nodes(node: &AccountNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

/// Links the flat list into a forest. A record is a root iff it has no
/// `parent_id`; records with unresolvable parents are dropped.
pub fn build_hierarchy(accounts: &[Account]) -> Vec<AccountNode> {
    match build_forest(accounts, OrphanPolicy::Drop) {
        Ok(forest) => forest.roots,
        // Drop never rejects
        Err(_) => Vec::new(),
    }
}

pub fn build_forest(accounts: &[Account], policy: OrphanPolicy) -> Result<Forest, HierarchyError> {
    let mut by_id: HashMap<Uuid, usize> = HashMap::with_capacity(accounts.len());
    for (i, account) in accounts.iter().enumerate() {
        by_id.entry(account.id).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); accounts.len()];
    let mut roots = Vec::new();
    let mut orphans = Vec::new();
    let mut dangling = vec![false; accounts.len()];

    for (i, account) in accounts.iter().enumerate() {
        if by_id[&account.id] != i {
            warn!("duplicate account id {} (code {}), keeping the first record", account.id, account.code);
            continue;
        }

        let Some(parent_id) = account.parent_id else {
            roots.push(i);
            continue;
        };

        match by_id.get(&parent_id) {
            Some(&parent) => children[parent].push(i),
            None => {
                if policy == OrphanPolicy::Reject {
                    return Err(HierarchyError::DanglingParent { id: account.id, parent_id });
                }
                warn!("account {} references unknown parent {}", account.code, parent_id);
                dangling[i] = true;
                orphans.push(Orphan {
                    id: account.id,
                    code: account.code.clone(),
                    parent_id: Some(parent_id),
                    reason: OrphanReason::DanglingParent,
                });
                if policy == OrphanPolicy::PromoteToRoot {
                    roots.push(i);
                }
            }
        }
    }

    let mut reached = vec![false; accounts.len()];
    let roots: Vec<AccountNode> = roots
        .into_iter()
        .map(|i| assemble(i, accounts, &children, &mut reached))
        .collect();

    for (i, account) in accounts.iter().enumerate() {
        if reached[i] || dangling[i] || by_id[&account.id] != i {
            continue;
        }
        if policy == OrphanPolicy::Reject {
            return Err(HierarchyError::ParentCycle { id: account.id });
        }
        warn!("account {} is not reachable from any root", account.code);
        orphans.push(Orphan {
            id: account.id,
            code: account.code.clone(),
            parent_id: account.parent_id,
            reason: OrphanReason::Unreachable,
        });
    }

    debug!(
        "rebuilt hierarchy: {} records, {} roots, {} orphans",
        accounts.len(),
        roots.len(),
        orphans.len()
    );
    Ok(Forest { roots, orphans })
}

fn assemble(
    i: usize,
    accounts: &[Account],
    children: &[Vec<usize>],
    reached: &mut [bool],
) -> AccountNode {
    reached[i] = true;
    let mut account = accounts[i].clone();
    account.has_sub_accounts = !children[i].is_empty();

    AccountNode {
        account,
        children: children[i]
            .iter()
            .map(|&child| assemble(child, accounts, children, reached))
            .collect(),
    }
}
