use uuid::Uuid;
use std::collections::BTreeMap;

use crate::model::Account;

/// Unique index from account code to account id.
#[derive(Debug, Default)]
pub struct CodeIndex {
    tree: BTreeMap<String, Uuid>,
}

impl CodeIndex {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    pub fn from_accounts(accounts: &[Account]) -> Self {
        let mut index = Self::new();
        for account in accounts {
            index.tree.insert(account.code.clone(), account.id);
        }
        index
    }

    /// Returns false and leaves the index untouched if `code` is held by
    /// another account.
    pub fn insert(&mut self, code: &str, id: Uuid) -> bool {
        match self.tree.get(code) {
            Some(owner) if *owner != id => false,
            _ => {
                self.tree.insert(code.to_string(), id);
                true
            }
        }
    }

    pub fn is_free_for(&self, code: &str, id: Uuid) -> bool {
        self.tree.get(code).map_or(true, |owner| *owner == id)
    }

    pub fn remove(&mut self, code: &str) -> Option<Uuid> {
        self.tree.remove(code)
    }
}
