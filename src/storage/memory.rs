use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::index::CodeIndex;
use crate::model::{Account, AccountPatch, NewAccount};
use crate::storage::AccountStore;

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Vec<Account>,
    code_index: CodeIndex,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with already-identified records, e.g. fixtures.
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        let code_index = CodeIndex::from_accounts(&accounts);
        Self { accounts, code_index }
    }
}

impl AccountStore for MemoryAccountStore {
    fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.accounts.clone())
    }

    fn insert_account(&mut self, account: NewAccount) -> StoreResult<Account> {
        let account = account.with_id(Uuid::new_v4());
        if !self.code_index.insert(&account.code, account.id) {
            return Err(StoreError::DuplicateCode(account.code));
        }
        self.accounts.push(account.clone());
        Ok(account)
    }

    fn update_account(&mut self, id: Uuid, patch: AccountPatch) -> StoreResult<()> {
        let account = self
            .accounts
            .iter_mut()
            .find(|account| account.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(code) = &patch.code {
            if !self.code_index.is_free_for(code, id) {
                return Err(StoreError::DuplicateCode(code.clone()));
            }
            self.code_index.remove(&account.code);
            self.code_index.insert(code, id);
        }
        patch.apply(account);
        Ok(())
    }

    fn delete_account(&mut self, id: Uuid) -> StoreResult<()> {
        let position = self
            .accounts
            .iter()
            .position(|account| account.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = self.accounts.remove(position);
        self.code_index.remove(&removed.code);
        Ok(())
    }
}
