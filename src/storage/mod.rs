pub mod accounts;
pub mod memory;

pub use accounts::*;
pub use memory::*;

use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{Account, AccountPatch, NewAccount};

/// CRUD seam over the account collection.
///
/// `list_accounts` returns the full collection in insertion order.
pub trait AccountStore {
    fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    fn insert_account(&mut self, account: NewAccount) -> StoreResult<Account>;
    fn update_account(&mut self, id: Uuid, patch: AccountPatch) -> StoreResult<()>;
    fn delete_account(&mut self, id: Uuid) -> StoreResult<()>;
}
