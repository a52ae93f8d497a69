use std::collections::HashSet;

use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::codegen::{generate_child_code, generate_root_code};
use crate::config::ChartConfig;
use crate::error::{ChartError, ChartResult, StoreError};
use crate::hierarchy::{build_forest, FlatIndex, Forest, Orphan, OrphanPolicy};
use crate::model::{Account, AccountDraft, AccountNode, AccountPatch, NewAccount};
use crate::storage::AccountStore;

/// The chart of accounts: a store plus the forest rebuilt from it after
/// every write.
#[derive(Debug)]
pub struct ChartOfAccounts<S: AccountStore> {
    store: S,
    orphan_policy: OrphanPolicy,
    code_retry_limit: u32,
    accounts: Vec<Account>,
    forest: Forest,
}

impl<S: AccountStore> ChartOfAccounts<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            orphan_policy: OrphanPolicy::default(),
            code_retry_limit: 3,
            accounts: Vec::new(),
            forest: Forest::default(),
        }
    }

    pub fn from_config(store: S, config: &ChartConfig) -> Self {
        Self {
            orphan_policy: config.orphan_policy,
            code_retry_limit: config.code_retry_limit,
            ..Self::new(store)
        }
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    /// Re-reads the whole collection and rebuilds the forest from scratch.
    ///
    /// `has_sub_accounts` is recomputed on the flat records too, and written
    /// back to the store where the stored flag disagrees.
    pub fn load(&mut self) -> ChartResult<()> {
        let mut accounts = self.store.list_accounts()?;
        let forest = build_forest(&accounts, self.orphan_policy)?;
        debug!(
            "loaded {} accounts, {} reachable from {} roots",
            accounts.len(),
            forest.len(),
            forest.roots.len()
        );

        let parents: HashSet<Uuid> = accounts
            .iter()
            .filter_map(|account| account.parent_id.filter(|parent| *parent != account.id))
            .collect();
        for account in &mut accounts {
            let has_sub_accounts = parents.contains(&account.id);
            if account.has_sub_accounts == has_sub_accounts {
                continue;
            }
            account.has_sub_accounts = has_sub_accounts;
            let patch = AccountPatch {
                has_sub_accounts: Some(has_sub_accounts),
                ..AccountPatch::default()
            };
            if let Err(err) = self.store.update_account(account.id, patch) {
                warn!("could not store hasSubAccounts for {}: {err}", account.code);
            }
        }

        self.accounts = accounts;
        self.forest = forest;
        Ok(())
    }

    /// Reload after a committed write. The write stands even if the rebuild
    /// fails, so the failure is only logged.
    fn refresh(&mut self) {
        if let Err(err) = self.load() {
            warn!("change stored, but rebuilding the chart failed: {err}");
        }
    }

    pub fn forest(&self) -> &[AccountNode] {
        &self.forest.roots
    }

    pub fn orphans(&self) -> &[Orphan] {
        &self.forest.orphans
    }

    /// The flat collection as last loaded, in store order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.code == code)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The top-level ancestor of `id` within the current forest.
    pub fn root_of(&self, id: Uuid) -> ChartResult<Account> {
        let account = self.account(id).ok_or(ChartError::UnknownAccount(id))?;
        Ok(FlatIndex::new(&self.forest.roots).resolve_root(account).clone())
    }

    pub fn add_root(&mut self, draft: AccountDraft) -> ChartResult<Account> {
        let draft = validate_draft(draft)?;

        let account = self.insert_with_retry(
            |store| generate_root_code(store),
            |code| new_account(&draft, code, 1, None, draft.name_ar.clone()),
        )?;
        info!("created root account {} {}", account.code, account.name_ar);

        self.refresh();
        Ok(account)
    }

    /// Creates a child directly under `selected_id`. The code extends the
    /// selected account's own code.
    pub fn add_child(&mut self, selected_id: Uuid, draft: AccountDraft) -> ChartResult<Account> {
        let draft = validate_draft(draft)?;

        let selected = self
            .account(selected_id)
            .cloned()
            .ok_or(ChartError::UnknownAccount(selected_id))?;
        let classification = FlatIndex::new(&self.forest.roots)
            .resolve_root(&selected)
            .name_ar
            .clone();

        let account = self.insert_with_retry(
            |store| generate_child_code(store, &selected.code),
            |code| {
                new_account(
                    &draft,
                    code,
                    selected.level + 1,
                    Some(selected.id),
                    classification.clone(),
                )
            },
        )?;
        info!(
            "created account {} {} under {}",
            account.code, account.name_ar, selected.code
        );

        self.refresh();
        Ok(account)
    }

    /// Replaces the given fields. Renaming a root also refreshes the
    /// classification of its whole subtree.
    pub fn edit(&mut self, id: Uuid, mut patch: AccountPatch) -> ChartResult<()> {
        let current = self
            .account(id)
            .cloned()
            .ok_or(ChartError::UnknownAccount(id))?;

        for (field, value) in [("nameAr", &mut patch.name_ar), ("nameEn", &mut patch.name_en)] {
            if let Some(name) = value {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(ChartError::Validation(format!("{field} must not be empty")));
                }
                *name = trimmed.to_string();
            }
        }

        let renamed_root = current.is_root()
            && patch
                .name_ar
                .as_ref()
                .is_some_and(|name| *name != current.name_ar);
        if renamed_root {
            patch.classification = patch.name_ar.clone();
        }

        if patch.is_empty() {
            return Ok(());
        }
        self.store.update_account(id, patch)?;
        info!("updated account {}", current.code);

        self.load()?;
        if renamed_root {
            self.reclassify_subtree(id)?;
        }
        Ok(())
    }

    /// Deletes one record. Its children are left pointing at the removed id.
    pub fn delete(&mut self, id: Uuid) -> ChartResult<()> {
        let current = self
            .account(id)
            .cloned()
            .ok_or(ChartError::UnknownAccount(id))?;

        self.store.delete_account(id)?;
        if self.accounts.iter().any(|a| a.parent_id == Some(id)) {
            warn!("deleted account {} still has children, they are now orphaned", current.code);
        } else {
            info!("deleted account {}", current.code);
        }

        self.refresh();
        Ok(())
    }

    /// Rewrites the stored classification of every account under `root_id`
    /// to the root's current `name_ar`. Returns how many records changed.
    pub fn reclassify_subtree(&mut self, root_id: Uuid) -> ChartResult<usize> {
        let root = self
            .account(root_id)
            .cloned()
            .ok_or(ChartError::UnknownAccount(root_id))?;
        if !root.is_root() {
            return Err(ChartError::NotARoot(root_id));
        }

        let stale: Vec<Uuid> = FlatIndex::new(&self.forest.roots)
            .subtree(root_id)
            .iter()
            .filter(|node| node.account.classification != root.name_ar)
            .map(|node| node.account.id)
            .collect();

        for id in &stale {
            let patch = AccountPatch {
                classification: Some(root.name_ar.clone()),
                ..AccountPatch::default()
            };
            if let Err(err) = self.store.update_account(*id, patch) {
                // earlier records in the pass are already rewritten
                self.refresh();
                return Err(err.into());
            }
        }

        if !stale.is_empty() {
            info!("reclassified {} accounts under {}", stale.len(), root.code);
            self.load()?;
        }
        Ok(stale.len())
    }

    fn insert_with_retry(
        &mut self,
        generate: impl Fn(&S) -> String,
        build: impl Fn(String) -> NewAccount,
    ) -> ChartResult<Account> {
        let mut last_code = String::new();
        for attempt in 1..=self.code_retry_limit.max(1) {
            let code = generate(&self.store);
            match self.store.insert_account(build(code)) {
                Ok(account) => return Ok(account),
                Err(StoreError::DuplicateCode(code)) => {
                    warn!("code {code} taken on attempt {attempt}, regenerating");
                    last_code = code;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ChartError::CodeConflict(last_code))
    }
}

fn validate_draft(mut draft: AccountDraft) -> ChartResult<AccountDraft> {
    draft.name_ar = draft.name_ar.trim().to_string();
    draft.name_en = draft.name_en.trim().to_string();

    if draft.name_ar.is_empty() {
        return Err(ChartError::Validation("nameAr is required".into()));
    }
    if draft.name_en.is_empty() {
        return Err(ChartError::Validation("nameEn is required".into()));
    }
    Ok(draft)
}

fn new_account(
    draft: &AccountDraft,
    code: String,
    level: u32,
    parent_id: Option<Uuid>,
    classification: String,
) -> NewAccount {
    NewAccount {
        code,
        name_ar: draft.name_ar.clone(),
        name_en: draft.name_en.clone(),
        classification,
        level,
        parent_id,
        status: draft.status,
        is_closed: draft.is_closed,
        cost_center: draft.cost_center.clone(),
        balance: draft.balance,
        nature: draft.nature,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreResult;
    use crate::model::{AccountNature, AccountStatus};
    use crate::storage::MemoryAccountStore;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;

    fn chart() -> ChartOfAccounts<MemoryAccountStore> {
        ChartOfAccounts::new(MemoryAccountStore::new())
    }

    #[test]
    fn scenario_children_under_first_root() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        assert_eq!(assets.code, "1000");
        assert_eq!(assets.classification, "الأصول");
        assert_eq!(assets.level, 1);

        let first = chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();
        let second = chart.add_child(assets.id, AccountDraft::new("البنوك", "Banks")).unwrap();

        assert_eq!(first.code, "100001");
        assert_eq!(first.level, 2);
        assert_eq!(first.parent_id, Some(assets.id));
        assert_eq!(first.classification, "الأصول");
        assert_eq!(second.code, "100002");

        let root = &chart.forest()[0];
        assert!(root.account.has_sub_accounts);
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn classification_is_inherited_three_levels_down() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        let current = chart
            .add_child(assets.id, AccountDraft::new("الأصول المتداولة", "Current assets"))
            .unwrap();
        let cash = chart.add_child(current.id, AccountDraft::new("النقدية", "Cash")).unwrap();
        let drawer = chart.add_child(cash.id, AccountDraft::new("الصندوق", "Cash drawer")).unwrap();

        assert_eq!(drawer.classification, "الأصول");
        assert_eq!(drawer.level, 4);
        assert_eq!(drawer.code, "1000010101");
        assert_eq!(chart.root_of(drawer.id).unwrap().id, assets.id);
    }

    #[test]
    fn roots_get_sequential_codes() {
        let mut chart = chart();
        let codes: Vec<String> = ["الأصول", "الخصوم", "حقوق الملكية"]
            .into_iter()
            .map(|name| chart.add_root(AccountDraft::new(name, "x")).unwrap().code)
            .collect();
        assert_eq!(codes, vec!["1000", "1001", "1002"]);
    }

    #[test]
    fn blank_names_are_rejected_before_the_store() {
        let mut chart = chart();
        let err = chart.add_root(AccountDraft::new("  ", "Assets")).unwrap_err();
        assert!(matches!(err, ChartError::Validation(_)));
        let err = chart.add_root(AccountDraft::new("الأصول", "")).unwrap_err();
        assert!(matches!(err, ChartError::Validation(_)));
        assert!(chart.store().list_accounts().unwrap().is_empty());
    }

    #[test]
    fn draft_fields_are_carried_over() {
        let mut chart = chart();
        let draft = AccountDraft {
            status: AccountStatus::Inactive,
            is_closed: true,
            cost_center: Some("الفرع الرئيسي".into()),
            balance: 1250.5,
            nature: AccountNature::Credit,
            ..AccountDraft::new(" الخصوم ", "Liabilities")
        };
        let account = chart.add_root(draft).unwrap();

        assert_eq!(account.name_ar, "الخصوم");
        assert_eq!(account.status, AccountStatus::Inactive);
        assert!(account.is_closed);
        assert_eq!(account.cost_center.as_deref(), Some("الفرع الرئيسي"));
        assert_eq!(account.balance, 1250.5);
        assert_eq!(account.nature, AccountNature::Credit);
    }

    #[test]
    fn unknown_selection_is_an_error() {
        let mut chart = chart();
        let err = chart.add_child(Uuid::new_v4(), AccountDraft::new("أ", "a")).unwrap_err();
        assert!(matches!(err, ChartError::UnknownAccount(_)));
    }

    #[test]
    fn renaming_a_root_reclassifies_its_subtree() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        let cash = chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();
        let drawer = chart.add_child(cash.id, AccountDraft::new("الصندوق", "Drawer")).unwrap();
        let other = chart.add_root(AccountDraft::new("الخصوم", "Liabilities")).unwrap();

        chart
            .edit(
                assets.id,
                AccountPatch {
                    name_ar: Some("الموجودات".into()),
                    ..AccountPatch::default()
                },
            )
            .unwrap();

        for id in [assets.id, cash.id, drawer.id] {
            assert_eq!(chart.account(id).unwrap().classification, "الموجودات");
        }
        assert_eq!(chart.account(other.id).unwrap().classification, "الخصوم");
    }

    #[test]
    fn reclassify_requires_a_root() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        let cash = chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();

        assert!(matches!(chart.reclassify_subtree(cash.id), Err(ChartError::NotARoot(_))));
        assert_eq!(chart.reclassify_subtree(assets.id).unwrap(), 0);
    }

    #[test]
    fn deleting_a_parent_orphans_its_children() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        let cash = chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();

        chart.delete(assets.id).unwrap();

        assert!(chart.forest().is_empty());
        assert_eq!(chart.orphans().len(), 1);
        assert_eq!(chart.orphans()[0].id, cash.id);
        assert!(chart.account(cash.id).is_some());
    }

    #[test]
    fn reject_policy_surfaces_dangling_parents_on_load() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();
        chart.delete(assets.id).unwrap();

        let mut strict = ChartOfAccounts::new(chart.into_store()).with_orphan_policy(OrphanPolicy::Reject);
        assert!(matches!(strict.load(), Err(ChartError::Hierarchy(_))));
    }

    /// Hides every account from reads so the generator keeps proposing "1000".
    struct BlindStore(MemoryAccountStore);

    impl AccountStore for BlindStore {
        fn list_accounts(&self) -> StoreResult<Vec<Account>> {
            Ok(Vec::new())
        }

        fn insert_account(&mut self, account: NewAccount) -> StoreResult<Account> {
            self.0.insert_account(account)
        }

        fn update_account(&mut self, id: Uuid, patch: AccountPatch) -> StoreResult<()> {
            self.0.update_account(id, patch)
        }

        fn delete_account(&mut self, id: Uuid) -> StoreResult<()> {
            self.0.delete_account(id)
        }
    }

    #[test]
    fn persistent_code_conflicts_give_up_after_retries() {
        let mut chart = ChartOfAccounts::new(BlindStore(MemoryAccountStore::new()));
        chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();

        let err = chart.add_root(AccountDraft::new("الخصوم", "Liabilities")).unwrap_err();
        assert!(matches!(err, ChartError::CodeConflict(code) if code == "1000"));
    }

    #[test]
    fn flat_records_carry_the_rebuilt_sub_account_flag() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        let cash = chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();

        assert!(chart.account(assets.id).unwrap().has_sub_accounts);
        assert!(!chart.account(cash.id).unwrap().has_sub_accounts);
        let stored = chart.store().list_accounts().unwrap();
        assert!(stored.iter().find(|a| a.id == assets.id).unwrap().has_sub_accounts);

        chart.delete(cash.id).unwrap();
        assert!(!chart.account(assets.id).unwrap().has_sub_accounts);
        assert!(!chart.store().list_accounts().unwrap()[0].has_sub_accounts);
    }

    fn stray_account() -> Account {
        NewAccount {
            code: "900001".into(),
            name_ar: "ضائع".into(),
            name_en: "Stray".into(),
            classification: "شبح".into(),
            level: 2,
            parent_id: Some(Uuid::new_v4()),
            status: AccountStatus::Active,
            is_closed: false,
            cost_center: None,
            balance: 0.0,
            nature: AccountNature::Debit,
            created_at: Utc::now(),
        }
        .with_id(Uuid::new_v4())
    }

    #[test]
    fn stored_account_is_returned_even_when_rebuild_fails() {
        let store = MemoryAccountStore::with_accounts(vec![stray_account()]);
        let mut chart = ChartOfAccounts::new(store).with_orphan_policy(OrphanPolicy::Reject);

        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        assert_eq!(assets.code, "1000");
        assert_eq!(chart.store().list_accounts().unwrap().len(), 2);
        assert!(matches!(chart.load(), Err(ChartError::Hierarchy(_))));
    }

    #[test]
    fn edit_rejects_blank_names_without_writing() {
        let mut chart = chart();
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();

        for patch in [
            AccountPatch {
                name_ar: Some("   ".into()),
                ..AccountPatch::default()
            },
            AccountPatch {
                name_en: Some(String::new()),
                balance: Some(10.0),
                ..AccountPatch::default()
            },
        ] {
            let err = chart.edit(assets.id, patch).unwrap_err();
            assert!(matches!(err, ChartError::Validation(_)));
        }

        let stored = &chart.store().list_accounts().unwrap()[0];
        assert_eq!(stored.name_ar, "الأصول");
        assert_eq!(stored.name_en, "Assets");
        assert_eq!(stored.balance, 0.0);
    }

    /// Fails updates once the shared budget runs out.
    struct FlakyStore {
        inner: MemoryAccountStore,
        updates_left: Rc<Cell<Option<usize>>>,
    }

    impl AccountStore for FlakyStore {
        fn list_accounts(&self) -> StoreResult<Vec<Account>> {
            self.inner.list_accounts()
        }

        fn insert_account(&mut self, account: NewAccount) -> StoreResult<Account> {
            self.inner.insert_account(account)
        }

        fn update_account(&mut self, id: Uuid, patch: AccountPatch) -> StoreResult<()> {
            if let Some(left) = self.updates_left.get() {
                if left == 0 {
                    return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "write failed")));
                }
                self.updates_left.set(Some(left - 1));
            }
            self.inner.update_account(id, patch)
        }

        fn delete_account(&mut self, id: Uuid) -> StoreResult<()> {
            self.inner.delete_account(id)
        }
    }

    #[test]
    fn partial_reclassify_leaves_cache_matching_the_store() {
        let updates_left = Rc::new(Cell::new(None));
        let mut chart = ChartOfAccounts::new(FlakyStore {
            inner: MemoryAccountStore::new(),
            updates_left: Rc::clone(&updates_left),
        });
        let assets = chart.add_root(AccountDraft::new("الأصول", "Assets")).unwrap();
        let cash = chart.add_child(assets.id, AccountDraft::new("النقدية", "Cash")).unwrap();
        let banks = chart.add_child(assets.id, AccountDraft::new("البنوك", "Banks")).unwrap();

        // the rename itself and the first descendant go through
        updates_left.set(Some(2));
        let err = chart.edit(
            assets.id,
            AccountPatch {
                name_ar: Some("الموجودات".into()),
                ..AccountPatch::default()
            },
        );
        assert!(matches!(err, Err(ChartError::Store(StoreError::Io(_)))));

        let stored = chart.store().list_accounts().unwrap();
        for id in [assets.id, cash.id, banks.id] {
            let cached = chart.account(id).unwrap();
            let on_disk = stored.iter().find(|a| a.id == id).unwrap();
            assert_eq!(cached.classification, on_disk.classification);
        }
        assert_eq!(chart.account(cash.id).unwrap().classification, "الموجودات");
        assert_eq!(chart.account(banks.id).unwrap().classification, "الأصول");
    }
}
