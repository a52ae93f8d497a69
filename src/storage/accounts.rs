use std::{fs::{self, OpenOptions}, io::{BufRead, BufReader, BufWriter, Write}};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::{from_str, to_string};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::index::CodeIndex;
use crate::model::{Account, AccountPatch, NewAccount};
use crate::storage::AccountStore;

/// Account collection kept as one JSON object per line, in insertion order.
#[derive(Debug)]
pub struct JsonlAccountStore {
    path: PathBuf,
    code_index: CodeIndex,
}

impl JsonlAccountStore {
    /// Opens the collection at `path`, creating an empty file if needed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        OpenOptions::new().append(true).create(true).open(&path)?;

        let accounts = load_accounts(&path)?;
        let code_index = CodeIndex::from_accounts(&accounts);
        debug!("opened {} with {} accounts", path.display(), accounts.len());

        Ok(Self { path, code_index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccountStore for JsonlAccountStore {
    fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        load_accounts(&self.path)
    }

    fn insert_account(&mut self, account: NewAccount) -> StoreResult<Account> {
        // another writer may have appended since we opened
        self.code_index = CodeIndex::from_accounts(&load_accounts(&self.path)?);

        let account = account.with_id(Uuid::new_v4());
        if !self.code_index.insert(&account.code, account.id) {
            return Err(StoreError::DuplicateCode(account.code));
        }

        if let Err(err) = write_account(&account, &self.path) {
            self.code_index.remove(&account.code);
            return Err(err);
        }
        info!("stored account {} ({})", account.code, account.id);
        Ok(account)
    }

    fn update_account(&mut self, id: Uuid, patch: AccountPatch) -> StoreResult<()> {
        let mut accounts = load_accounts(&self.path)?;
        self.code_index = CodeIndex::from_accounts(&accounts);
        let account = accounts
            .iter_mut()
            .find(|account| account.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let old_code = account.code.clone();
        if let Some(code) = &patch.code {
            if !self.code_index.is_free_for(code, id) {
                return Err(StoreError::DuplicateCode(code.clone()));
            }
        }
        patch.apply(account);
        let new_code = account.code.clone();

        rewrite_accounts(&accounts, &self.path)?;
        if new_code != old_code {
            self.code_index.remove(&old_code);
            self.code_index.insert(&new_code, id);
        }
        Ok(())
    }

    fn delete_account(&mut self, id: Uuid) -> StoreResult<()> {
        let mut accounts = load_accounts(&self.path)?;
        let position = accounts
            .iter()
            .position(|account| account.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let removed = accounts.remove(position);
        rewrite_accounts(&accounts, &self.path)?;
        self.code_index.remove(&removed.code);
        info!("deleted account {} ({})", removed.code, removed.id);
        Ok(())
    }
}

pub fn write_account(account: &Account, path: &Path) -> StoreResult<()> {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;

    let mut writer = BufWriter::new(file);

    let json = to_string(account)?;
    writeln!(writer, "{}", json)?;
    writer.flush()?;
    Ok(())
}

/// Replaces the whole collection through a sibling temp file and a rename.
pub fn rewrite_accounts(accounts: &[Account], path: &Path) -> StoreResult<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    {
        let file = fs::File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for account in accounts {
            writeln!(writer, "{}", to_string(account)?)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn load_accounts(path: &Path) -> StoreResult<Vec<Account>> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)?;

    let reader = BufReader::new(file);

    reader.lines().filter_map(|line| {
        match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(from_str::<Account>(&line).map_err(StoreError::from)),
            Err(err) => Some(Err(StoreError::from(err))),
        }
    }).collect()
}
