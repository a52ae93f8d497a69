use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Account;
use crate::storage::AccountStore;

pub const FIRST_ROOT_CODE: &str = "1000";
pub const FIRST_CHILD_SUFFIX: &str = "01";
const SUFFIX_LEN: usize = 2;

static NUMERIC_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

fn parse_code(code: &str) -> Option<u128> {
    if !NUMERIC_CODE.is_match(code) {
        return None;
    }
    match code.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("skipping code {code}: {err}");
            None
        }
    }
}

/// One past the largest numeric level-1 code, or `"1000"` when there is none.
pub fn next_root_code(accounts: &[Account]) -> String {
    accounts
        .iter()
        .filter(|account| account.level == 1)
        .filter_map(|account| parse_code(&account.code))
        .max()
        .and_then(|max| max.checked_add(1))
        .map(|next| next.to_string())
        .unwrap_or_else(|| FIRST_ROOT_CODE.to_string())
}

/// Next free two-digit suffix directly below `parent_code`.
///
/// Only codes exactly two characters longer than the parent count, so deeper
/// descendants never influence the result.
pub fn next_child_code(accounts: &[Account], parent_code: &str) -> String {
    let child_len = parent_code.len() + SUFFIX_LEN;

    accounts
        .iter()
        .map(|account| account.code.as_str())
        .filter(|code| code.len() == child_len && *code != parent_code)
        .filter_map(|code| code.strip_prefix(parent_code))
        .filter_map(parse_code)
        .max()
        .and_then(|max| max.checked_add(1))
        .map(|next| format!("{parent_code}{next:0width$}", width = SUFFIX_LEN))
        .unwrap_or_else(|| format!("{parent_code}{FIRST_CHILD_SUFFIX}"))
}

/// Reads the store and computes the next root code. Read failures are logged
/// and yield `"1000"`.
pub fn generate_root_code<S: AccountStore + ?Sized>(store: &S) -> String {
    match store.list_accounts() {
        Ok(accounts) => next_root_code(&accounts),
        Err(err) => {
            error!("could not read accounts for root code generation: {err}");
            FIRST_ROOT_CODE.to_string()
        }
    }
}

/// Reads the store and computes the next child code under `parent_code`.
/// Read failures are logged and yield `parent_code + "01"`.
pub fn generate_child_code<S: AccountStore + ?Sized>(store: &S, parent_code: &str) -> String {
    match store.list_accounts() {
        Ok(accounts) => next_child_code(&accounts, parent_code),
        Err(err) => {
            error!("could not read accounts for child code generation under {parent_code}: {err}");
            format!("{parent_code}{FIRST_CHILD_SUFFIX}")
        }
    }
}
