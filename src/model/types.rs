use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

/// Side of the ledger on which the account normally carries its balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountNature {
    #[default]
    Debit,
    Credit,
}

/// A persisted chart-of-accounts record.
///
/// `classification` is the root ancestor's `name_ar`, copied onto the record
/// when it is created and refreshed by
/// [`ChartOfAccounts::reclassify_subtree`](crate::chart::ChartOfAccounts::reclassify_subtree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub code: String,
    pub name_ar: String,
    pub name_en: String,
    pub classification: String,
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub has_sub_accounts: bool,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub nature: AccountNature,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// An account record before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub code: String,
    pub name_ar: String,
    pub name_en: String,
    pub classification: String,
    pub level: u32,
    pub parent_id: Option<Uuid>,
    pub status: AccountStatus,
    pub is_closed: bool,
    pub cost_center: Option<String>,
    pub balance: f64,
    pub nature: AccountNature,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn with_id(self, id: Uuid) -> Account {
        Account {
            id,
            code: self.code,
            name_ar: self.name_ar,
            name_en: self.name_en,
            classification: self.classification,
            level: self.level,
            parent_id: self.parent_id,
            has_sub_accounts: false,
            status: self.status,
            is_closed: self.is_closed,
            cost_center: self.cost_center,
            balance: self.balance,
            nature: self.nature,
            created_at: self.created_at,
        }
    }
}

/// What the user fills in on the add-account form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountDraft {
    pub name_ar: String,
    pub name_en: String,
    pub status: AccountStatus,
    pub is_closed: bool,
    pub cost_center: Option<String>,
    pub balance: f64,
    pub nature: AccountNature,
}

impl AccountDraft {
    pub fn new(name_ar: impl Into<String>, name_en: impl Into<String>) -> Self {
        Self {
            name_ar: name_ar.into(),
            name_en: name_en.into(),
            ..Self::default()
        }
    }
}

/// Partial update: `Some` replaces the stored field, `None` leaves it alone.
///
/// `cost_center` is doubly optional so a patch can clear it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    pub code: Option<String>,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub classification: Option<String>,
    pub has_sub_accounts: Option<bool>,
    pub status: Option<AccountStatus>,
    pub is_closed: Option<bool>,
    pub cost_center: Option<Option<String>>,
    pub balance: Option<f64>,
    pub nature: Option<AccountNature>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, account: &mut Account) {
        if let Some(code) = &self.code {
            account.code = code.clone();
        }
        if let Some(name_ar) = &self.name_ar {
            account.name_ar = name_ar.clone();
        }
        if let Some(name_en) = &self.name_en {
            account.name_en = name_en.clone();
        }
        if let Some(classification) = &self.classification {
            account.classification = classification.clone();
        }
        if let Some(has_sub_accounts) = self.has_sub_accounts {
            account.has_sub_accounts = has_sub_accounts;
        }
        if let Some(status) = self.status {
            account.status = status;
        }
        if let Some(is_closed) = self.is_closed {
            account.is_closed = is_closed;
        }
        if let Some(cost_center) = &self.cost_center {
            account.cost_center = cost_center.clone();
        }
        if let Some(balance) = self.balance {
            account.balance = balance;
        }
        if let Some(nature) = self.nature {
            account.nature = nature;
        }
    }
}

/// An account together with its direct children, as linked by the hierarchy
/// builder. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountNode {
    pub account: Account,
    pub children: Vec<AccountNode>,
}

impl AccountNode {
    /// Pre-order walk: the node itself, then each child subtree in order.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a AccountNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}
