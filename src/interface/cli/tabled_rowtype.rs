use tabled::Tabled;

use crate::model::{Account, AccountNature, AccountStatus};

#[derive(Tabled)]
pub struct AccountRow {
    pub code: String,
    #[tabled(rename = "name (ar)")]
    pub name_ar: String,
    #[tabled(rename = "name (en)")]
    pub name_en: String,
    pub classification: String,
    pub level: u32,
    pub status: String,
    pub nature: String,
    pub balance: f64,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        let status = match (account.status, account.is_closed) {
            (_, true) => "closed",
            (AccountStatus::Active, false) => "active",
            (AccountStatus::Inactive, false) => "inactive",
        };
        let nature = match account.nature {
            AccountNature::Debit => "debit",
            AccountNature::Credit => "credit",
        };

        Self {
            code: account.code.clone(),
            name_ar: account.name_ar.clone(),
            name_en: account.name_en.clone(),
            classification: account.classification.clone(),
            level: account.level,
            status: status.to_string(),
            nature: nature.to_string(),
            balance: account.balance,
        }
    }
}
