use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed account record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("account not found: {0}")]
    NotFound(Uuid),
    #[error("account code already in use: {0}")]
    DuplicateCode(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum HierarchyError {
    #[error("account {id} references unknown parent {parent_id}")]
    DanglingParent { id: Uuid, parent_id: Uuid },
    #[error("account {id} is part of a parent cycle")]
    ParentCycle { id: Uuid },
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unknown account: {0}")]
    UnknownAccount(Uuid),
    #[error("account {0} is not a root account")]
    NotARoot(Uuid),
    #[error("could not allocate a free code, last tried {0}")]
    CodeConflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type ChartResult<T> = Result<T, ChartError>;
