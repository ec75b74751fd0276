use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required fields: {}", fields.join(", "))]
    Validation { fields: Vec<String> },
    #[error("Invalid amount: {input}")]
    InvalidAmount { input: String },
    #[error("Payment reference already used: {reference}")]
    DuplicateReference { reference: String },
    #[error("Record is not persisted yet")]
    NotPersisted { operation: &'static str },
    #[error("Authentication failed")]
    AuthFailure { details: String },
    #[error("Access denied for {email}")]
    AccessDenied { email: String },
    #[error("Store {operation} failed")]
    StoreFailure {
        operation: StoreOperation,
        details: String,
    },
    #[error("Deletion failed")]
    DeletionFailure { details: String },
    #[error("RON {action} error")]
    Ron {
        action: StorageAction,
        path: Option<String>,
        #[source]
        source: ron::Error,
    },
    #[error("Config {action} error")]
    ConfigIo {
        action: StorageAction,
        path: Option<String>,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Search,
    Sequences,
    Upsert,
    InsertPayment,
    LoadPayments,
    DeletePayments,
    DeleteFiche,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Search => f.write_str("search"),
            StoreOperation::Sequences => f.write_str("sequence listing"),
            StoreOperation::Upsert => f.write_str("save"),
            StoreOperation::InsertPayment => f.write_str("payment insert"),
            StoreOperation::LoadPayments => f.write_str("payment load"),
            StoreOperation::DeletePayments => f.write_str("payment delete"),
            StoreOperation::DeleteFiche => f.write_str("record delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAction {
    Load,
    Save,
}

impl fmt::Display for StorageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageAction::Load => f.write_str("load"),
            StorageAction::Save => f.write_str("save"),
        }
    }
}

impl Error {
    /// Short message shown in the UI status lines. Store failures carry the
    /// backend message verbatim; the duplicate-reference and access-denied
    /// cases keep their own wording so staff can tell them apart.
    pub fn user_summary(&self) -> String {
        match self {
            Error::Validation { fields } => {
                format!("Missing required field(s): {}.", fields.join(", "))
            }
            Error::InvalidAmount { input } => {
                format!("Amount must be a positive number, got '{input}'.")
            }
            Error::DuplicateReference { .. } => "Reference already used.".to_string(),
            Error::NotPersisted { operation } => {
                format!("Save the record before {operation}.")
            }
            Error::AuthFailure { details } => {
                format!("Authentication failed: {details}")
            }
            Error::AccessDenied { .. } => "Access denied.".to_string(),
            Error::StoreFailure { details, .. } => details.clone(),
            Error::DeletionFailure { .. } => "Deletion failed.".to_string(),
            Error::Ron { action, .. } => format!("Failed to {action} configuration data."),
            Error::ConfigIo { action, .. } => format!("Failed to {action} configuration file."),
        }
    }

    pub fn technical_detail(&self) -> String {
        match self {
            Error::Validation { fields } => {
                format!("Validation rejected empty fields: {}.", fields.join(", "))
            }
            Error::InvalidAmount { input } => format!("Amount parse failed for '{input}'."),
            Error::DuplicateReference { reference } => {
                format!("Unique constraint rejected payment reference {reference}.")
            }
            Error::NotPersisted { operation } => {
                format!("Refused {operation}: record has no store identifier.")
            }
            Error::AuthFailure { details } => format!("Auth collaborator error: {details}"),
            Error::AccessDenied { email } => {
                format!("Identity {email} is not the authorized deletion account.")
            }
            Error::StoreFailure { operation, details } => {
                format!("Store {operation} error: {details}")
            }
            Error::DeletionFailure { details } => format!("Deletion aborted: {details}"),
            Error::Ron {
                action,
                path,
                source,
            } => {
                let path = path
                    .as_ref()
                    .map(|value| format!(" path={value}."))
                    .unwrap_or_default();
                format!("RON {action} error.{path} {source}")
            }
            Error::ConfigIo {
                action,
                path,
                source,
            } => {
                let path = path
                    .as_ref()
                    .map(|value| format!(" path={value}."))
                    .unwrap_or_default();
                format!("Config {action} error.{path} {source}")
            }
        }
    }
}
