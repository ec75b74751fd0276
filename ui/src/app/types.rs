use std::sync::Arc;

use fichedesk_core::{AppConfig, AuthClient, AuthSession, Error, Fiche, SearchOutcome, Store};

use crate::logging::{LogLevel, LogStore, ReloadHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Fiche,
    Debug,
}

/// Which screen the fiche tab shows; the debug tab is reachable from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Workspace,
}

/// Free-text form fields; the plan selectors and the fiche number are
/// handled separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FicheField {
    Name,
    NationalId,
    Employer,
    EmployeeNumber,
    JobTitle,
    Phone,
    Email,
    StreetAddress,
    Neighborhood,
    Municipality,
    ParcelNumber,
    CadastralNumber,
    DeedOfSaleNumber,
}

impl FicheField {
    pub(crate) fn apply(self, fiche: &mut Fiche, value: String) {
        match self {
            FicheField::Name => fiche.name = value,
            FicheField::NationalId => fiche.national_id = value,
            FicheField::Employer => fiche.employer = value,
            FicheField::EmployeeNumber => fiche.employee_number = value,
            FicheField::JobTitle => fiche.job_title = value,
            FicheField::Phone => fiche.phone = value,
            FicheField::Email => fiche.email = value,
            FicheField::StreetAddress => fiche.street_address = value,
            FicheField::Neighborhood => fiche.neighborhood = value,
            FicheField::Municipality => fiche.municipality = value,
            FicheField::ParcelNumber => fiche.parcel_number = value,
            FicheField::CadastralNumber => fiche.cadastral_number = value,
            FicheField::DeedOfSaleNumber => fiche.deed_of_sale_number = value,
        }
    }

    pub(crate) fn get(self, fiche: &Fiche) -> &str {
        match self {
            FicheField::Name => &fiche.name,
            FicheField::NationalId => &fiche.national_id,
            FicheField::Employer => &fiche.employer,
            FicheField::EmployeeNumber => &fiche.employee_number,
            FicheField::JobTitle => &fiche.job_title,
            FicheField::Phone => &fiche.phone,
            FicheField::Email => &fiche.email,
            FicheField::StreetAddress => &fiche.street_address,
            FicheField::Neighborhood => &fiche.neighborhood,
            FicheField::Municipality => &fiche.municipality,
            FicheField::ParcelNumber => &fiche.parcel_number,
            FicheField::CadastralNumber => &fiche.cadastral_number,
            FicheField::DeedOfSaleNumber => &fiche.deed_of_sale_number,
        }
    }
}

/// Cloneable error payload for messages; the full error stays in the logs.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub(crate) summary: String,
    pub(crate) detail: String,
}

impl ErrorInfo {
    pub(crate) fn from_error(error: &Error) -> Self {
        Self {
            summary: error.user_summary(),
            detail: error.technical_detail(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    LogTick,
    LogLevelChanged(LogLevel),
    ToggleTarget(String, bool),
    CopyDiagnostics,
    SelectTab(Tab),
    LoginEmailChanged(String),
    LoginPasswordChanged(String),
    SubmitLogin,
    LoginFinished(Result<AuthSession, ErrorInfo>),
    ActivityDetected,
    InactivityTick,
    Logout,
    SessionClosed,
    SearchQueryChanged(String),
    SubmitSearch,
    SearchFinished(Result<SearchOutcome, ErrorInfo>),
    NewFiche,
    SequenceAssigned(Result<String, ErrorInfo>),
    FieldEdited(FicheField, String),
    SiteSelected(String),
    DimensionSelected(String),
    SaveFiche,
    FicheSaved(Result<Fiche, ErrorInfo>),
    PaymentAmountChanged(String),
    PaymentReferenceChanged(String),
    SubmitPayment,
    PaymentRecorded(Result<(), ErrorInfo>),
    SessionRefreshed(Result<SearchOutcome, ErrorInfo>),
    RequestDelete,
    CancelDelete,
    DeleteEmailChanged(String),
    DeletePasswordChanged(String),
    ConfirmDelete,
    DeleteFinished(Result<(), ErrorInfo>),
    PrintoutPathChanged(String),
    ExportPrintout,
}

pub struct Flags {
    pub log_store: LogStore,
    pub reload_handle: ReloadHandle,
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub auth: Arc<dyn AuthClient>,
}
