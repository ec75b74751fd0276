pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod store;
pub mod targets;
pub mod tarifs;
pub mod workflow;

pub use auth::{AuthClient, AuthConfig, AuthFuture, AuthSession, MockAuthClient, RestAuthClient};
pub use config::{load_config, save_config, AppConfig, DEFAULT_CONFIG_PATH};
pub use error::{Error, StorageAction, StoreOperation};
pub use ledger::{
    format_sequence, next_sequence, pick_candidate, reconcile, BalanceSummary, PickedFiche,
    SEQUENCE_PAD_WIDTH,
};
pub use model::{Fiche, Payment, PaymentDraft, PAYMENT_STATUS_VALIDATED};
pub use store::{MockStore, RestConfig, RestStore, Store, StoreFuture};
pub use tarifs::PlanRates;
pub use workflow::SearchOutcome;
