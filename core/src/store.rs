use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, StoreOperation};
use crate::model::{Fiche, Payment, PaymentDraft};
use crate::targets;

/// Postgres unique-violation code; the store reports a duplicate payment
/// reference with it and the UI must show a dedicated message for that case.
const UNIQUE_VIOLATION_CODE: &str = "23505";

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Persistent store collaborator: two hosted record collections
/// (subscribers and payments). Implementations must keep search as a single
/// OR-combined filter and report duplicate payment references distinctly.
pub trait Store: Send + Sync {
    fn search_fiches(&self, query: String) -> StoreFuture<'_, Vec<Fiche>>;
    fn sequence_numbers(&self) -> StoreFuture<'_, Vec<String>>;
    /// Upsert keyed by the fiche number: full replacement, last write wins,
    /// returns the store's canonical copy (with the assigned identifier).
    fn upsert_fiche(&self, fiche: Fiche) -> StoreFuture<'_, Fiche>;
    fn delete_fiche_by_id(&self, id: i64) -> StoreFuture<'_, ()>;
    fn insert_payment(&self, draft: PaymentDraft) -> StoreFuture<'_, ()>;
    /// Ledger for one fiche number, newest first.
    fn payments_for(&self, sequence: String) -> StoreFuture<'_, Vec<Payment>>;
    fn delete_payments_for(&self, sequence: String) -> StoreFuture<'_, ()>;
    /// Installs (or clears) the session's bearer token for subsequent calls.
    fn set_access_token(&self, token: Option<String>);
}

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// PostgREST client for the hosted backend. Requests carry the project API
/// key plus the signed-in user's bearer token once a session exists.
#[derive(Debug)]
pub struct RestStore {
    config: RestConfig,
    http: reqwest::Client,
    access_token: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SequenceRow {
    num_fiche: String,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            access_token: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/rest/v1/{collection}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn bearer(&self) -> String {
        self.access_token
            .lock()
            .ok()
            .and_then(|token| token.clone())
            .unwrap_or_else(|| self.config.api_key.clone())
    }

    fn prepare(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
            .timeout(self.config.timeout)
    }

    async fn check(
        operation: StoreOperation,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(store_error(operation, status, &body))
    }

    async fn search(&self, query: String) -> Result<Vec<Fiche>, Error> {
        let operation = StoreOperation::Search;
        let filter = format!(
            "(num_fiche.eq.{query},noms.ilike.*{query}*,num_parcelle.eq.{query},telephone.eq.{query},email.eq.{query})"
        );

        debug!(target: targets::STORE, query = %query, "Searching subscribers");
        let response = self
            .prepare(self.http.get(self.collection_url("souscripteurs")))
            .query(&[("select", "*"), ("or", filter.as_str())])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;
        let response = Self::check(operation, response).await?;

        let fiches: Vec<Fiche> = response
            .json()
            .await
            .map_err(|error| transport_error(operation, error))?;
        debug!(target: targets::STORE, matches = fiches.len(), "Search done");
        Ok(fiches)
    }

    async fn sequences(&self) -> Result<Vec<String>, Error> {
        let operation = StoreOperation::Sequences;
        let response = self
            .prepare(self.http.get(self.collection_url("souscripteurs")))
            .query(&[("select", "num_fiche")])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;
        let response = Self::check(operation, response).await?;

        let rows: Vec<SequenceRow> = response
            .json()
            .await
            .map_err(|error| transport_error(operation, error))?;
        Ok(rows.into_iter().map(|row| row.num_fiche).collect())
    }

    async fn upsert(&self, fiche: Fiche) -> Result<Fiche, Error> {
        let operation = StoreOperation::Upsert;
        debug!(target: targets::STORE, sequence = %fiche.sequence, "Upserting fiche");

        let response = self
            .prepare(self.http.post(self.collection_url("souscripteurs")))
            .query(&[("on_conflict", "num_fiche")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[&fiche])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;
        let response = Self::check(operation, response).await?;

        let mut saved: Vec<Fiche> = response
            .json()
            .await
            .map_err(|error| transport_error(operation, error))?;
        saved.pop().ok_or_else(|| Error::StoreFailure {
            operation,
            details: "Store returned no record for the upsert.".to_string(),
        })
    }

    async fn delete_fiche(&self, id: i64) -> Result<(), Error> {
        let operation = StoreOperation::DeleteFiche;
        let filter = format!("eq.{id}");
        let response = self
            .prepare(self.http.delete(self.collection_url("souscripteurs")))
            .query(&[("id", filter.as_str())])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;
        Self::check(operation, response).await?;
        Ok(())
    }

    async fn insert(&self, draft: PaymentDraft) -> Result<(), Error> {
        let operation = StoreOperation::InsertPayment;
        debug!(
            target: targets::STORE,
            sequence = %draft.sequence,
            reference = %draft.reference,
            "Inserting payment"
        );

        let response = self
            .prepare(self.http.post(self.collection_url("paiements")))
            .header("Prefer", "return=minimal")
            .json(&[&draft])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if let Ok(parsed) = serde_json::from_str::<StoreErrorBody>(&body) {
            if parsed.code.as_deref() == Some(UNIQUE_VIOLATION_CODE) {
                return Err(Error::DuplicateReference {
                    reference: draft.reference,
                });
            }
        }
        Err(store_error(operation, status, &body))
    }

    async fn payments(&self, sequence: String) -> Result<Vec<Payment>, Error> {
        let operation = StoreOperation::LoadPayments;
        let filter = format!("eq.{sequence}");
        let response = self
            .prepare(self.http.get(self.collection_url("paiements")))
            .query(&[
                ("select", "*"),
                ("num_fiche", filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;
        let response = Self::check(operation, response).await?;

        response
            .json()
            .await
            .map_err(|error| transport_error(operation, error))
    }

    async fn delete_payments(&self, sequence: String) -> Result<(), Error> {
        let operation = StoreOperation::DeletePayments;
        let filter = format!("eq.{sequence}");
        let response = self
            .prepare(self.http.delete(self.collection_url("paiements")))
            .query(&[("num_fiche", filter.as_str())])
            .send()
            .await
            .map_err(|error| transport_error(operation, error))?;
        Self::check(operation, response).await?;
        Ok(())
    }
}

impl Store for RestStore {
    fn search_fiches(&self, query: String) -> StoreFuture<'_, Vec<Fiche>> {
        Box::pin(self.search(query))
    }

    fn sequence_numbers(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(self.sequences())
    }

    fn upsert_fiche(&self, fiche: Fiche) -> StoreFuture<'_, Fiche> {
        Box::pin(self.upsert(fiche))
    }

    fn delete_fiche_by_id(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(self.delete_fiche(id))
    }

    fn insert_payment(&self, draft: PaymentDraft) -> StoreFuture<'_, ()> {
        Box::pin(self.insert(draft))
    }

    fn payments_for(&self, sequence: String) -> StoreFuture<'_, Vec<Payment>> {
        Box::pin(self.payments(sequence))
    }

    fn delete_payments_for(&self, sequence: String) -> StoreFuture<'_, ()> {
        Box::pin(self.delete_payments(sequence))
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.lock() {
            *guard = token;
        }
    }
}

fn transport_error(operation: StoreOperation, error: impl std::fmt::Display) -> Error {
    warn!(target: targets::STORE, operation = %operation, error = %error, "Store request failed");
    Error::StoreFailure {
        operation,
        details: error.to_string(),
    }
}

fn store_error(operation: StoreOperation, status: reqwest::StatusCode, body: &str) -> Error {
    let details = serde_json::from_str::<StoreErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    warn!(target: targets::STORE, operation = %operation, status = %status, details = %details, "Store rejected request");
    Error::StoreFailure { operation, details }
}

/// In-memory store with the same observable semantics as the hosted
/// backend: OR-filtered search, sequence-keyed upsert, duplicate payment
/// references rejected. Records every operation so tests can assert that a
/// failed precondition issued no store call, and supports queued fault
/// injection.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    fiches: Vec<Fiche>,
    payments: Vec<Payment>,
    next_id: i64,
    queued_errors: VecDeque<Error>,
    operations: Vec<StoreOperation>,
    access_token: Option<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fiche directly, assigning a store identifier.
    pub fn seed_fiche(&self, mut fiche: Fiche) -> Fiche {
        let mut state = self.state.lock().expect("mock store lock");
        state.next_id += 1;
        fiche.id = Some(state.next_id);
        state.fiches.push(fiche.clone());
        fiche
    }

    pub fn seed_payment(&self, payment: Payment) {
        let mut state = self.state.lock().expect("mock store lock");
        state.payments.push(payment);
    }

    /// Queues an error returned by the next store call, whichever it is.
    pub fn push_error(&self, error: Error) {
        let mut state = self.state.lock().expect("mock store lock");
        state.queued_errors.push_back(error);
    }

    pub fn operations(&self) -> Vec<StoreOperation> {
        let state = self.state.lock().expect("mock store lock");
        state.operations.clone()
    }

    pub fn fiches(&self) -> Vec<Fiche> {
        let state = self.state.lock().expect("mock store lock");
        state.fiches.clone()
    }

    pub fn payments(&self) -> Vec<Payment> {
        let state = self.state.lock().expect("mock store lock");
        state.payments.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        let state = self.state.lock().expect("mock store lock");
        state.access_token.clone()
    }

    fn begin(
        &self,
        operation: StoreOperation,
    ) -> Result<MutexGuard<'_, MockState>, Error> {
        let mut state = self.state.lock().map_err(|_| Error::StoreFailure {
            operation,
            details: "Mock store lock poisoned.".to_string(),
        })?;
        state.operations.push(operation);
        if let Some(error) = state.queued_errors.pop_front() {
            return Err(error);
        }
        Ok(state)
    }
}

fn matches_query(fiche: &Fiche, query: &str) -> bool {
    let lowered = query.to_lowercase();
    fiche.sequence == query
        || fiche.name.to_lowercase().contains(&lowered)
        || fiche.parcel_number == query
        || fiche.phone == query
        || fiche.email == query
}

impl Store for MockStore {
    fn search_fiches(&self, query: String) -> StoreFuture<'_, Vec<Fiche>> {
        Box::pin(async move {
            let state = self.begin(StoreOperation::Search)?;
            Ok(state
                .fiches
                .iter()
                .filter(|fiche| matches_query(fiche, &query))
                .cloned()
                .collect())
        })
    }

    fn sequence_numbers(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let state = self.begin(StoreOperation::Sequences)?;
            Ok(state
                .fiches
                .iter()
                .map(|fiche| fiche.sequence.clone())
                .collect())
        })
    }

    fn upsert_fiche(&self, mut fiche: Fiche) -> StoreFuture<'_, Fiche> {
        Box::pin(async move {
            let mut state = self.begin(StoreOperation::Upsert)?;
            if let Some(index) = state
                .fiches
                .iter()
                .position(|existing| existing.sequence == fiche.sequence)
            {
                // Full replacement keyed by the fiche number; the store
                // identifier is preserved.
                fiche.id = state.fiches[index].id;
                state.fiches[index] = fiche.clone();
            } else {
                state.next_id += 1;
                fiche.id = Some(state.next_id);
                state.fiches.push(fiche.clone());
            }
            Ok(fiche)
        })
    }

    fn delete_fiche_by_id(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.begin(StoreOperation::DeleteFiche)?;
            state.fiches.retain(|fiche| fiche.id != Some(id));
            Ok(())
        })
    }

    fn insert_payment(&self, draft: PaymentDraft) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.begin(StoreOperation::InsertPayment)?;
            if state
                .payments
                .iter()
                .any(|payment| payment.reference == draft.reference)
            {
                return Err(Error::DuplicateReference {
                    reference: draft.reference,
                });
            }
            state.payments.push(Payment {
                sequence: draft.sequence,
                amount: draft.amount,
                reference: draft.reference,
                status: draft.status,
                created_at: Utc::now(),
            });
            Ok(())
        })
    }

    fn payments_for(&self, sequence: String) -> StoreFuture<'_, Vec<Payment>> {
        Box::pin(async move {
            let state = self.begin(StoreOperation::LoadPayments)?;
            let mut payments: Vec<Payment> = state
                .payments
                .iter()
                .filter(|payment| payment.sequence == sequence)
                .cloned()
                .collect();
            payments.sort_by(|left, right| right.created_at.cmp(&left.created_at));
            Ok(payments)
        })
    }

    fn delete_payments_for(&self, sequence: String) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.begin(StoreOperation::DeletePayments)?;
            state.payments.retain(|payment| payment.sequence != sequence);
            Ok(())
        })
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.access_token = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn run_future<T>(future: impl Future<Output = T>) -> T {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("tokio runtime");
        runtime.block_on(future)
    }

    fn named_fiche(sequence: &str, name: &str) -> Fiche {
        let mut fiche = Fiche::new(sequence);
        fiche.name = name.to_string();
        fiche
    }

    #[test]
    fn mock_search_is_an_or_filter() {
        let store = MockStore::new();
        let mut first = named_fiche("001", "KABONGO MWAMBA");
        first.parcel_number = "P-9".to_string();
        store.seed_fiche(first);
        store.seed_fiche(named_fiche("002", "NKULU KasONGO"));

        let by_sequence = run_future(store.search_fiches("002".to_string())).expect("search");
        assert_eq!(by_sequence.len(), 1);
        assert_eq!(by_sequence[0].name, "NKULU KasONGO");

        let by_name = run_future(store.search_fiches("kasongo".to_string())).expect("search");
        assert_eq!(by_name.len(), 1);

        let by_parcel = run_future(store.search_fiches("P-9".to_string())).expect("search");
        assert_eq!(by_parcel[0].sequence, "001");

        let none = run_future(store.search_fiches("absent".to_string())).expect("search");
        assert!(none.is_empty());
    }

    #[test]
    fn mock_upsert_replaces_by_sequence_and_keeps_id() {
        let store = MockStore::new();
        let saved = run_future(store.upsert_fiche(named_fiche("001", "FIRST"))).expect("insert");
        assert_eq!(saved.id, Some(1));

        let replaced =
            run_future(store.upsert_fiche(named_fiche("001", "SECOND"))).expect("update");
        assert_eq!(replaced.id, Some(1));
        let fiches = store.fiches();
        assert_eq!(fiches.len(), 1);
        assert_eq!(fiches[0].name, "SECOND");
    }

    #[test]
    fn mock_rejects_duplicate_payment_reference() {
        let store = MockStore::new();
        let draft = PaymentDraft::new("001", Decimal::from(50), "BORD-1");
        run_future(store.insert_payment(draft.clone())).expect("first insert");

        let error = run_future(store.insert_payment(draft)).expect_err("duplicate");
        match error {
            Error::DuplicateReference { reference } => assert_eq!(reference, "BORD-1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mock_queued_error_is_returned_once() {
        let store = MockStore::new();
        store.push_error(Error::StoreFailure {
            operation: StoreOperation::Search,
            details: "offline".to_string(),
        });

        let error = run_future(store.search_fiches("x".to_string())).expect_err("queued");
        assert!(matches!(error, Error::StoreFailure { .. }));
        run_future(store.search_fiches("x".to_string())).expect("queue drained");
    }

    #[test]
    fn mock_orders_payments_newest_first() {
        let store = MockStore::new();
        for reference in ["A", "B", "C"] {
            run_future(store.insert_payment(PaymentDraft::new(
                "001",
                Decimal::from(10),
                reference,
            )))
            .expect("insert");
        }

        let payments = run_future(store.payments_for("001".to_string())).expect("load");
        assert_eq!(payments.len(), 3);
        assert!(payments[0].created_at >= payments[2].created_at);
    }
}
