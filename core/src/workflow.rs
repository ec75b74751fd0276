//! Orchestration of the fiche editing session: search, save, payment
//! append, and the elevated two-step deletion. All store traffic is
//! awaited to completion; nothing is applied optimistically.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::auth::AuthClient;
use crate::error::Error;
use crate::ledger;
use crate::model::{Fiche, Payment, PaymentDraft};
use crate::store::Store;
use crate::targets;
use crate::tarifs;

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    NotFound,
    Found {
        fiche: Fiche,
        payments: Vec<Payment>,
        /// Total candidates the filter matched; above 1 the UI surfaces a
        /// multi-match notice telling staff to search by exact fiche number.
        candidates: usize,
    },
}

/// Fiche number for a fresh editing session. Advisory: a concurrent session
/// may compute the same number; the upsert resolves the collision at save.
pub async fn next_sequence_number(store: &dyn Store) -> Result<String, Error> {
    let existing = store.sequence_numbers().await?;
    let next = ledger::next_sequence(existing.iter().map(String::as_str));
    debug!(target: targets::WORKFLOW, next = %next, "Assigned provisional fiche number");
    Ok(next)
}

/// Runs the OR-combined search and picks one deterministic record when the
/// filter matches several. The caller keeps its editing session unchanged
/// on `NotFound`. Empty queries are a no-op at the UI layer and never reach
/// this function.
pub async fn search(store: &dyn Store, query: &str) -> Result<SearchOutcome, Error> {
    let query = query.trim();
    let candidates = store.search_fiches(query.to_string()).await?;
    let Some(picked) = ledger::pick_candidate(candidates) else {
        debug!(target: targets::WORKFLOW, query = %query, "No subscriber matched");
        return Ok(SearchOutcome::NotFound);
    };

    if picked.total_matches > 1 {
        info!(
            target: targets::WORKFLOW,
            query = %query,
            matches = picked.total_matches,
            chosen = %picked.fiche.sequence,
            "Multiple subscribers matched"
        );
    }

    let payments = store.payments_for(picked.fiche.sequence.clone()).await?;
    Ok(SearchOutcome::Found {
        fiche: picked.fiche,
        payments,
        candidates: picked.total_matches,
    })
}

/// Name and site are the only required fields; the error names whichever
/// are missing and no store call is made.
pub fn validate(fiche: &Fiche) -> Result<(), Error> {
    let mut missing = Vec::new();
    if fiche.name.trim().is_empty() {
        missing.push("name".to_string());
    }
    if fiche.site.trim().is_empty() {
        missing.push("site".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { fields: missing })
    }
}

/// Create-or-update keyed by the fiche number. The pricing fields are
/// re-derived from the current plan right before persisting so a stale
/// plan selection can never leak into the store. Returns the store's
/// canonical copy, which replaces the in-memory session.
pub async fn save(store: &dyn Store, mut fiche: Fiche) -> Result<Fiche, Error> {
    validate(&fiche)?;

    let rates = tarifs::resolve(&fiche.site, &fiche.dimension);
    fiche.total_price = rates.total;
    fiche.down_payment = rates.down_payment;
    fiche.monthly_installment = rates.monthly_installment;

    let saved = store.upsert_fiche(fiche).await?;
    info!(
        target: targets::WORKFLOW,
        sequence = %saved.sequence,
        id = saved.id.unwrap_or(-1),
        "Fiche saved"
    );
    Ok(saved)
}

/// Validates and records one installment. The caller re-runs the search
/// for the active fiche number afterwards: the ledger refresh is a full
/// reload, which also re-confirms the record still exists.
pub async fn add_payment(
    store: &dyn Store,
    sequence: &str,
    amount_text: &str,
    reference_text: &str,
) -> Result<(), Error> {
    let mut missing = Vec::new();
    if amount_text.trim().is_empty() {
        missing.push("amount".to_string());
    }
    if reference_text.trim().is_empty() {
        missing.push("reference".to_string());
    }
    if !missing.is_empty() {
        return Err(Error::Validation { fields: missing });
    }

    let amount: Decimal = amount_text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount {
            input: amount_text.trim().to_string(),
        })?;
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            input: amount_text.trim().to_string(),
        });
    }

    let draft = PaymentDraft::new(sequence, amount, reference_text);
    store.insert_payment(draft).await?;
    info!(target: targets::WORKFLOW, sequence = %sequence, "Payment recorded");
    Ok(())
}

/// Elevated deletion: a second, independent credential check whose verified
/// identity must match the single authorized account, then payments are
/// removed before the record. The two steps are not transactional; a
/// failure in between leaves the record without payments, which is the
/// accepted lesser risk compared to orphaned payments.
pub async fn delete_fiche(
    auth: &dyn AuthClient,
    store: &dyn Store,
    authorized_email: &str,
    email: &str,
    password: &str,
    fiche: &Fiche,
) -> Result<(), Error> {
    let Some(id) = fiche.id else {
        return Err(Error::NotPersisted {
            operation: "deleting it",
        });
    };

    let verified = auth
        .verify_identity(email.trim().to_string(), password.to_string())
        .await
        .map_err(|error| {
            warn!(target: targets::WORKFLOW, error = %error.technical_detail(), "Deletion identity check failed");
            Error::AccessDenied {
                email: email.trim().to_string(),
            }
        })?;

    if !verified.eq_ignore_ascii_case(authorized_email.trim()) {
        warn!(
            target: targets::WORKFLOW,
            verified = %verified,
            "Deletion attempted by a non-authorized identity"
        );
        return Err(Error::AccessDenied { email: verified });
    }

    store
        .delete_payments_for(fiche.sequence.clone())
        .await
        .map_err(|error| Error::DeletionFailure {
            details: error.technical_detail(),
        })?;
    store
        .delete_fiche_by_id(id)
        .await
        .map_err(|error| Error::DeletionFailure {
            details: error.technical_detail(),
        })?;

    info!(target: targets::WORKFLOW, sequence = %fiche.sequence, "Fiche and ledger deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::auth::MockAuthClient;
    use crate::error::StoreOperation;
    use crate::store::MockStore;

    const ADMIN: &str = "director@example.org";

    fn run_future<T>(future: impl Future<Output = T>) -> T {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("tokio runtime");
        runtime.block_on(future)
    }

    fn draft_fiche(sequence: &str, name: &str, site: &str) -> Fiche {
        let mut fiche = Fiche::new(sequence);
        fiche.name = name.to_string();
        fiche.site = site.to_string();
        fiche.dimension = "15x20".to_string();
        fiche
    }

    #[test]
    fn next_sequence_number_skips_gaps() {
        let store = MockStore::new();
        store.seed_fiche(Fiche::new("001"));
        store.seed_fiche(Fiche::new("005"));

        let next = run_future(next_sequence_number(&store)).expect("sequence");
        assert_eq!(next, "006");
    }

    #[test]
    fn next_sequence_number_starts_at_one() {
        let store = MockStore::new();
        let next = run_future(next_sequence_number(&store)).expect("sequence");
        assert_eq!(next, "001");
    }

    #[test]
    fn save_rejects_missing_name_without_store_access() {
        let store = MockStore::new();
        let fiche = draft_fiche("001", "", "NDJILI BRASSERIE");

        let error = run_future(save(&store, fiche)).expect_err("validation");
        match error {
            Error::Validation { fields } => assert_eq!(fields, vec!["name"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.operations().is_empty());
    }

    #[test]
    fn save_names_every_missing_field() {
        let store = MockStore::new();
        let error = run_future(save(&store, Fiche::new("001"))).expect_err("validation");
        match error {
            Error::Validation { fields } => assert_eq!(fields, vec!["name", "site"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn save_rederives_pricing_from_current_plan() {
        let store = MockStore::new();
        let mut fiche = draft_fiche("001", "KABONGO", "NDJILI BRASSERIE");
        // Stale derived values from an earlier plan selection.
        fiche.total_price = Decimal::from(9999);
        fiche.down_payment = Decimal::from(1);

        let saved = run_future(save(&store, fiche)).expect("saved");
        assert_eq!(saved.total_price, Decimal::from(800));
        assert_eq!(saved.down_payment, Decimal::from(80));
        assert_eq!(saved.monthly_installment, Decimal::from(32));
        assert!(saved.is_persisted());
    }

    #[test]
    fn save_upsert_replaces_existing_record() {
        let store = MockStore::new();
        let first = run_future(save(&store, draft_fiche("001", "FIRST", "KINGAKATI")))
            .expect("create");
        let second = run_future(save(&store, draft_fiche("001", "SECOND", "KINGAKATI")))
            .expect("update");
        assert_eq!(first.id, second.id);
        assert_eq!(store.fiches().len(), 1);
        assert_eq!(store.fiches()[0].name, "SECOND");
    }

    #[test]
    fn search_returns_not_found_for_unknown_query() {
        let store = MockStore::new();
        store.seed_fiche(draft_fiche("001", "KABONGO", "KINGAKATI"));

        let outcome = run_future(search(&store, "absent")).expect("search");
        assert!(matches!(outcome, SearchOutcome::NotFound));
    }

    #[test]
    fn search_multi_match_picks_lowest_sequence() {
        let store = MockStore::new();
        store.seed_fiche(draft_fiche("014", "MWAMBA KALALA", "KINGAKATI"));
        store.seed_fiche(draft_fiche("003", "KALALA NGOY", "KINGAKATI"));

        let outcome = run_future(search(&store, "kalala")).expect("search");
        match outcome {
            SearchOutcome::Found {
                fiche, candidates, ..
            } => {
                assert_eq!(fiche.sequence, "003");
                assert_eq!(candidates, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn search_loads_ledger_for_match() {
        let store = MockStore::new();
        store.seed_fiche(draft_fiche("001", "KABONGO", "KINGAKATI"));
        run_future(store.insert_payment(PaymentDraft::new("001", Decimal::from(50), "A")))
            .expect("payment");

        let outcome = run_future(search(&store, "001")).expect("search");
        match outcome {
            SearchOutcome::Found { payments, .. } => assert_eq!(payments.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn add_payment_requires_both_inputs() {
        let store = MockStore::new();
        let error = run_future(add_payment(&store, "001", " ", "")).expect_err("validation");
        match error {
            Error::Validation { fields } => assert_eq!(fields, vec!["amount", "reference"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.operations().is_empty());
    }

    #[test]
    fn add_payment_rejects_non_positive_amount() {
        let store = MockStore::new();
        let error = run_future(add_payment(&store, "001", "-5", "REF")).expect_err("amount");
        assert!(matches!(error, Error::InvalidAmount { .. }));
        assert!(store.operations().is_empty());
    }

    #[test]
    fn add_payment_uppercases_reference() {
        let store = MockStore::new();
        run_future(add_payment(&store, "001", "25.50", "bord-9")).expect("payment");
        assert_eq!(store.payments()[0].reference, "BORD-9");
        assert_eq!(store.payments()[0].amount, "25.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn add_payment_duplicate_reference_is_distinct() {
        let store = MockStore::new();
        run_future(add_payment(&store, "001", "50", "BORD-1")).expect("first");

        let error = run_future(add_payment(&store, "001", "60", "bord-1")).expect_err("dup");
        match &error {
            Error::DuplicateReference { reference } => assert_eq!(reference, "BORD-1"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(error.user_summary(), "Reference already used.");
    }

    #[test]
    fn delete_rejects_valid_but_unauthorized_identity() {
        let auth = MockAuthClient::new()
            .with_account(ADMIN, "pw")
            .with_account("clerk@example.org", "pw");
        let store = MockStore::new();
        let fiche = store.seed_fiche(draft_fiche("001", "KABONGO", "KINGAKATI"));
        run_future(store.insert_payment(PaymentDraft::new("001", Decimal::from(50), "A")))
            .expect("payment");
        let operations_before = store.operations().len();

        let error = run_future(delete_fiche(
            &auth,
            &store,
            ADMIN,
            "clerk@example.org",
            "pw",
            &fiche,
        ))
        .expect_err("denied");
        assert!(matches!(error, Error::AccessDenied { .. }));
        assert_eq!(error.user_summary(), "Access denied.");
        // Both collections untouched: no store call was issued at all.
        assert_eq!(store.operations().len(), operations_before);
        assert_eq!(store.fiches().len(), 1);
        assert_eq!(store.payments().len(), 1);
    }

    #[test]
    fn delete_rejects_bad_credentials_as_access_denied() {
        let auth = MockAuthClient::new().with_account(ADMIN, "pw");
        let store = MockStore::new();
        let fiche = store.seed_fiche(draft_fiche("001", "KABONGO", "KINGAKATI"));

        let error = run_future(delete_fiche(&auth, &store, ADMIN, ADMIN, "wrong", &fiche))
            .expect_err("denied");
        assert!(matches!(error, Error::AccessDenied { .. }));
        assert_eq!(store.fiches().len(), 1);
    }

    #[test]
    fn delete_removes_payments_then_record() {
        let auth = MockAuthClient::new().with_account(ADMIN, "pw");
        let store = MockStore::new();
        let fiche = store.seed_fiche(draft_fiche("001", "KABONGO", "KINGAKATI"));
        run_future(store.insert_payment(PaymentDraft::new("001", Decimal::from(50), "A")))
            .expect("payment");

        run_future(delete_fiche(&auth, &store, ADMIN, ADMIN, "pw", &fiche)).expect("deleted");
        assert!(store.fiches().is_empty());
        assert!(store.payments().is_empty());

        let operations = store.operations();
        let payments_step = operations
            .iter()
            .position(|op| *op == StoreOperation::DeletePayments)
            .expect("payments step");
        let record_step = operations
            .iter()
            .position(|op| *op == StoreOperation::DeleteFiche)
            .expect("record step");
        assert!(payments_step < record_step);
    }

    #[test]
    fn delete_failure_maps_to_generic_deletion_error() {
        let auth = MockAuthClient::new().with_account(ADMIN, "pw");
        let store = MockStore::new();
        let fiche = store.seed_fiche(draft_fiche("001", "KABONGO", "KINGAKATI"));
        store.push_error(Error::StoreFailure {
            operation: StoreOperation::DeletePayments,
            details: "offline".to_string(),
        });

        let error = run_future(delete_fiche(&auth, &store, ADMIN, ADMIN, "pw", &fiche))
            .expect_err("aborted");
        assert!(matches!(error, Error::DeletionFailure { .. }));
        assert_eq!(error.user_summary(), "Deletion failed.");
        // The record survives; the interrupted step never reached it.
        assert_eq!(store.fiches().len(), 1);
    }

    #[test]
    fn delete_requires_persisted_record() {
        let auth = MockAuthClient::new().with_account(ADMIN, "pw");
        let store = MockStore::new();
        let fiche = draft_fiche("001", "KABONGO", "KINGAKATI");

        let error = run_future(delete_fiche(&auth, &store, ADMIN, ADMIN, "pw", &fiche))
            .expect_err("unsaved");
        assert!(matches!(error, Error::NotPersisted { .. }));
        assert!(store.operations().is_empty());
    }
}
