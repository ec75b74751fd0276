use rust_decimal::Decimal;

use crate::model::{Fiche, Payment};
use crate::tarifs::PlanRates;

/// Minimum zero-padding width for human-facing fiche numbers ("001").
pub const SEQUENCE_PAD_WIDTH: usize = 3;

/// Next fiche number: `1 + max(numeric value of existing numbers)`, or 1
/// when no record exists. Advisory only; two sessions opening "new fiche"
/// at the same time may compute the same number and the save-time upsert
/// resolves that collision.
pub fn next_sequence<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|value| value.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format_sequence(highest + 1)
}

pub fn format_sequence(value: u64) -> String {
    format!("{value:0width$}", width = SEQUENCE_PAD_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub amount_paid: Decimal,
    pub remaining: Decimal,
}

/// Derived account balance, recomputed from in-memory state on every render
/// and never stored. The down payment counts only once the record exists in
/// the store; `remaining` may go negative on overpayment and is shown as-is.
pub fn reconcile(rates: &PlanRates, persisted: bool, payments: &[Payment]) -> BalanceSummary {
    let mut amount_paid: Decimal = payments.iter().map(|payment| payment.amount).sum();
    if persisted {
        amount_paid += rates.down_payment;
    }

    BalanceSummary {
        amount_paid,
        remaining: rates.total - amount_paid,
    }
}

#[derive(Debug, Clone)]
pub struct PickedFiche {
    pub fiche: Fiche,
    pub total_matches: usize,
}

/// Deterministic tie-break for a multi-match search: lowest numeric fiche
/// number wins, non-numeric numbers sort after numeric ones by string order.
pub fn pick_candidate(mut candidates: Vec<Fiche>) -> Option<PickedFiche> {
    let total_matches = candidates.len();
    candidates.sort_by(|left, right| sequence_rank(&left.sequence).cmp(&sequence_rank(&right.sequence)));
    candidates.into_iter().next().map(|fiche| PickedFiche {
        fiche,
        total_matches,
    })
}

fn sequence_rank(sequence: &str) -> (u64, String) {
    match sequence.trim().parse::<u64>() {
        Ok(value) => (value, String::new()),
        Err(_) => (u64::MAX, sequence.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::PAYMENT_STATUS_VALIDATED;

    fn payment(sequence: &str, amount: u32) -> Payment {
        Payment {
            sequence: sequence.to_string(),
            amount: Decimal::from(amount),
            reference: format!("REF-{amount}"),
            status: PAYMENT_STATUS_VALIDATED.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn next_sequence_uses_highest_existing() {
        let existing = ["001", "002", "005"];
        assert_eq!(next_sequence(existing), "006");
    }

    #[test]
    fn next_sequence_defaults_to_one() {
        assert_eq!(next_sequence([]), "001");
    }

    #[test]
    fn next_sequence_grows_past_pad_width() {
        assert_eq!(next_sequence(["999"]), "1000");
        assert_eq!(next_sequence(["1000"]), "1001");
    }

    #[test]
    fn next_sequence_ignores_non_numeric_entries() {
        assert_eq!(next_sequence(["garbage", "012", ""]), "013");
    }

    #[test]
    fn reconcile_counts_down_payment_when_persisted() {
        let rates = PlanRates {
            total: Decimal::from(800),
            down_payment: Decimal::from(80),
            monthly_installment: Decimal::from(32),
        };
        let payments = vec![payment("001", 50), payment("001", 50)];

        let summary = reconcile(&rates, true, &payments);
        assert_eq!(summary.amount_paid, Decimal::from(180));
        assert_eq!(summary.remaining, Decimal::from(620));
    }

    #[test]
    fn reconcile_excludes_down_payment_for_draft() {
        let rates = PlanRates {
            total: Decimal::from(800),
            down_payment: Decimal::from(80),
            monthly_installment: Decimal::from(32),
        };
        let payments = vec![payment("001", 50), payment("001", 50)];

        let summary = reconcile(&rates, false, &payments);
        assert_eq!(summary.amount_paid, Decimal::from(100));
        assert_eq!(summary.remaining, Decimal::from(700));
    }

    #[test]
    fn reconcile_keeps_negative_remaining() {
        let rates = PlanRates {
            total: Decimal::from(100),
            down_payment: Decimal::from(10),
            monthly_installment: Decimal::from(5),
        };
        let payments = vec![payment("001", 120)];

        let summary = reconcile(&rates, true, &payments);
        assert_eq!(summary.remaining, Decimal::from(-30));
    }

    #[test]
    fn pick_candidate_prefers_lowest_sequence() {
        let candidates = vec![Fiche::new("014"), Fiche::new("003"), Fiche::new("100")];
        let picked = pick_candidate(candidates).expect("candidate");
        assert_eq!(picked.fiche.sequence, "003");
        assert_eq!(picked.total_matches, 3);
    }

    #[test]
    fn pick_candidate_empty_is_none() {
        assert!(pick_candidate(Vec::new()).is_none());
    }
}
