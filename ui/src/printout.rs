use chrono::{DateTime, Utc};

use fichedesk_core::{BalanceSummary, Fiche, Payment, PlanRates};

use crate::qr;

/// Plain-text rendition of a saved fiche, written to a file so it can be
/// printed or archived. Only persisted records are exported; the caller
/// enforces that.
pub fn build_document(
    fiche: &Fiche,
    rates: &PlanRates,
    balance: &BalanceSummary,
    payments: &[Payment],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    output.push_str("FICHE DE SOUSCRIPTION\n");
    output.push_str(&format!("Fiche no {}\n", fiche.sequence));
    output.push_str("=====================================\n\n");

    output.push_str("Souscripteur\n");
    push_field(&mut output, "Noms", &fiche.name);
    push_field(&mut output, "Piece d'identite", &fiche.national_id);
    push_field(&mut output, "Employeur", &fiche.employer);
    push_field(&mut output, "Matricule", &fiche.employee_number);
    push_field(&mut output, "Fonction", &fiche.job_title);
    push_field(&mut output, "Telephone", &fiche.phone);
    push_field(&mut output, "Email", &fiche.email);
    output.push('\n');

    output.push_str("Adresse\n");
    push_field(&mut output, "Avenue / no", &fiche.street_address);
    push_field(&mut output, "Quartier", &fiche.neighborhood);
    push_field(&mut output, "Commune", &fiche.municipality);
    output.push('\n');

    output.push_str("Parcelle\n");
    push_field(&mut output, "No parcelle", &fiche.parcel_number);
    push_field(&mut output, "No cadastral", &fiche.cadastral_number);
    push_field(&mut output, "No acte de vente", &fiche.deed_of_sale_number);
    push_field(&mut output, "Site", &fiche.site);
    push_field(&mut output, "Dimension", &fiche.dimension);
    output.push('\n');

    output.push_str("Plan de paiement\n");
    push_field(&mut output, "Prix total", &format!("{} USD", rates.total));
    push_field(
        &mut output,
        "Acompte initial",
        &format!("{} USD", rates.down_payment),
    );
    push_field(
        &mut output,
        "Quotite mensuelle",
        &format!("{} USD", rates.monthly_installment),
    );
    push_field(
        &mut output,
        "Montant paye",
        &format!("{} USD", balance.amount_paid),
    );
    push_field(
        &mut output,
        "Reste a payer",
        &format!("{} USD", balance.remaining),
    );
    output.push('\n');

    output.push_str(&format!("Paiements ({})\n", payments.len()));
    if payments.is_empty() {
        output.push_str("  Aucun paiement enregistre.\n");
    }
    for payment in payments {
        output.push_str(&format!(
            "  {}  {:>10} USD  ref {}  [{}]\n",
            payment.created_at.format("%Y-%m-%d"),
            payment.amount,
            payment.reference,
            payment.status
        ));
    }
    output.push('\n');

    if let Some(badge) = qr::render_badge(&qr::badge_payload(fiche, generated_at)) {
        output.push_str(&badge);
        output.push('\n');
    }

    output.push_str(&format!(
        "Genere le {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output
}

fn push_field(output: &mut String, label: &str, value: &str) {
    let value = if value.trim().is_empty() { "-" } else { value };
    output.push_str(&format!("  {label:<18} {value}\n"));
}

#[cfg(test)]
mod tests {
    use fichedesk_core::{ledger, tarifs, PaymentDraft, PAYMENT_STATUS_VALIDATED};
    use rust_decimal::Decimal;

    use super::*;

    fn sample_fiche() -> Fiche {
        let mut fiche = Fiche::new("012");
        fiche.id = Some(7);
        fiche.name = "KABONGO MWAMBA".to_string();
        fiche.site = "NDJILI BRASSERIE".to_string();
        fiche.dimension = "15x20".to_string();
        fiche
    }

    fn sample_payment(amount: u32, reference: &str) -> Payment {
        let draft = PaymentDraft::new("012", Decimal::from(amount), reference);
        Payment {
            sequence: draft.sequence,
            amount: draft.amount,
            reference: draft.reference,
            status: draft.status,
            created_at: "2026-02-01T10:00:00Z".parse().expect("timestamp"),
        }
    }

    #[test]
    fn document_shows_identity_plan_and_ledger() {
        let fiche = sample_fiche();
        let rates = tarifs::resolve(&fiche.site, &fiche.dimension);
        let payments = vec![sample_payment(50, "BORD-1")];
        let balance = ledger::reconcile(&rates, true, &payments);
        let generated_at = "2026-03-05T09:00:00Z".parse().expect("timestamp");

        let document = build_document(&fiche, &rates, &balance, &payments, generated_at);
        assert!(document.contains("Fiche no 012"));
        assert!(document.contains("KABONGO MWAMBA"));
        assert!(has_field(&document, "Prix total", "800 USD"));
        assert!(has_field(&document, "Montant paye", "130 USD"));
        assert!(has_field(&document, "Reste a payer", "670 USD"));
        assert!(document.contains("ref BORD-1"));
        assert!(document.contains(PAYMENT_STATUS_VALIDATED));
        assert!(document.contains("Genere le 2026-03-05"));
    }

    #[test]
    fn empty_ledger_is_stated_explicitly() {
        let fiche = sample_fiche();
        let rates = tarifs::resolve(&fiche.site, &fiche.dimension);
        let balance = ledger::reconcile(&rates, true, &[]);
        let generated_at = Utc::now();

        let document = build_document(&fiche, &rates, &balance, &[], generated_at);
        assert!(document.contains("Paiements (0)"));
        assert!(document.contains("Aucun paiement enregistre."));
    }

    #[test]
    fn blank_fields_render_as_dashes() {
        let mut fiche = sample_fiche();
        fiche.employer = String::new();
        let rates = tarifs::resolve(&fiche.site, &fiche.dimension);
        let balance = ledger::reconcile(&rates, true, &[]);

        let document = build_document(&fiche, &rates, &balance, &[], Utc::now());
        assert!(has_field(&document, "Employeur", "-"));
    }

    fn has_field(document: &str, label: &str, value: &str) -> bool {
        document.lines().any(|line| {
            let line = line.trim_start();
            line.starts_with(label) && line.trim_end().ends_with(value)
        })
    }
}
