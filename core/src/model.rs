use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status tag stamped on every payment; there is no pending/rejected state.
pub const PAYMENT_STATUS_VALIDATED: &str = "VALIDÉ";

/// Subscriber enrollment record. Field names follow the hosted store's
/// column names on the wire (the backend schema predates this client), the
/// Rust side uses plain English.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fiche {
    /// Store-assigned identifier; `None` until the first successful save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "num_fiche")]
    pub sequence: String,
    #[serde(rename = "noms")]
    pub name: String,
    #[serde(rename = "num_piece_id")]
    pub national_id: String,
    #[serde(rename = "employeur")]
    pub employer: String,
    #[serde(rename = "matricule")]
    pub employee_number: String,
    #[serde(rename = "fonction")]
    pub job_title: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    pub email: String,
    #[serde(rename = "avenue_num")]
    pub street_address: String,
    #[serde(rename = "quartier")]
    pub neighborhood: String,
    #[serde(rename = "commune")]
    pub municipality: String,
    #[serde(rename = "num_parcelle")]
    pub parcel_number: String,
    #[serde(rename = "num_cadastral")]
    pub cadastral_number: String,
    #[serde(rename = "num_acte_vente")]
    pub deed_of_sale_number: String,
    pub site: String,
    pub dimension: String,
    #[serde(rename = "prix_total", default)]
    pub total_price: Decimal,
    #[serde(rename = "acompte_initial", default)]
    pub down_payment: Decimal,
    #[serde(rename = "quotite_mensuelle", default)]
    pub monthly_installment: Decimal,
}

impl Fiche {
    pub fn new(sequence: impl Into<String>) -> Self {
        Self {
            id: None,
            sequence: sequence.into(),
            name: String::new(),
            national_id: String::new(),
            employer: String::new(),
            employee_number: String::new(),
            job_title: String::new(),
            phone: String::new(),
            email: String::new(),
            street_address: String::new(),
            neighborhood: String::new(),
            municipality: String::new(),
            parcel_number: String::new(),
            cadastral_number: String::new(),
            deed_of_sale_number: String::new(),
            site: String::new(),
            dimension: String::new(),
            total_price: Decimal::ZERO,
            down_payment: Decimal::ZERO,
            monthly_installment: Decimal::ZERO,
        }
    }

    /// Only persisted records may receive payments, be printed, or deleted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// One ledger entry as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "num_fiche")]
    pub sequence: String,
    #[serde(rename = "montant")]
    pub amount: Decimal,
    #[serde(rename = "reference_bordereau")]
    pub reference: String,
    #[serde(rename = "statut")]
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentDraft {
    #[serde(rename = "num_fiche")]
    pub sequence: String,
    #[serde(rename = "montant")]
    pub amount: Decimal,
    #[serde(rename = "reference_bordereau")]
    pub reference: String,
    #[serde(rename = "statut")]
    pub status: String,
}

impl PaymentDraft {
    /// Reference codes are upper-cased before storage, status is always the
    /// validated tag.
    pub fn new(sequence: impl Into<String>, amount: Decimal, reference: &str) -> Self {
        Self {
            sequence: sequence.into(),
            amount,
            reference: reference.trim().to_uppercase(),
            status: PAYMENT_STATUS_VALIDATED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiche_serializes_with_store_column_names() {
        let mut fiche = Fiche::new("042");
        fiche.name = "KABONGO MWAMBA".to_string();
        fiche.site = "NDJILI BRASSERIE".to_string();
        fiche.dimension = "15x20".to_string();
        fiche.total_price = Decimal::from(800);

        let json = serde_json::to_value(&fiche).expect("serialize fiche");
        assert_eq!(json["num_fiche"], "042");
        assert_eq!(json["noms"], "KABONGO MWAMBA");
        assert_eq!(json["prix_total"], 800.0);
        // Unsaved drafts must not send an id for the store to generate one.
        assert!(json.get("id").is_none());
    }

    #[test]
    fn fiche_roundtrips_through_store_payload() {
        let mut fiche = Fiche::new("007");
        fiche.id = Some(31);
        fiche.parcel_number = "P-118".to_string();

        let json = serde_json::to_string(&fiche).expect("serialize");
        let decoded: Fiche = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, fiche);
        assert!(decoded.is_persisted());
    }

    #[test]
    fn payment_draft_uppercases_reference() {
        let draft = PaymentDraft::new("001", Decimal::from(50), " bord-77a ");
        assert_eq!(draft.reference, "BORD-77A");
        assert_eq!(draft.status, PAYMENT_STATUS_VALIDATED);
    }
}
