use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Moneybird administration identifier (tenant/account namespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct AdministrationId(pub String);

/// Moneybird sales invoice identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct InvoiceId(pub String);

/// Token response from the Moneybird token endpoint.
///
/// Ephemeral — never persisted beyond being installed into the session.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Moneybird administration metadata. Read-only, fetched on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Administration {
    pub id: AdministrationId,
    pub name: String,
    pub language: String,
    pub currency: String,
}

/// Invoice counterparty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: Option<String>,
    pub company_name: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sales invoice lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    Draft,
    Open,
    Late,
    Paid,
    Cancelled,
}

/// Moneybird sales invoice. Read-only, fetched on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-readable invoice number (e.g. `MB-1001`).
    pub invoice_id: String,
    pub contact: Contact,
    pub invoice_date: time::Date,
    pub due_date: time::Date,
    pub total_price_excl_tax: f64,
    pub total_price_incl_tax: f64,
    pub state: InvoiceState,
    pub currency: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn invoice_deserializes_from_wire_shape() {
        let json = r#"{
            "id": "433546255engh5j",
            "invoice_id": "MB-1001",
            "contact": { "id": "c-1", "company_name": "ACME BV" },
            "invoice_date": "2025-08-01",
            "due_date": "2025-09-01",
            "total_price_excl_tax": 2066.12,
            "total_price_incl_tax": 2500.0,
            "state": "open",
            "currency": "EUR"
        }"#;

        let invoice: Invoice = serde_json::from_str(json).unwrap();
        assert_eq!(invoice.invoice_id, "MB-1001");
        assert_eq!(invoice.contact.company_name, "ACME BV");
        assert_eq!(invoice.due_date, date!(2025 - 09 - 01));
        assert_eq!(invoice.state, InvoiceState::Open);
        assert!(invoice.reference.is_none());
    }

    #[test]
    fn invoice_state_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&InvoiceState::Late).unwrap(), "\"late\"");
        let state: InvoiceState = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(state, InvoiceState::Cancelled);
    }

    #[test]
    fn token_response_optional_fields_default() {
        let json = r#"{ "access_token": "abc", "token_type": "bearer" }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(token.expires_in.is_none());
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn administration_id_serde_transparent() {
        let id = AdministrationId::from("123".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"123\"");
        assert_eq!(id.to_string(), "123");
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_administration_id(_: &AdministrationId) {}
        fn takes_invoice_id(_: &InvoiceId) {}

        let admin = AdministrationId::from("id".to_string());
        let invoice = InvoiceId::from("id".to_string());

        takes_administration_id(&admin);
        takes_invoice_id(&invoice);
        // takes_administration_id(&invoice);  // Compile error!
        // takes_invoice_id(&admin);  // Compile error!
    }
}
