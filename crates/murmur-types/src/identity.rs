use serde::{Deserialize, Serialize};

/// Event type that provisions a local user.
pub const ACCOUNT_CREATED: &str = "user.created";

/// Envelope delivered by the identity provider's webhook. Signature checks
/// happen before the payload reaches this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of an "account created" event. Field names follow the camelCase
/// contract; the provider's snake_case names are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreated {
    #[serde(default, alias = "id")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "email_addresses")]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default, alias = "primary_email_address_id")]
    pub primary_email_address_id: Option<String>,
    #[serde(default, alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(default, alias = "last_name")]
    pub last_name: Option<String>,
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    #[serde(alias = "email_address")]
    pub address: String,
}

impl AccountCreated {
    /// The address whose id matches `primary_email_address_id`, if any.
    pub fn primary_email(&self) -> Option<&str> {
        let primary_id = self.primary_email_address_id.as_deref()?;
        self.email_addresses
            .iter()
            .find(|e| e.id == primary_id)
            .map(|e| e.address.as_str())
    }
}
