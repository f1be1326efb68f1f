use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use murmur_types::events::FeedEvent;
use murmur_types::identity::{ACCOUNT_CREATED, AccountCreated, IdentityEnvelope};
use murmur_types::models::User;

use crate::convert;
use crate::error::FeedError;
use crate::extract::ApiJson;
use crate::state::{AppState, blocking};

/// Length of the external key prefix used in synthesized usernames.
const SYNTHESIZED_PREFIX_LEN: usize = 8;

/// Candidate username before collision resolution: the explicit username,
/// then the local part of the primary email, then `user_<key prefix>`.
pub fn base_username(event: &AccountCreated, external_id: &str) -> String {
    if let Some(username) = non_blank(event.username.as_deref()) {
        return username.to_string();
    }

    let local_part = event
        .primary_email()
        .and_then(|address| address.split('@').next())
        .and_then(|local| non_blank(Some(local)));
    if let Some(local) = local_part {
        return local.to_string();
    }

    let prefix: String = external_id.chars().take(SYNTHESIZED_PREFIX_LEN).collect();
    format!("user_{}", prefix)
}

/// `first last` when both are present, whichever one is present otherwise,
/// and the resolved username as a last resort.
pub fn display_name(first: Option<&str>, last: Option<&str>, username: &str) -> String {
    match (non_blank(first), non_blank(last)) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(name), None) | (None, Some(name)) => name.to_string(),
        (None, None) => username.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Create or refresh the local user for a verified "account created" event.
///
/// Redelivery of the same event updates the stored name and avatar in place
/// and keeps the username that was resolved the first time.
pub async fn provision(state: &AppState, event: AccountCreated) -> Result<User, FeedError> {
    let external_id = non_blank(event.external_id.as_deref())
        .map(str::to_string)
        .ok_or_else(|| FeedError::Validation("missing external identity key".into()))?;

    let base = base_username(&event, &external_id);
    let avatar_url = event.image_url.clone();
    let first = event.first_name.clone();
    let last = event.last_name.clone();
    let new_id = Uuid::new_v4().to_string();

    let row = blocking(state, move |db| {
        db.provision_user(&new_id, &external_id, &base, avatar_url.as_deref(), |username| {
            display_name(first.as_deref(), last.as_deref(), username)
        })
    })
    .await?;

    let user = convert::user(row);
    info!("Provisioned user {} as '{}'", user.id, user.username);

    state.dispatcher.broadcast(FeedEvent::UserProvisioned {
        user_id: user.id,
        username: user.username.clone(),
    });
    state.dispatcher.invalidate_timelines(&[user.id]);

    Ok(user)
}

/// Route an identity envelope. Only account creation provisions anything;
/// other event types are acknowledged and ignored.
pub async fn handle_identity_event(
    state: &AppState,
    envelope: IdentityEnvelope,
) -> Result<Option<User>, FeedError> {
    if envelope.kind != ACCOUNT_CREATED {
        debug!("Ignoring identity event '{}'", envelope.kind);
        return Ok(None);
    }

    let event: AccountCreated = serde_json::from_value(envelope.data)
        .map_err(|e| FeedError::Validation(format!("malformed account payload: {}", e)))?;

    provision(state, event).await.map(Some)
}

/// POST /webhooks/identity — the payload has already been verified upstream.
pub async fn identity_webhook(
    State(state): State<AppState>,
    ApiJson(envelope): ApiJson<IdentityEnvelope>,
) -> Result<impl IntoResponse, FeedError> {
    let handled = handle_identity_event(&state, envelope).await?;

    Ok(Json(match handled {
        Some(user) => json!({ "handled": true, "user_id": user.id, "username": user.username }),
        None => json!({ "handled": false }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state;
    use murmur_types::identity::EmailAddress;

    fn event(external_id: &str) -> AccountCreated {
        AccountCreated {
            external_id: Some(external_id.into()),
            ..Default::default()
        }
    }

    #[test]
    fn base_username_priority() {
        let mut e = event("user_2xyzabcdef");
        e.email_addresses = vec![EmailAddress {
            id: "e1".into(),
            address: "yuna@example.com".into(),
        }];
        e.primary_email_address_id = Some("e1".into());
        e.username = Some("yuna_dev".into());
        assert_eq!(base_username(&e, "user_2xyzabcdef"), "yuna_dev");

        e.username = None;
        assert_eq!(base_username(&e, "user_2xyzabcdef"), "yuna");

        e.primary_email_address_id = None;
        assert_eq!(base_username(&e, "user_2xyzabcdef"), "user_user_2xy");
    }

    #[test]
    fn display_name_fallbacks() {
        assert_eq!(display_name(Some("Yuna"), Some("Sato"), "yuna"), "Yuna Sato");
        assert_eq!(display_name(Some("Yuna"), None, "yuna"), "Yuna");
        assert_eq!(display_name(None, Some("Sato"), "yuna"), "Sato");
        assert_eq!(display_name(Some("  "), None, "yuna"), "yuna");
    }

    #[tokio::test]
    async fn missing_external_id_is_a_validation_error() {
        let state = state();
        let err = provision(&state, AccountCreated::default()).await.unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
        assert_eq!(state.db.count_users().unwrap(), 0);
    }

    #[tokio::test]
    async fn redelivery_refreshes_name_without_new_row() {
        let state = state();
        let mut e = event("ext-1");
        e.username = Some("alex".into());
        e.first_name = Some("Alex".into());

        let first = provision(&state, e.clone()).await.unwrap();
        e.last_name = Some("Kim".into());
        let second = provision(&state, e).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.username, "alex");
        assert_eq!(second.display_name.as_deref(), Some("Alex Kim"));
        assert_eq!(state.db.count_users().unwrap(), 1);
    }

    #[tokio::test]
    async fn colliding_identities_get_suffixed_names() {
        let state = state();
        let mut a = event("ext-a");
        a.username = Some("alex".into());
        let mut b = event("ext-b");
        b.username = Some("alex".into());

        assert_eq!(provision(&state, a).await.unwrap().username, "alex");
        assert_eq!(provision(&state, b).await.unwrap().username, "alex_1");
    }

    #[tokio::test]
    async fn non_creation_events_are_acknowledged() {
        let state = state();
        let envelope = IdentityEnvelope {
            kind: "user.deleted".into(),
            data: json!({ "id": "ext-1" }),
        };
        assert!(handle_identity_event(&state, envelope).await.unwrap().is_none());
        assert_eq!(state.db.count_users().unwrap(), 0);
    }

    #[tokio::test]
    async fn provisioning_announces_the_user() {
        let state = state();
        let mut rx = state.dispatcher.subscribe();
        let user = provision(&state, event("ext-1")).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            FeedEvent::UserProvisioned {
                user_id: user.id,
                username: "user_ext-1".into(),
            }
        );
    }
}
