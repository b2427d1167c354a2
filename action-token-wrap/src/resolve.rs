use action_token::{PressOutcome, Presser, TokenError, resolve_press};
use tracing::{error, info, warn};

use crate::config::WrapConfig;
use crate::store::SurrogateStore;
use crate::wrap::Wrapper;

/// Resolve button data that may be a surrogate token.
///
/// Surrogate tokens are looked up in `store` and the stored signed form is
/// verified exactly like inline data, against the presser. The stored action
/// must equal the action inside the signed form. Anything that is not a
/// surrogate token goes straight to [`resolve_press`].
pub async fn resolve_surrogate_press(
    store: &dyn SurrogateStore,
    config: &WrapConfig,
    data: &str,
    secret: &[u8],
    presser: Option<&Presser>,
) -> PressOutcome {
    if !config.is_surrogate(data) {
        return resolve_press(data, secret, presser);
    }

    let payload = match store.get(data).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            info!(surrogate = data, "surrogate token has no live entry");
            return rejected(
                data,
                TokenError::SurrogateNotFound {
                    token: data.to_string(),
                },
            );
        }
        Err(e) => {
            error!(surrogate = data, "surrogate lookup failed: {e}");
            return rejected(
                data,
                TokenError::Store {
                    reason: e.to_string(),
                },
            );
        }
    };

    match resolve_press(&payload.wrapped, secret, presser) {
        PressOutcome::Verified(token) if token.raw == payload.raw => PressOutcome::Verified(token),
        PressOutcome::Verified(_) => {
            warn!(surrogate = data, "stored action does not match its signed form");
            rejected(
                data,
                TokenError::InvalidSignature {
                    details: "stored action does not match signed action".to_string(),
                },
            )
        }
        PressOutcome::Passthrough(_) => {
            warn!(surrogate = data, "stored surrogate payload is not a wrapped token");
            rejected(
                data,
                TokenError::malformed("surrogate payload is not a wrapped token"),
            )
        }
        PressOutcome::Rejected { reason, .. } => rejected(data, reason),
    }
}

fn rejected(data: &str, reason: TokenError) -> PressOutcome {
    PressOutcome::Rejected {
        data: data.to_string(),
        reason,
    }
}

impl Wrapper {
    /// Resolve pressed button data produced by [`Wrapper::wrap`].
    pub async fn resolve_press(
        &self,
        data: &str,
        secret: &[u8],
        presser: Option<&Presser>,
    ) -> PressOutcome {
        resolve_surrogate_press(self.store().as_ref(), self.config(), data, secret, presser).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySurrogateStore, StoreError, SurrogatePayload};
    use crate::wrap::{WrapOptions, WrapStatus};
    use action_token::{CallbackAction, TokenTimeConfig};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Arc;

    const SECRET: &[u8] = b"s";

    struct BrokenStore;

    #[async_trait]
    impl SurrogateStore for BrokenStore {
        async fn put(
            &self,
            _token: &str,
            _payload: SurrogatePayload,
            _expires_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get(&self, _token: &str) -> Result<Option<SurrogatePayload>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn alice() -> Presser {
        Presser::new(123456).with_keyboard_nonce("abc-123")
    }

    /// Wait until the background write has landed in the memory store
    async fn settle(store: &MemorySurrogateStore) {
        for _ in 0..100 {
            if !store.is_empty().await {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("surrogate entry was never stored");
    }

    #[tokio::test]
    async fn test_long_action_round_trip() {
        let store = Arc::new(MemorySurrogateStore::new());
        let wrapper = Wrapper::new(WrapConfig::default(), store.clone())
            .expect("Default config should be valid");
        let action = format!("export:{}", "x".repeat(190));

        let wrapped = wrapper
            .wrap(
                &action,
                SECRET,
                &WrapOptions::new(TokenTimeConfig::default()).bind_to(alice()),
            )
            .expect("Should wrap");
        assert_eq!(wrapped.outcome.status, WrapStatus::Surrogate);
        settle(&store).await;

        let outcome = wrapper
            .resolve_press(&wrapped.data, SECRET, Some(&alice()))
            .await;
        assert_eq!(outcome.action(), Some(action.as_str()));

        let outcome = wrapper
            .resolve_press(&wrapped.data, SECRET, Some(&Presser::new(42)))
            .await;
        assert!(outcome.reason().is_some_and(TokenError::is_binding_mismatch));
    }

    #[tokio::test]
    async fn test_inline_data_is_not_looked_up() {
        let wrapper = Wrapper::new(WrapConfig::default(), Arc::new(BrokenStore))
            .expect("Default config should be valid");
        let data = CallbackAction::new("order:accept:42", TokenTimeConfig::default())
            .issue(SECRET)
            .expect("Failed to create token");

        let outcome = wrapper.resolve_press(&data, SECRET, None).await;
        assert_eq!(outcome.action(), Some("order:accept:42"));

        let outcome = wrapper.resolve_press("menu:main", SECRET, None).await;
        assert_eq!(outcome, PressOutcome::Passthrough("menu:main".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_surrogate_rejected() {
        let wrapper = Wrapper::new(
            WrapConfig::default(),
            Arc::new(MemorySurrogateStore::new()),
        )
        .expect("Default config should be valid");

        let outcome = wrapper.resolve_press("cbs:AAAAAAAAAAAA", SECRET, None).await;
        assert!(matches!(
            outcome.reason(),
            Some(TokenError::SurrogateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_store_write_surfaces_at_press_time() {
        let wrapper = Wrapper::new(WrapConfig::default(), Arc::new(BrokenStore))
            .expect("Default config should be valid");

        let wrapped = wrapper
            .wrap(&"y".repeat(120), SECRET, &WrapOptions::default())
            .expect("Store failure must not block wrapping");
        assert_eq!(wrapped.outcome.status, WrapStatus::Surrogate);
        tokio::task::yield_now().await;

        let outcome = wrapper.resolve_press(&wrapped.data, SECRET, None).await;
        assert!(matches!(outcome.reason(), Some(TokenError::Store { .. })));
        assert_eq!(outcome.action(), None);
    }

    #[tokio::test]
    async fn test_mismatched_payload_rejected() {
        let store = MemorySurrogateStore::new();
        let config = WrapConfig::default();
        let wrapped = CallbackAction::new("refund:all", TokenTimeConfig::default())
            .issue(SECRET)
            .expect("Failed to create token");
        store
            .put(
                "cbs:AAAAAAAAAAAA",
                SurrogatePayload {
                    raw: "refund:one".to_string(),
                    wrapped,
                },
                Utc::now() + Duration::seconds(60),
            )
            .await
            .expect("Put should succeed");

        let outcome =
            resolve_surrogate_press(&store, &config, "cbs:AAAAAAAAAAAA", SECRET, None).await;
        assert!(outcome.reason().is_some_and(TokenError::is_signature_error));
    }
}
