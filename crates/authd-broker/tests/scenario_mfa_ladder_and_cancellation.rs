//! Scenario: a multi-step MFA ladder that includes a wait-based mode, and a
//! wait-based `IsAuthenticated` call racing a concurrent
//! `CancelIsAuthenticated`.

use std::sync::Arc;
use std::time::Duration;

use authd_broker::example::ExampleBroker;
use authd_broker::BrokerFacade;
use authd_config::BrokerConfig;
use authd_schemas::{AccessToken, LayoutDescriptor, LayoutType, SessionMode};

fn wait_only_layout() -> LayoutDescriptor {
    LayoutDescriptor {
        r#type: LayoutType::Form,
        label: None,
        entry: None,
        wait: Some("true".to_string()),
        button: None,
        code: None,
        content: None,
        renders_qrcode: None,
    }
}

fn password_and_wait_layout() -> LayoutDescriptor {
    LayoutDescriptor {
        r#type: LayoutType::Form,
        label: None,
        entry: Some("chars_password,digits".to_string()),
        wait: Some("true".to_string()),
        button: None,
        code: None,
        content: None,
        renders_qrcode: None,
    }
}

#[tokio::test]
async fn mfa_ladder_through_three_steps_grants() {
    let mut config = BrokerConfig::default();
    config.sleep_multiplier = 0.001; // phoneack1's wait resolves in a few ms.
    let facade = BrokerFacade::new(ExampleBroker::new(config)).unwrap();

    let session = facade
        .new_session("user-mfa", "en_US", SessionMode::Login)
        .await
        .unwrap();
    let id = session.session_id.as_str();

    // Step 1: password.
    let modes = facade
        .get_authentication_modes(id, vec![password_and_wait_layout()])
        .await
        .unwrap();
    assert!(modes.iter().any(|m| m.id == "password"));
    facade.select_authentication_mode(id, "password").await.unwrap();
    let (access, _) = facade
        .is_authenticated(id, r#"{"secret":"goodpass"}"#)
        .await
        .unwrap();
    assert_eq!(access, AccessToken::Next);

    // Step 2: an MFA, wait-based mode. The timeout path grants.
    let modes = facade
        .get_authentication_modes(id, vec![password_and_wait_layout()])
        .await
        .unwrap();
    assert!(modes.iter().any(|m| m.id == "phoneack1"));
    assert!(!modes.iter().any(|m| m.id == "password"));
    facade.select_authentication_mode(id, "phoneack1").await.unwrap();
    let (access, _) = facade
        .is_authenticated(id, r#"{"wait":"true"}"#)
        .await
        .unwrap();
    assert_eq!(access, AccessToken::Next);

    // Step 3: totp, the mode's rotating code.
    let modes = facade
        .get_authentication_modes(id, vec![password_and_wait_layout()])
        .await
        .unwrap();
    assert!(modes.iter().any(|m| m.id == "totp"));
    facade.select_authentication_mode(id, "totp").await.unwrap();
    let (access, data) = facade
        .is_authenticated(id, r#"{"secret":"1234560"}"#)
        .await
        .unwrap();
    assert_eq!(access, AccessToken::Granted);
    assert!(!data.is_empty());
}

#[tokio::test]
async fn concurrent_cancel_during_wait_returns_cancelled() {
    let facade = Arc::new(BrokerFacade::new(ExampleBroker::new(BrokerConfig::default())).unwrap());

    let session = facade.new_session("user1", "en_US", SessionMode::Login).await.unwrap();
    let id = session.session_id.clone();

    facade
        .get_authentication_modes(&id, vec![wait_only_layout()])
        .await
        .unwrap();
    facade.select_authentication_mode(&id, "phoneack1").await.unwrap();

    let wait_facade = Arc::clone(&facade);
    let wait_id = id.clone();
    let handle = tokio::spawn(async move {
        wait_facade
            .is_authenticated(&wait_id, r#"{"wait":"true"}"#)
            .await
            .unwrap()
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    facade.cancel_is_authenticated(&id).await;

    let (access, _) = handle.await.unwrap();
    assert_eq!(access, AccessToken::Cancelled);
}
