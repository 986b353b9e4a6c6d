//! Shared test utilities for mail integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::auth::{
    AppInfo, AuthBridge, Authorization, MemoryAuthenticator, MemoryTokenStore, TokenStore,
};
use common::crypto::SecretKey;
use common::mail::{Account, MailClient, SetupOutcome};
use common::network::MemoryNetwork;

pub fn app_info() -> AppInfo {
    AppInfo {
        id: "net.sealmail.test".to_string(),
        name: "Sealmail".to_string(),
        vendor: "Sealmail Tests".to_string(),
    }
}

/// One account owner running the mail app against a shared network
pub struct TestUser {
    pub network: MemoryNetwork,
    pub authenticator: MemoryAuthenticator,
    pub tokens: MemoryTokenStore,
    pub bridge: AuthBridge<MemoryNetwork>,
    pub client: MailClient<MemoryNetwork>,
}

/// A fresh memory network; set RUST_LOG to see the library's events
pub async fn setup_network() -> MemoryNetwork {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    MemoryNetwork::memory().await.unwrap()
}

/// A fresh account owner on `network`, authorised through the full
///  request/approve/connect flow
pub async fn connect_user(network: &MemoryNetwork) -> TestUser {
    let authenticator = MemoryAuthenticator::new(network.clone(), SecretKey::generate());
    connect_app(network, &authenticator, app_info()).await
}

/// Authorise `app` for the account `authenticator` acts for
pub async fn connect_app(
    network: &MemoryNetwork,
    authenticator: &MemoryAuthenticator,
    app: AppInfo,
) -> TestUser {
    let tokens = MemoryTokenStore::new();
    let bridge = AuthBridge::new(
        network.clone(),
        app,
        Arc::new(authenticator.clone()),
        Arc::new(tokens.clone()),
    );

    let request = match bridge.authorize(None).await.unwrap() {
        Authorization::Requested(request) => request,
        Authorization::Connected(_) => panic!("no token was stored yet"),
    };
    let token = authenticator.approve(request).await.unwrap();
    let session = bridge.connect_with_token(&token, None).await.unwrap();
    assert_eq!(tokens.load().unwrap(), Some(token));

    TestUser {
        network: network.clone(),
        authenticator: authenticator.clone(),
        tokens,
        client: MailClient::new(bridge.clone(), session),
        bridge,
    }
}

/// Set up an email id that must be created outright
pub async fn create_account(user: &TestUser, email_id: &str) -> Account {
    match user.client.setup_account(email_id).await.unwrap() {
        SetupOutcome::Created(account) => account,
        SetupOutcome::SharePending(pending) => {
            panic!("unexpected share request for {}", pending.email_id)
        }
    }
}
