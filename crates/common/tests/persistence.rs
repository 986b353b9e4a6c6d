//! Integration tests for reloading a saved vault

mod common;

use std::sync::Arc;

use ::common::auth::{AuthBridge, Authorization, MemoryAuthenticator};
use ::common::mail::{Email, MailClient};
use ::common::network::{BlobsStore, MemoryNetwork};

#[tokio::test]
async fn test_mail_survives_reload() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let vault_path = temp_dir.path().join("vault.bin");
    let blobs_path = temp_dir.path().join("blobs");

    let network = MemoryNetwork::new(BlobsStore::fs(&blobs_path).await.unwrap());
    let bob = common::connect_user(&network).await;
    common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;
    alice
        .client
        .send_email(&Email::new("alice", "bob", "still here", "after a restart"), "bob")
        .await
        .unwrap();
    network.save(&vault_path).unwrap();
    let owner = bob.authenticator.owner().clone();
    let tokens = bob.tokens.clone();
    let blobs = network.blobs().clone();
    drop(bob);
    drop(alice);
    drop(network);

    // immutable content stays in the same blob store
    let reloaded = MemoryNetwork::load(&vault_path, blobs).unwrap();
    let authenticator = MemoryAuthenticator::new(reloaded.clone(), owner);
    let bridge = AuthBridge::new(
        reloaded.clone(),
        common::app_info(),
        Arc::new(authenticator),
        Arc::new(tokens),
    );
    // the stored grant is bob's, carried over from before the reload
    let Authorization::Connected(session) = bridge.authorize(None).await.unwrap() else {
        panic!("stored token should resume after reload");
    };
    let client = MailClient::new(bridge, session);

    let account = client.read_account("bob").await.unwrap();
    let mut subjects = Vec::new();
    client
        .read_inbox(&account, |received| {
            subjects.push(received.email.subject().unwrap_or_default().to_string())
        })
        .await
        .unwrap();
    assert_eq!(subjects, vec!["still here".to_string()]);
}

#[tokio::test]
async fn test_missing_vault_starts_empty() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let network = MemoryNetwork::load(
        &temp_dir.path().join("vault.bin"),
        BlobsStore::memory().await.unwrap(),
    )
    .unwrap();

    let alice = common::connect_user(&network).await;
    assert!(alice.client.fetch_public_ids().await.unwrap().is_empty());
}
