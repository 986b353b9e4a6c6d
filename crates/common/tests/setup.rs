//! Integration tests for account setup and the public id directory

mod common;

use ::common::auth::AppInfo;
use ::common::mail::{service_address, MailError, SetupOutcome};

#[tokio::test]
async fn test_setup_new_identity() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;

    let account = common::create_account(&alice, "alice").await;
    assert_eq!(account.id, "alice");
    assert!(!account.enc_public_key().to_hex().is_empty());

    let address = alice
        .client
        .directory()
        .lookup_service_directory("alice")
        .await
        .unwrap();
    assert_eq!(address, Some(service_address("alice")));

    let metadata = network
        .metadata(&::common::mail::service_directory(service_address("alice")).address())
        .unwrap()
        .unwrap();
    assert!(metadata.name.contains("'alice'"));
}

#[tokio::test]
async fn test_setup_twice_sees_existing_identity() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;
    common::create_account(&alice, "alice").await;

    let result = alice.client.setup_account("alice").await;
    assert!(matches!(result, Err(MailError::ServiceExists(_))));

    // still exactly one registered public id
    let ids = alice.client.fetch_public_ids().await.unwrap();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_named_service_attaches_to_existing_directory() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;
    let home = common::create_account(&alice, "alice").await;
    let work = common::create_account(&alice, "work.alice").await;

    assert_ne!(home.inbox, work.inbox);
    assert_eq!(alice.client.fetch_public_ids().await.unwrap().len(), 1);

    let mut email_ids = alice.client.fetch_email_ids().await.unwrap();
    email_ids.sort();
    assert_eq!(email_ids, vec!["alice".to_string(), "work.alice".to_string()]);

    // listing from already fetched public ids gives the same answer
    let public_ids = alice.client.fetch_public_ids().await.unwrap();
    assert_eq!(public_ids.len(), 1);
    let mut reused = alice.client.email_ids_of(&public_ids).await.unwrap();
    reused.sort();
    assert_eq!(reused, email_ids);
}

#[tokio::test]
async fn test_read_account_after_setup() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;
    let account = common::create_account(&alice, "alice").await;

    let loaded = alice.client.read_account("alice").await.unwrap();
    assert_eq!(loaded.id, "alice");
    assert_eq!(loaded.inbox, account.inbox);
    assert_eq!(loaded.archive, account.archive);
    assert_eq!(loaded.enc_public_key(), account.enc_public_key());

    assert!(matches!(
        alice.client.read_account("nobody").await,
        Err(MailError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_write_account_is_an_upsert() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;
    let account = common::create_account(&alice, "alice").await;

    // setup already wrote the config once
    alice.client.write_account(&account).await.unwrap();
    alice.client.write_account(&account).await.unwrap();

    let loaded = alice.client.read_account("alice").await.unwrap();
    assert_eq!(loaded.inbox, account.inbox);
}

#[tokio::test]
async fn test_invalid_email_id() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;
    assert!(matches!(
        alice.client.setup_account("work.").await,
        Err(MailError::InvalidEmailId(_))
    ));

    // a leading dot would alias the default service of "alice"
    common::create_account(&alice, "alice").await;
    assert!(matches!(
        alice.client.setup_account(".alice").await,
        Err(MailError::InvalidEmailId(_))
    ));
    assert_eq!(alice.client.fetch_email_ids().await.unwrap(), vec!["alice".to_string()]);
}

#[tokio::test]
async fn test_shared_directory_flow() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;
    common::create_account(&alice, "alice").await;

    // a second app on the same account holds no permissions on the
    // directory the first app created
    let other_app = AppInfo {
        id: "net.sealmail.other".to_string(),
        name: "Other Mail".to_string(),
        vendor: "Sealmail Tests".to_string(),
    };
    let other = common::connect_app(&network, &alice.authenticator, other_app).await;

    let pending = match other.client.setup_account("work.alice").await.unwrap() {
        SetupOutcome::SharePending(pending) => pending,
        SetupOutcome::Created(_) => panic!("expected a share request"),
    };
    assert_eq!(pending.service_name, "work@email");
    assert_eq!(pending.service_address, service_address("alice"));
    assert_eq!(alice.authenticator.pending(), vec![pending.request]);

    let token = alice.authenticator.approve(pending.request).await.unwrap();
    let account = other
        .client
        .connect_with_shared_md(&token, &pending)
        .await
        .unwrap();
    assert_eq!(account.id, "work.alice");

    let mut email_ids = other.client.fetch_email_ids().await.unwrap();
    email_ids.sort();
    assert_eq!(email_ids, vec!["alice".to_string(), "work.alice".to_string()]);

    // mail to the shared service reaches the new account
    let bob = common::connect_user(&network).await;
    bob.client
        .send_email(&serde_json::json!({ "subject": "shared" }), "work.alice")
        .await
        .unwrap();
    let mut subjects = Vec::new();
    other
        .client
        .read_inbox(&account, |received| {
            subjects.push(received.email.subject().unwrap_or_default().to_string())
        })
        .await
        .unwrap();
    assert_eq!(subjects, vec!["shared".to_string()]);
}
