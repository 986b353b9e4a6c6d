//! Integration tests for sending and reading mail

mod common;

use ::common::crypto::seal;
use ::common::mail::constants::MD_KEY_EMAIL_ENC_PUBLIC_KEY;
use ::common::mail::{Email, MailError, MailboxKind, ReceivedEmail};
use ::common::network::{EntryActions, Network, NetworkError};
use serde_json::json;

#[tokio::test]
async fn test_bob_receives_hi() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    assert!(!account.enc_public_key().to_hex().is_empty());

    let alice = common::connect_user(&network).await;
    alice
        .client
        .send_email(&json!({ "subject": "hi" }), "bob")
        .await
        .unwrap();

    let mut received = Vec::new();
    let report = bob
        .client
        .read_inbox(&account, |email| received.push(email))
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].email.subject(), Some("hi"));
    assert_eq!(report.delivered, 1);
    // the reserved key entry is counted but never delivered
    assert_eq!(report.total_entries, 2);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_content_round_trips() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    let sent = json!({
        "from": "alice",
        "to": "bob",
        "subject": "plans",
        "body": "dinner at eight?",
        "time": "2024-05-01T18:30:00Z",
        "attachments": [{ "name": "menu.txt", "size": 120 }],
    });
    alice.client.send_email(&sent, "bob").await.unwrap();

    let mut received: Vec<ReceivedEmail> = Vec::new();
    bob.client
        .read_inbox(&account, |email| received.push(email))
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(serde_json::to_value(&received[0].email).unwrap(), sent);
}

#[tokio::test]
async fn test_unknown_recipient() {
    let network = common::setup_network().await;
    let alice = common::connect_user(&network).await;

    let result = alice
        .client
        .send_email(&Email::new("alice", "nobody", "hello", "?"), "nobody")
        .await;
    assert!(matches!(result, Err(MailError::EmailIdNotFound(id)) if id == "nobody"));

    // a known public id with an unknown service is just as unknown
    let bob = common::connect_user(&network).await;
    common::create_account(&bob, "bob").await;
    let result = alice
        .client
        .send_email(&Email::new("alice", "work.bob", "hello", "?"), "work.bob")
        .await;
    assert!(matches!(result, Err(MailError::EmailIdNotFound(_))));
}

#[tokio::test]
async fn test_bad_entry_does_not_abort_read() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    // a pointer sealed for bob that leads nowhere, inserted the way any
    // sender could
    let bogus = seal(b"not a content address", account.enc_public_key()).unwrap();
    network
        .mutate_mdata_entries(
            &alice.client.session().app_key(),
            &account.inbox.info.address(),
            EntryActions::new().ins(b"bogus".to_vec(), bogus, 0),
        )
        .await
        .unwrap();
    alice
        .client
        .send_email(&Email::new("alice", "bob", "real", "mail"), "bob")
        .await
        .unwrap();

    let mut subjects = Vec::new();
    let report = bob
        .client
        .read_inbox(&account, |email| {
            subjects.push(email.email.subject().unwrap_or_default().to_string())
        })
        .await
        .unwrap();
    assert_eq!(subjects, vec!["real".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "bogus");
}

#[tokio::test]
async fn test_removed_entries_are_never_delivered() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    let first = alice
        .client
        .send_email(&Email::new("alice", "bob", "first", ""), "bob")
        .await
        .unwrap();
    alice
        .client
        .send_email(&Email::new("alice", "bob", "second", ""), "bob")
        .await
        .unwrap();
    bob.client
        .delete_email(&account, ::common::mail::MailboxKind::Inbox, &first)
        .await
        .unwrap();

    let mut subjects = Vec::new();
    let report = bob
        .client
        .read_inbox(&account, |email| {
            subjects.push(email.email.subject().unwrap_or_default().to_string())
        })
        .await
        .unwrap();
    assert_eq!(subjects, vec!["second".to_string()]);
    // the tombstone is still listed
    assert_eq!(report.total_entries, 3);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_sender_cannot_read_or_remove() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    let key = alice
        .client
        .send_email(&Email::new("alice", "bob", "secret", ""), "bob")
        .await
        .unwrap();

    // alice can list the public inbox but not open what she sent
    let entry = alice
        .client
        .mailboxes()
        .get(&account.inbox, key.as_bytes())
        .await
        .unwrap();
    assert!(::common::crypto::open(&entry.value, &::common::crypto::EncKeyPair::generate()).is_err());

    let result = alice
        .client
        .mailboxes()
        .remove(&account.inbox, key.as_bytes(), 1)
        .await;
    assert!(matches!(result, Err(MailError::PermissionDenied { .. })));
}

#[tokio::test]
async fn test_any_json_document_is_delivered_unchanged() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    let documents = vec![
        json!("just a string"),
        json!(42),
        json!([1, "two", null]),
        json!({ "subject": 5, "from": "", "flags": { "seen": false } }),
        json!({ "subject": "dated", "time": "2024-05-01T18:30:00.000Z" }),
        json!({ "subject": "epoch", "time": 1714588200 }),
    ];
    for document in &documents {
        alice.client.send_email(document, "bob").await.unwrap();
    }

    let mut received = Vec::new();
    let report = bob
        .client
        .read_inbox(&account, |email| received.push(email.email.into_value()))
        .await
        .unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(received.len(), documents.len());
    for document in &documents {
        assert_eq!(
            received.iter().filter(|value| *value == document).count(),
            1,
            "{} was not delivered exactly once",
            document
        );
    }
}

#[tokio::test]
async fn test_public_key_entry_is_not_mail() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    let result = bob
        .client
        .archive_email(&account, MD_KEY_EMAIL_ENC_PUBLIC_KEY)
        .await;
    assert!(matches!(result, Err(MailError::NotFound(_))));
    let result = bob
        .client
        .delete_email(&account, MailboxKind::Inbox, MD_KEY_EMAIL_ENC_PUBLIC_KEY)
        .await;
    assert!(matches!(result, Err(MailError::NotFound(_))));
    let result = bob
        .client
        .delete_email_at(&account, MailboxKind::Inbox, MD_KEY_EMAIL_ENC_PUBLIC_KEY, 1)
        .await;
    assert!(matches!(result, Err(MailError::NotFound(_))));

    // the inbox still takes mail
    alice
        .client
        .send_email(&Email::new("alice", "bob", "still open", ""), "bob")
        .await
        .unwrap();
    let mut subjects = Vec::new();
    bob.client
        .read_inbox(&account, |email| {
            subjects.push(email.email.subject().unwrap_or_default().to_string())
        })
        .await
        .unwrap();
    assert_eq!(subjects, vec!["still open".to_string()]);
    assert!(bob.client.read_archive(&account, |_| {}).await.unwrap().delivered == 0);
}

#[tokio::test]
async fn test_inbox_without_public_key_is_unknown() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    let account = common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    // removed below the mail client, which refuses to touch the entry
    bob.client
        .mailboxes()
        .remove(&account.inbox, MD_KEY_EMAIL_ENC_PUBLIC_KEY.as_bytes(), 1)
        .await
        .unwrap();

    let result = alice
        .client
        .send_email(&Email::new("alice", "bob", "hello", ""), "bob")
        .await;
    assert!(matches!(result, Err(MailError::EmailIdNotFound(id)) if id == "bob"));
}

#[tokio::test]
async fn test_send_failures_propagate() {
    let network = common::setup_network().await;
    let bob = common::connect_user(&network).await;
    common::create_account(&bob, "bob").await;
    let alice = common::connect_user(&network).await;

    network.disconnect();
    let result = alice
        .client
        .send_email(&Email::new("alice", "bob", "hello", ""), "bob")
        .await;
    assert!(matches!(
        result,
        Err(MailError::Network(NetworkError::Disconnected))
    ));
    network.reconnect().await.unwrap();

    alice
        .authenticator
        .revoke(&common::app_info())
        .await
        .unwrap();
    let result = alice
        .client
        .send_email(&Email::new("alice", "bob", "hello", ""), "bob")
        .await;
    assert!(matches!(result, Err(MailError::StaleAuthorization)));
}
