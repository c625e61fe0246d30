mod common;

use common::Fixture;
use crypto_core::{DecryptResult, FallbackReason};
use messenger_service::{
    config::MessageLimits,
    error::AppError,
    metrics,
    models::{HistoryQuery, SendMessageRequest},
};

fn text(t: &str) -> SendMessageRequest {
    SendMessageRequest {
        text: Some(t.to_string()),
        ..Default::default()
    }
}

fn page(limit: Option<i64>, offset: Option<i64>) -> HistoryQuery {
    HistoryQuery { limit, offset }
}

#[tokio::test]
async fn test_send_stores_envelope_and_returns_plaintext() {
    let f = Fixture::with_chat();

    let sent = f.service.send_message(1, 1, text("hello")).await.unwrap();
    assert!(sent.created);
    assert_eq!(sent.message.text.as_deref(), Some("hello"));
    assert_eq!(sent.message.sender_name.as_deref(), Some("Alice"));
    assert_eq!(sent.message.message_type, "text");

    let stored = f.repo.stored_text(sent.message.id).unwrap();
    assert_ne!(stored, "hello");
    assert_eq!(
        f.cipher.decrypt(&stored),
        DecryptResult::Plaintext("hello".into())
    );
}

#[tokio::test]
async fn test_send_increments_unread_for_others_only() {
    let f = Fixture::with_chat();

    f.service.send_message(1, 1, text("one")).await.unwrap();
    f.service.send_message(1, 1, text("two")).await.unwrap();

    assert_eq!(f.repo.unread(1, 2), Some(2));
    assert_eq!(f.repo.unread(1, 1), Some(0));

    f.service.mark_read(2, 1).await.unwrap();
    assert_eq!(f.repo.unread(1, 2), Some(0));
}

#[tokio::test]
async fn test_attachment_only_message_has_no_text() {
    let f = Fixture::with_chat();
    let request = SendMessageRequest {
        file_url: Some("/uploads/a.png".into()),
        file_name: Some("a.png".into()),
        file_size: Some(1024),
        file_type: Some("image/png".into()),
        message_type: Some("file".into()),
        ..Default::default()
    };

    let sent = f.service.send_message(1, 1, request).await.unwrap();
    assert_eq!(sent.message.text, None);
    assert_eq!(sent.message.message_type, "file");
    assert_eq!(f.repo.stored_text(sent.message.id), None);
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let f = Fixture::with_chat();
    let err = f
        .service
        .send_message(1, 1, SendMessageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyMessage));
    assert_eq!(f.repo.message_count(), 0);
}

#[tokio::test]
async fn test_non_participant_cannot_send_or_read() {
    let f = Fixture::with_chat();

    let err = f.service.send_message(3, 1, text("hi")).await.unwrap_err();
    assert!(matches!(err, AppError::NotParticipant));

    let err = f
        .service
        .get_messages(3, 1, page(None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotParticipant));

    let err = f
        .service
        .search_messages(3, 1, Some("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotParticipant));
}

#[tokio::test]
async fn test_duplicate_client_message_id_is_not_inserted_twice() {
    let f = Fixture::with_chat();
    let request = SendMessageRequest {
        client_message_id: Some("5b0e1c52-7a59-4d0c-9a55-0d9f2b8a7e11".into()),
        ..text("replayed")
    };

    let first = f.service.send_message(1, 1, request.clone()).await.unwrap();
    let second = f.service.send_message(1, 1, request).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.message.id, second.message.id);
    assert_eq!(second.message.text.as_deref(), Some("replayed"));
    assert_eq!(f.repo.message_count(), 1);
    assert_eq!(f.repo.unread(1, 2), Some(1));
}

#[tokio::test]
async fn test_history_is_ascending_and_decrypted() {
    let f = Fixture::with_chat();
    for t in ["first", "second", "third"] {
        f.service.send_message(2, 1, text(t)).await.unwrap();
    }

    let messages = f.service.get_messages(1, 1, page(None, None)).await.unwrap();
    let texts: Vec<_> = messages.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, ["first", "second", "third"]);

    let messages = f
        .service
        .get_messages(1, 1, page(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_negative_offset_rejected() {
    let f = Fixture::with_chat();
    let err = f
        .service
        .get_messages(1, 1, page(None, Some(-1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_legacy_plaintext_rows_pass_through() {
    let f = Fixture::with_chat();
    f.repo.insert_raw(1, 2, "written before encryption");
    f.service.send_message(1, 1, text("encrypted")).await.unwrap();

    let messages = f.service.get_messages(1, 1, page(None, None)).await.unwrap();
    let texts: Vec<_> = messages.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, ["written before encryption", "encrypted"]);
}

#[tokio::test]
async fn test_tampered_envelope_returned_as_stored() {
    let f = Fixture::with_chat();
    let sent = f.service.send_message(1, 1, text("secret")).await.unwrap();

    // Same length, different ciphertext byte
    let stored = f.repo.stored_text(sent.message.id).unwrap();
    let other = f.cipher.encrypt(Some("secreT")).unwrap().unwrap();
    assert_eq!(stored.len(), other.len());
    let tampered = format!("{}{}", &stored[..16], &other[16..]);
    f.repo.set_stored_text(sent.message.id, &tampered);

    let before = metrics::decrypt_fallback_count(FallbackReason::AuthenticationFailed);
    let messages = f.service.get_messages(2, 1, page(None, None)).await.unwrap();
    assert_eq!(messages[0].text.as_deref(), Some(tampered.as_str()));
    assert!(metrics::decrypt_fallback_count(FallbackReason::AuthenticationFailed) > before);
}

#[tokio::test]
async fn test_search_rejects_short_queries() {
    let f = Fixture::with_chat();
    for q in [None, Some(""), Some("a"), Some("я")] {
        let err = f.service.search_messages(1, 1, q).await.unwrap_err();
        assert!(matches!(err, AppError::SearchQueryTooShort { min_len: 2 }));
    }
}

#[tokio::test]
async fn test_search_matches_decrypted_text_case_insensitively() {
    let f = Fixture::with_chat();
    f.service.send_message(1, 1, text("Meeting at noon")).await.unwrap();
    f.service.send_message(2, 1, text("lunch?")).await.unwrap();
    f.service.send_message(2, 1, text("the MEETING moved")).await.unwrap();
    f.repo.insert_raw(1, 1, "legacy meeting notes");

    let results = f
        .service
        .search_messages(1, 1, Some("meeting"))
        .await
        .unwrap();
    let texts: Vec<_> = results.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(
        texts,
        ["legacy meeting notes", "the MEETING moved", "Meeting at noon"]
    );
}

#[tokio::test]
async fn test_search_caps_results() {
    let f = Fixture::with_chat();
    for i in 0..60 {
        f.service
            .send_message(1, 1, text(&format!("match {i}")))
            .await
            .unwrap();
    }

    let results = f.service.search_messages(1, 1, Some("match")).await.unwrap();
    assert_eq!(results.len(), 50);
    assert_eq!(results[0].text.as_deref(), Some("match 59"));
}

#[tokio::test]
async fn test_search_only_scans_recent_window() {
    let f = Fixture::with_limits(MessageLimits {
        search_window: 3,
        ..MessageLimits::default()
    });
    f.repo.add_user(1, "Alice");
    f.repo.add_participant(1, 1);

    f.service.send_message(1, 1, text("old needle")).await.unwrap();
    for t in ["a1", "a2", "a3"] {
        f.service.send_message(1, 1, text(t)).await.unwrap();
    }

    let results = f.service.search_messages(1, 1, Some("needle")).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_reactions_replace_and_remove() {
    let f = Fixture::with_chat();
    let sent = f.service.send_message(1, 1, text("react to me")).await.unwrap();
    let id = sent.message.id;

    f.service.add_reaction(2, id, Some("👍")).await.unwrap();
    f.service.add_reaction(2, id, Some("❤️")).await.unwrap();
    assert_eq!(f.repo.reaction(id, 2).as_deref(), Some("❤️"));

    f.service.remove_reaction(2, id).await.unwrap();
    assert_eq!(f.repo.reaction(id, 2), None);

    let err = f.service.add_reaction(2, id, None).await.unwrap_err();
    assert!(matches!(err, AppError::ReactionMissing));
    let err = f.service.add_reaction(2, id, Some("  ")).await.unwrap_err();
    assert!(matches!(err, AppError::ReactionMissing));

    let err = f.service.add_reaction(2, 999, Some("👍")).await.unwrap_err();
    assert!(matches!(err, AppError::MessageNotFound));
}

#[tokio::test]
async fn test_delete_permissions() {
    let f = Fixture::with_chat();
    f.repo.add_admin(9, "Admin");
    let a = f.service.send_message(1, 1, text("mine")).await.unwrap();
    let b = f.service.send_message(1, 1, text("also mine")).await.unwrap();

    let err = f.service.delete_message(2, a.message.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotMessageOwner));

    f.service.delete_message(1, a.message.id).await.unwrap();
    f.service.delete_message(9, b.message.id).await.unwrap();
    assert_eq!(f.repo.message_count(), 0);

    let err = f.service.delete_message(1, a.message.id).await.unwrap_err();
    assert!(matches!(err, AppError::MessageNotFound));
}
