//! End-to-end engine tests: inbound text in, gateway traffic out.

mod common;

use common::{test_state, RecordingGateway, Sent};
use std::sync::atomic::Ordering;

use kaiwa::commands::ResponsePayload;
use kaiwa::quiz::{QuizQuestion, QuizStart};

fn question() -> QuizQuestion {
    QuizQuestion {
        prompt: "Capitale du Japon ?".to_string(),
        choices: vec![
            ("A".to_string(), "Osaka".to_string()),
            ("B".to_string(), "Tokyo".to_string()),
        ],
        correct_key: "B".to_string(),
        explanation: "Tokyo est la capitale depuis 1868.".to_string(),
    }
}

#[tokio::test]
async fn quiz_answer_scenario() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway);

    assert!(matches!(
        state.quiz.start("u1", question()),
        QuizStart::Opened(_)
    ));

    // Correct answer within the window: verdict plus explanation.
    let reply = state.handle("u1", "B").await;
    match reply {
        ResponsePayload::Text(text) => {
            assert!(text.contains("Bonne réponse"));
            assert!(text.contains("Tokyo est la capitale"));
        }
        other => panic!("expected text verdict, got {other:?}"),
    }
    assert!(!state.quiz.has_open("u1"));

    // A later duplicate answer with no new quiz.
    let reply = state.handle("u1", "B").await;
    assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("Aucun quiz actif")));
}

#[tokio::test]
async fn quiz_session_is_per_user() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway);

    state.quiz.start("u1", question());
    // Another user's message must not touch u1's session.
    state.handle("u2", "B").await;
    assert!(state.quiz.has_open("u1"));
}

#[tokio::test]
async fn memory_ring_is_bounded_through_handle() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway);

    for i in 0..15 {
        state.handle("u1", &format!("message numéro {i}")).await;
    }
    let entries = state.memory.entries_for("u1");
    assert!(entries.len() <= state.memory.capacity());
    // The newest inbound message is the last entry.
    assert!(entries.last().unwrap().content.contains("numéro 14"));
}

#[tokio::test]
async fn admin_can_wipe_one_users_memory() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway);

    state.handle("u1", "bonjour").await;
    state.handle("u2", "salut").await;

    let reply = state.handle("admin1", "/admin reset-memory u1").await;
    assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("u1")));
    assert!(state.memory.entries_for("u1").is_empty());
    assert!(!state.memory.entries_for("u2").is_empty());

    // Unknown target reports nothing-to-clear rather than success.
    let reply = state.handle("admin1", "/admin reset-memory nobody").await;
    assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("Aucune conversation")));
}

#[tokio::test]
async fn admin_broadcast_end_to_end() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway.clone());

    // Seed recipients by having them talk to the bot.
    state.handle("u1", "salut bot").await;
    state.handle("u2", "bonjour").await;
    state.handle("admin1", "/help").await;
    let before = gateway.send_count();

    let reply = state.handle("admin1", "/broadcast Mise à jour dispo !").await;
    match reply {
        ResponsePayload::Text(text) => {
            assert!(text.contains("BROADCAST TERMINÉ"));
            assert!(text.contains("Envoyés : 3"));
        }
        other => panic!("expected report, got {other:?}"),
    }
    assert_eq!(gateway.send_count() - before, 3);

    // Second identical trigger inside the cool-down is suppressed,
    // and nothing more is sent.
    let reply = state.handle("admin1", "/broadcast Mise à jour dispo !").await;
    assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("identique")));
    assert_eq!(gateway.send_count() - before, 3);
}

#[tokio::test]
async fn broadcast_counts_blocked_recipient_as_error() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway.clone());

    state.handle("u1", "salut").await;
    state.handle("u2", "salut aussi").await;
    *gateway.fail_recipient.lock().unwrap() = Some("u1".to_string());

    let reply = state.handle("admin1", "/broadcast hello").await;
    match reply {
        ResponsePayload::Text(text) => {
            assert!(text.contains("Erreurs : 1"), "report was: {text}");
        }
        other => panic!("expected report, got {other:?}"),
    }
}

#[tokio::test]
async fn non_admin_broadcast_is_denied() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway);

    let reply = state.handle("u1", "/broadcast pwned").await;
    assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("Accès refusé")));
}

#[tokio::test]
async fn image_reply_falls_back_to_caption_on_failure() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway.clone());
    gateway.fail_images.store(true, Ordering::SeqCst);

    state.handle_and_deliver("u1", "/image a cute cat").await;

    let texts = gateway.texts_to("u1");
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("a cute cat"));
    // No image record, only the caption fallback.
    assert!(gateway
        .sent
        .lock()
        .unwrap()
        .iter()
        .all(|s| matches!(s, Sent::Text { .. })));
}

#[tokio::test]
async fn image_reply_is_delivered_as_image() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway.clone());

    state.handle_and_deliver("u1", "/image a red fox in snow").await;

    let sent = gateway.sent.lock().unwrap();
    assert!(matches!(
        &sent[0],
        Sent::Image { url, .. } if url.contains("pollinations")
    ));
}

#[tokio::test]
async fn free_chat_without_backends_degrades_to_canned_reply() {
    let gateway = RecordingGateway::new();
    let state = test_state(gateway);

    let reply = state.handle("u1", "raconte moi un truc").await;
    assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("petit bug")));
}
