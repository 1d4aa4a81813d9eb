//! Session behaviour with stand-in assistants.

use brief_core::assistant::{Role, UploadResponse};
use brief_core::channel::{LIVE_GREETING, Mode, SIMULATED_GREETING, Session};
use brief_core::plan::PlanField;
use brief_core::store::MatrixField;
use brief_test_utils::{FailingAssistant, SAMPLE_MEDIA_CSV, ScriptedAssistant};

fn live_session(assistant: &ScriptedAssistant) -> Session {
    Session::new(Mode::Live, Box::new(assistant.clone()))
}

#[tokio::test]
async fn upload_summary_precedes_reply() {
    let assistant = ScriptedAssistant::new(["Nice plan."]);
    let mut session = live_session(&assistant);

    session.ingest_upload("media.csv", SAMPLE_MEDIA_CSV).await;

    // The assistant saw the synthetic message as the last history entry.
    let requests = assistant.requests();
    assert_eq!(requests.len(), 1);
    let seen = requests[0].history.last().unwrap();
    assert_eq!(seen.role, Role::User);
    assert!(seen.content.contains("Columns: Segment, Channel, col_2, Budget"));
    assert!(seen.content.contains("\"Segment\": \"Students\""));

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1], *seen);
    assert_eq!(transcript[2].content, "Nice plan.");
}

#[tokio::test]
async fn upload_context_travels_in_current_plan() {
    let assistant = ScriptedAssistant::default();
    let mut session = live_session(&assistant);

    session.ingest_upload("audience.CSV", "Segment\nStudents").await;

    let plan = &assistant.requests()[0].current_plan;
    assert_eq!(plan["audience_headers"][0], "Segment");
    assert_eq!(plan["audience_matrix"][0]["Segment"], "Students");
}

#[tokio::test]
async fn backend_processed_upload_is_announced_the_same_way() {
    let assistant = ScriptedAssistant::default();
    let mut session = live_session(&assistant);

    let upload = UploadResponse::from_file("media.csv", "a,b\n1,2");
    session.ingest_upload_response(upload).await;

    assert_eq!(
        session.plan().audience_headers,
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert!(session.transcript()[1].content.contains("Columns: a, b"));
}

#[tokio::test]
async fn history_grows_across_turns() {
    let assistant = ScriptedAssistant::new(["first", "second"]);
    let mut session = live_session(&assistant);

    session.send("hello").await;
    session.send("again").await;

    let requests = assistant.requests();
    assert_eq!(requests[0].history.len(), 2);
    assert_eq!(requests[1].history.len(), 4);
    assert_eq!(requests[1].history[2].content, "first");
}

#[tokio::test]
async fn edits_are_visible_to_the_next_turn() {
    let assistant = ScriptedAssistant::default();
    let mut session = live_session(&assistant);

    session.set_plan_field(PlanField::SingleMindedProposition, "Less is more");
    let id = session.add_row();
    session.update_cell(0, MatrixField::Format, "6s bumper").unwrap();
    session.send("what do you think?").await;

    let plan = &assistant.requests()[0].current_plan;
    assert_eq!(plan["single_minded_proposition"], "Less is more");
    assert_eq!(plan["content_matrix"][0]["asset_id"], id.as_str());
    assert_eq!(plan["content_matrix"][0]["format"], "6s bumper");
}

#[tokio::test]
async fn failure_is_reported_and_session_recovers() {
    let mut session = Session::new(Mode::Live, Box::new(FailingAssistant { status: 504 }));

    assert!(session.send("ping").await.is_none());
    assert!(session.last_error().unwrap().contains("504"));
    assert!(!session.is_busy());

    // Simulated mode still works, and the error clears on the next success.
    session.set_mode(Mode::Simulated);
    assert!(session.last_error().is_none());
    assert!(session.send("ping").await.is_some());
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn mode_switch_reseeds_transcript() {
    let assistant = ScriptedAssistant::default();
    let mut session = live_session(&assistant);
    assert_eq!(session.transcript()[0].content, LIVE_GREETING);

    session.send("one").await;
    session.send("two").await;
    assert_eq!(session.toggle_mode(), Mode::Simulated);

    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.transcript()[0].role, Role::Assistant);
    assert_eq!(session.transcript()[0].content, SIMULATED_GREETING);
}

#[tokio::test]
async fn removing_by_id_survives_reordering() {
    let assistant = ScriptedAssistant::default();
    let mut session = live_session(&assistant);

    let first = session.add_row();
    let second = session.add_row();
    session.remove_row(0).unwrap();
    let third = session.add_row();

    let removed = session.remove_row_by_id(&second).unwrap();
    assert_eq!(removed.id, second);
    let ids: Vec<&str> = session.store().rows().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![third.as_str()]);
    assert_ne!(first, third);
}
