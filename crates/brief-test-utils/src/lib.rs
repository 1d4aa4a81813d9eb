//! Shared fixtures for briefsmith integration tests.
//!
//! Provides sample uploads, a populated plan and store, and two stand-in
//! assistants: [`ScriptedAssistant`] replays canned replies and records every
//! request it sees, [`FailingAssistant`] always errors.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use brief_core::assistant::{Assistant, AssistantError, BackendError, ChatRequest};
use brief_core::plan::PlanDocument;
use brief_core::store::{ConceptField, ContentStore, MatrixField};

/// A small media plan with a blank header and a trailing empty line.
pub const SAMPLE_MEDIA_CSV: &str = "\
Segment,Channel,,Budget
Students,TikTok,vertical,1200
Parents,Email,,800
Retirees,Print,broadsheet,450

";

/// An audience file with a short row and an all-empty row.
pub const SAMPLE_AUDIENCE_CSV: &str = "\
name,age
Ada,36
,
Grace,
";

/// A plan document with every narrative field set.
pub fn sample_plan() -> PlanDocument {
    PlanDocument {
        campaign_name: "Spring Launch".to_string(),
        single_minded_proposition: "Fresh starts taste better".to_string(),
        narrative_brief: "Reach commuters before work.\nKeep it warm.".to_string(),
        ..PlanDocument::default()
    }
}

/// A store with two matrix rows and one concept attached to the first row.
pub fn populated_store() -> ContentStore {
    let mut store = ContentStore::new();
    store.add_row();
    store
        .update_cell(0, MatrixField::AudienceSegment, "Commuters")
        .expect("row 0 exists");
    store
        .update_cell(0, MatrixField::Channel, "Radio")
        .expect("row 0 exists");
    store.add_row();
    store
        .update_cell(1, MatrixField::AudienceSegment, "Students")
        .expect("row 1 exists");
    store
        .update_cell(1, MatrixField::Message, "Study fuel")
        .expect("row 1 exists");
    store.add_concept();
    store
        .update_concept_field(0, ConceptField::Title, "Sunrise")
        .expect("concept 0 exists");
    store
}

// ---------------------------------------------------------------------------
// Assistants
// ---------------------------------------------------------------------------

/// Replays canned replies in order and records each request.
///
/// Clones share state, so a test can keep one handle after boxing another
/// into a session. Once the script runs out, replies echo the last user
/// message.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAssistant {
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedAssistant {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(Into::into).collect())),
            requests: Arc::default(),
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn reply(&self, request: &ChatRequest) -> Result<String, AssistantError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let next = self.replies.lock().expect("replies lock").pop_front();
        Ok(next.unwrap_or_else(|| {
            let last = request
                .last_user_message()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            format!("echo: {last}")
        }))
    }
}

/// Always fails as if the backend answered with the given status.
#[derive(Debug, Clone)]
pub struct FailingAssistant {
    pub status: u16,
}

impl Default for FailingAssistant {
    fn default() -> Self {
        Self { status: 502 }
    }
}

#[async_trait]
impl Assistant for FailingAssistant {
    fn name(&self) -> &str {
        "failing"
    }

    async fn reply(&self, _request: &ChatRequest) -> Result<String, AssistantError> {
        Err(BackendError::Status {
            status: self.status,
            body: "upstream unavailable".to_string(),
        }
        .into())
    }
}
