//! The session controller: one struct owning the transcript, the plan
//! document, the content store, and the assistants.
//!
//! Every mutation goes through a `Session` method. `send` takes `&mut self`,
//! so two sends can never overlap on the same session; `busy` is still
//! tracked so a UI can grey out its controls while a reply is pending.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::{info, warn};

use crate::assistant::{Assistant, ChatRequest, Message, SimulatedAssistant, UploadResponse};
use crate::export::{self, CanonicalDocument, ExportError, ExportFormat};
use crate::plan::{PlanDocument, PlanField};
use crate::store::{Concept, ConceptField, ContentStore, MatrixField, MatrixRow, StoreError};
use crate::tabular::{self, TabularContext};

/// Seed message shown after switching to live mode.
pub const LIVE_GREETING: &str = "Live mode: I'm connected to the brief assistant. Tell me about \
your campaign, or upload a media or audience plan CSV.";

/// Seed message shown after switching to simulated mode.
pub const SIMULATED_GREETING: &str = "Simulated mode: replies are generated locally and no \
assistant service is called. Useful for trying out the matrix and concept editors.";

/// Which assistant answers chat turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Simulated,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Live => Self::Simulated,
            Self::Simulated => Self::Live,
        }
    }

    pub fn greeting(self) -> &'static str {
        match self {
            Self::Live => LIVE_GREETING,
            Self::Simulated => SIMULATED_GREETING,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Live => "live",
            Self::Simulated => "simulated",
        };
        f.write_str(s)
    }
}

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "simulated" | "sim" => Ok(Self::Simulated),
            other => Err(ModeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Mode`] string.
#[derive(Debug, Clone)]
pub struct ModeParseError(pub String);

impl fmt::Display for ModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mode: {:?} (expected live or simulated)", self.0)
    }
}

impl std::error::Error for ModeParseError {}

/// Application state for one brief-authoring session.
pub struct Session {
    transcript: Vec<Message>,
    mode: Mode,
    busy: bool,
    last_error: Option<String>,
    plan: PlanDocument,
    store: ContentStore,
    live: Box<dyn Assistant>,
    simulated: Box<dyn Assistant>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("messages", &self.transcript.len())
            .field("busy", &self.busy)
            .field("live", &self.live.name())
            .field("simulated", &self.simulated.name())
            .finish()
    }
}

impl Session {
    /// Create a session with the built-in simulator for simulated mode.
    pub fn new(mode: Mode, live: Box<dyn Assistant>) -> Self {
        Self::with_assistants(mode, live, Box::new(SimulatedAssistant::new()))
    }

    pub fn with_assistants(
        mode: Mode,
        live: Box<dyn Assistant>,
        simulated: Box<dyn Assistant>,
    ) -> Self {
        Self {
            transcript: vec![Message::assistant(mode.greeting())],
            mode,
            busy: false,
            last_error: None,
            plan: PlanDocument::default(),
            store: ContentStore::new(),
            live,
            simulated,
        }
    }

    /// Replace the plan document and store, e.g. after loading a workspace.
    pub fn load(&mut self, plan: PlanDocument, store: ContentStore) {
        self.plan = plan;
        self.store = store;
    }

    // -- read access --------------------------------------------------------

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn plan(&self) -> &PlanDocument {
        &self.plan
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Canonical document assembled from a read snapshot of the store.
    pub fn canonical(&self) -> CanonicalDocument {
        export::assemble_snapshot(&self.plan, &self.store.snapshot())
    }

    /// The plan as sent to the assistant in `current_plan`.
    pub fn current_plan(&self) -> Value {
        self.plan.snapshot(&self.store)
    }

    /// Render a locally supported export format.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        export::render(&self.canonical(), format)
    }

    // -- mode ---------------------------------------------------------------

    /// Switch modes. The transcript is cleared and reseeded with a single
    /// explanatory assistant message, even when the mode is unchanged.
    pub fn set_mode(&mut self, mode: Mode) {
        info!(from = %self.mode, to = %mode, "switching session mode");
        self.mode = mode;
        self.transcript = vec![Message::assistant(mode.greeting())];
        self.last_error = None;
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    // -- conversation -------------------------------------------------------

    /// Submit a user message and wait for the reply.
    ///
    /// The user message is appended before the assistant is called. On
    /// failure no reply is appended and [`Session::last_error`] holds a short
    /// description. Blank input is ignored.
    pub async fn send(&mut self, text: &str) -> Option<&Message> {
        if text.trim().is_empty() {
            return None;
        }
        self.transcript.push(Message::user(text));
        self.busy = true;
        self.last_error = None;

        let request = ChatRequest {
            history: self.transcript.clone(),
            current_plan: self.current_plan(),
        };
        let assistant = match self.mode {
            Mode::Live => &self.live,
            Mode::Simulated => &self.simulated,
        };
        let result = assistant.reply(&request).await;
        self.busy = false;

        match result {
            Ok(reply) => {
                self.transcript.push(Message::assistant(reply));
                self.transcript.last()
            }
            Err(e) => {
                warn!(mode = %self.mode, error = %e, "assistant call failed");
                self.last_error = Some(format!("Assistant unavailable: {e}"));
                None
            }
        }
    }

    /// Handle a file picked locally.
    ///
    /// CSV files are ingested into the plan's audience context and announced
    /// to the assistant as an ordinary user turn; other files are forwarded
    /// as text.
    pub async fn ingest_upload(&mut self, filename: &str, content: &str) -> Option<&Message> {
        if tabular::looks_tabular(filename) {
            let ctx = tabular::parse(content);
            self.announce_tabular(ctx, filename).await
        } else {
            let text = document_message(filename, content);
            self.send(&text).await
        }
    }

    /// Handle a file that already went through the backend's `/upload`.
    pub async fn ingest_upload_response(&mut self, upload: UploadResponse) -> Option<&Message> {
        match upload {
            UploadResponse::AudienceMatrix {
                rows,
                headers,
                filename,
                ..
            } => {
                self.announce_tabular(TabularContext { headers, rows }, &filename)
                    .await
            }
            UploadResponse::Document { content, filename } => {
                let text = document_message(&filename, &content);
                self.send(&text).await
            }
        }
    }

    async fn announce_tabular(&mut self, ctx: TabularContext, filename: &str) -> Option<&Message> {
        info!(
            filename,
            columns = ctx.headers.len(),
            rows = ctx.rows.len(),
            "ingested tabular upload"
        );
        let summary = tabular::summarize(&ctx, filename);
        self.plan.replace_audience_context(ctx);
        self.send(&summary).await
    }

    // -- plan and store edits -----------------------------------------------

    pub fn set_plan_field(&mut self, field: PlanField, value: impl Into<String>) {
        self.plan.set_field(field, value);
    }

    pub fn add_row(&mut self) -> String {
        self.store.add_row()
    }

    pub fn update_cell(
        &mut self,
        index: usize,
        field: MatrixField,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.store.update_cell(index, field, value)
    }

    pub fn remove_row(&mut self, index: usize) -> Result<MatrixRow, StoreError> {
        self.store.remove_row(index)
    }

    pub fn remove_row_by_id(&mut self, id: &str) -> Result<MatrixRow, StoreError> {
        self.store.remove_row_by_id(id)
    }

    pub fn add_concept(&mut self) -> String {
        self.store.add_concept()
    }

    pub fn update_concept_field(
        &mut self,
        index: usize,
        field: ConceptField,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.store.update_concept_field(index, field, value)
    }

    pub fn remove_concept(&mut self, index: usize) -> Result<Concept, StoreError> {
        self.store.remove_concept(index)
    }

    pub fn remove_concept_by_id(&mut self, id: &str) -> Result<Concept, StoreError> {
        self.store.remove_concept_by_id(id)
    }
}

/// User turn carrying a non-tabular file's text.
pub fn document_message(filename: &str, content: &str) -> String {
    format!("Here is the content of \"{filename}\":\n\n{content}")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::assistant::{AssistantError, BackendError, Role};

    struct DownAssistant;

    #[async_trait]
    impl Assistant for DownAssistant {
        fn name(&self) -> &str {
            "down"
        }

        async fn reply(&self, _request: &ChatRequest) -> Result<String, AssistantError> {
            Err(BackendError::Status {
                status: 503,
                body: "maintenance".into(),
            }
            .into())
        }
    }

    fn simulated_session() -> Session {
        Session::new(Mode::Simulated, Box::new(DownAssistant))
    }

    #[test]
    fn new_session_is_seeded() {
        let session = simulated_session();
        assert_eq!(session.transcript(), &[Message::assistant(SIMULATED_GREETING)]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn simulated_send_appends_user_then_reply() {
        let mut session = simulated_session();
        let reply = session.send("Launch in Berlin").await.cloned();
        assert!(reply.is_some());

        let roles: Vec<Role> = session.transcript().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(session.transcript()[1].content, "Launch in Berlin");
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn failed_send_keeps_user_message_and_sets_error() {
        let mut session = Session::new(Mode::Live, Box::new(DownAssistant));
        assert!(session.send("hello").await.is_none());

        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[1], Message::user("hello"));
        assert!(session.last_error().unwrap().contains("503"));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn blank_send_is_ignored() {
        let mut session = simulated_session();
        assert!(session.send("   ").await.is_none());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn toggling_mode_resets_transcript() {
        let mut session = simulated_session();
        session.send("one").await;
        assert_eq!(session.toggle_mode(), Mode::Live);
        assert_eq!(session.transcript(), &[Message::assistant(LIVE_GREETING)]);
    }

    #[tokio::test]
    async fn csv_upload_replaces_audience_and_announces() {
        let mut session = simulated_session();
        session.ingest_upload("old.csv", "x\n1").await;
        session
            .ingest_upload("media.csv", "Segment,Channel\nA,tv\nB,radio")
            .await;

        assert_eq!(
            session.plan().audience_headers,
            Some(vec!["Segment".to_string(), "Channel".to_string()])
        );
        let synthetic = &session.transcript()[session.transcript().len() - 2];
        assert_eq!(synthetic.role, Role::User);
        assert!(synthetic.content.contains("Columns: Segment, Channel"));
    }

    #[tokio::test]
    async fn non_tabular_upload_is_sent_as_text() {
        let mut session = simulated_session();
        session.ingest_upload("brief.txt", "Make it pop").await;
        assert!(session.plan().audience_matrix.is_none());
        assert!(session.transcript()[1].content.contains("Make it pop"));
    }

    #[tokio::test]
    async fn current_plan_reflects_store_edits() {
        let mut session = simulated_session();
        session.set_plan_field(PlanField::CampaignName, "Oat Milk");
        session.add_row();
        session.update_cell(0, MatrixField::Channel, "email").unwrap();

        let plan = session.current_plan();
        assert_eq!(plan["campaign_name"], "Oat Milk");
        assert_eq!(plan["content_matrix"][0]["channel"], "email");
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("sim".parse::<Mode>().unwrap(), Mode::Simulated);
        assert!("offline".parse::<Mode>().is_err());
    }
}
