//! Conversation state: transcript, model catalog, input and request lifecycle.
//!
//! All mutation goes through the transition methods here and happens on the
//! UI task. Network results arrive as orchestrator continuations that call
//! [`Conversation::complete_chat`], [`Conversation::apply_catalog`] or
//! [`Conversation::apply_version_probe`].

use tracing::{debug, info, warn};

use crate::error::TransportError;

pub const WELCOME: &str = "Welcome to Ollama Chat! Type your message and press Enter to send.";
pub const NO_MODEL: &str =
    "Please ensure you have at least one model downloaded and Ollama is running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "AI",
            Sender::System => "System",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: Sender,
    text: String,
}

impl Message {
    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only message log. Insertion order is display order.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.messages.push(Message {
            sender,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// What the model picker currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No list-models result yet.
    Loading,
    Model(String),
    /// The server answered with an empty catalog.
    NoModels,
    /// The list-models call failed.
    Error(String),
}

impl Selection {
    pub fn label(&self) -> String {
        match self {
            Selection::Loading => "Loading models...".to_string(),
            Selection::Model(name) => name.clone(),
            Selection::NoModels => "No models available".to_string(),
            Selection::Error(reason) => format!("Error loading models ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<String>,
    selection: Selection,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            selection: Selection::Loading,
        }
    }
}

impl ModelCatalog {
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The model a chat request would go to, if the selection is usable.
    pub fn selected_model(&self) -> Option<&str> {
        match &self.selection {
            Selection::Model(name) => Some(name),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|m| m == name)
    }

    /// Keep the current pick if it survived, else the preferred model, else
    /// the first entry.
    fn replace(&mut self, models: Vec<String>, preferred: Option<&str>) {
        let keep = self
            .selected_model()
            .filter(|current| models.iter().any(|m| m == current))
            .map(str::to_string);
        let preferred = preferred
            .filter(|p| models.iter().any(|m| m == p))
            .map(str::to_string);

        self.selection = match keep.or(preferred).or_else(|| models.first().cloned()) {
            Some(name) => Selection::Model(name),
            None => Selection::NoModels,
        };
        self.models = models;
    }

    fn fail(&mut self, reason: String) {
        self.models.clear();
        self.selection = Selection::Error(reason);
    }

    fn select(&mut self, name: &str) -> bool {
        if self.contains(name) {
            self.selection = Selection::Model(name.to_string());
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Unknown,
    Reachable { version: String },
    Unreachable,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Multi-line text being composed, with a cursor counted in characters.
#[derive(Debug, Default)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn newline(&mut self) {
        self.insert('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// A chat request the caller must hand to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input, or a request is already in flight. Nothing changed.
    Ignored,
    /// No usable model; a System message explains why.
    Rejected,
    Dispatch(ChatRequest),
}

#[derive(Debug)]
pub struct Conversation {
    transcript: Transcript,
    catalog: ModelCatalog,
    state: RequestState,
    input: InputBuffer,
    server: ServerStatus,
    preferred_model: Option<String>,
    base_url: String,
    // Bumped per catalog fetch; older results are dropped
    catalog_generation: u64,
}

impl Conversation {
    pub fn new(base_url: impl Into<String>, preferred_model: Option<String>) -> Self {
        let mut transcript = Transcript::default();
        transcript.push(Sender::System, WELCOME);

        Self {
            transcript,
            catalog: ModelCatalog::default(),
            state: RequestState::Idle,
            input: InputBuffer::default(),
            server: ServerStatus::Unknown,
            preferred_model,
            base_url: base_url.into(),
            catalog_generation: 0,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn server(&self) -> &ServerStatus {
        &self.server
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn accepts_input(&self) -> bool {
        self.state == RequestState::Idle
    }

    /// Editable input, or `None` while a request is pending.
    pub fn input_mut(&mut self) -> Option<&mut InputBuffer> {
        if self.accepts_input() {
            Some(&mut self.input)
        } else {
            None
        }
    }

    /// Idle -> Pending when the input is non-blank and a model is selected.
    pub fn submit(&mut self) -> Submission {
        if self.state == RequestState::Pending || self.input.is_blank() {
            return Submission::Ignored;
        }

        let Some(model) = self.catalog.selected_model().map(str::to_string) else {
            warn!(selection = ?self.catalog.selection(), "submit without a usable model");
            self.transcript.push(Sender::System, NO_MODEL);
            return Submission::Rejected;
        };

        let text = self.input.text().trim().to_string();
        self.transcript.push(Sender::User, text.clone());
        self.input.clear();
        self.state = RequestState::Pending;

        Submission::Dispatch(ChatRequest { model, text })
    }

    /// Pending -> Idle. The reply or error is appended before input reopens.
    pub fn complete_chat(&mut self, result: Result<String, TransportError>) {
        match result {
            Ok(reply) => self.transcript.push(Sender::Assistant, reply),
            Err(err) => {
                warn!(error = %err, status = ?err.status(), "chat request failed");
                self.transcript.push(Sender::System, err.to_string());
            }
        }
        self.state = RequestState::Idle;
    }

    pub fn apply_catalog(&mut self, result: Result<Vec<String>, TransportError>) {
        match result {
            Ok(models) => {
                info!(count = models.len(), "model catalog loaded");
                self.catalog.replace(models, self.preferred_model.as_deref());
            }
            Err(err) => {
                warn!(error = %err, "model catalog failed to load");
                self.catalog.fail(err.to_string());
            }
        }
    }

    /// Mark a new catalog fetch as the latest. Pass the returned generation
    /// to [`Conversation::finish_catalog_load`].
    pub fn begin_catalog_load(&mut self) -> u64 {
        self.catalog_generation += 1;
        self.catalog_generation
    }

    pub fn finish_catalog_load(
        &mut self,
        generation: u64,
        result: Result<Vec<String>, TransportError>,
    ) {
        if generation != self.catalog_generation {
            debug!(generation, latest = self.catalog_generation, "dropping stale model catalog");
            return;
        }
        self.apply_catalog(result);
    }

    pub fn apply_version_probe(&mut self, result: Result<String, TransportError>) {
        match result {
            Ok(version) => {
                info!(%version, "ollama reachable");
                self.server = ServerStatus::Reachable { version };
            }
            Err(err) => {
                self.server = ServerStatus::Unreachable;
                self.transcript.push(
                    Sender::System,
                    format!(
                        "Warning: Could not connect to Ollama at {}/api/version ({}). Make sure Ollama is running.",
                        self.base_url, err
                    ),
                );
            }
        }
    }

    /// Pick from the catalog. Unknown names are ignored.
    pub fn select_model(&mut self, name: &str) -> bool {
        self.catalog.select(name)
    }
}
