use ratatui::widgets::ListState;
use tracing::{debug, info, warn};

use crate::config::{Config, Settings};
use crate::conversation::{Conversation, RequestState, Submission};
use crate::ollama::OllamaClient;
use crate::orchestrator::{Continuation, Orchestrator};

pub struct App {
    // Core state
    pub should_quit: bool,
    pub conversation: Conversation,

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_tail: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // Persist picker choices to the config file
    pub remember_model: bool,

    ollama: OllamaClient,
    orchestrator: Orchestrator<Conversation>,
}

impl App {
    pub fn new(settings: &Settings, orchestrator: Orchestrator<Conversation>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(&settings.base_url, settings.preferred_model.clone()),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,

            animation_frame: 0,

            show_model_picker: false,
            model_picker_state: ListState::default(),

            remember_model: true,

            ollama: OllamaClient::new(settings),
            orchestrator,
        }
    }

    /// Kick off the version probe and the first model listing.
    pub fn start(&mut self) {
        let ollama = self.ollama.clone();
        self.orchestrator.dispatch(
            "version",
            async move { ollama.check_version().await },
            |conv: &mut Conversation, result| conv.apply_version_probe(result),
        );
        self.refresh_models();
    }

    /// Fetch the catalog again. Runs independently of any pending chat.
    /// Only the latest fetch is applied; slower earlier ones are dropped.
    pub fn refresh_models(&mut self) {
        let generation = self.conversation.begin_catalog_load();
        let ollama = self.ollama.clone();
        self.orchestrator.dispatch(
            "list_models",
            async move { ollama.list_models().await },
            move |conv: &mut Conversation, result| conv.finish_catalog_load(generation, result),
        );
    }

    pub fn submit(&mut self) {
        match self.conversation.submit() {
            Submission::Dispatch(request) => {
                info!(model = %request.model, "chat request dispatched");
                let ollama = self.ollama.clone();
                self.orchestrator.dispatch(
                    "chat",
                    async move { ollama.chat(&request.model, &request.text).await },
                    |conv: &mut Conversation, result| conv.complete_chat(result),
                );
                self.animation_frame = 0;
                self.follow_tail = true;
                self.scroll_chat_to_bottom();
            }
            Submission::Rejected => {
                self.follow_tail = true;
                self.scroll_chat_to_bottom();
            }
            Submission::Ignored => {}
        }
    }

    /// Apply a finished background call. Only ever called from the UI task.
    pub fn apply(&mut self, continuation: Continuation<Conversation>) {
        continuation(&mut self.conversation);
        debug!(messages = self.conversation.transcript().len(), "applied completion");
        if self.follow_tail {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.conversation.state() == RequestState::Pending
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Lines the transcript occupies at the current wrap width.
    pub fn transcript_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.conversation.transcript().messages() {
            total_lines = total_lines.saturating_add(1); // Sender line
            for line in msg.text().lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { (char_count / wrap_width) + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.is_waiting() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        total_lines
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_lines().saturating_sub(visible_height)
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll >= max;
    }

    pub fn follow(&mut self) {
        self.follow_tail = true;
        self.scroll_chat_to_bottom();
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        let models = self.conversation.catalog().models();
        if models.is_empty() {
            return;
        }
        let current = self
            .conversation
            .catalog()
            .selected_model()
            .and_then(|name| models.iter().position(|m| m == name))
            .unwrap_or(0);
        self.model_picker_state.select(Some(current));
        self.show_model_picker = true;
    }

    pub fn close_model_picker(&mut self) {
        self.show_model_picker = false;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.conversation.catalog().models().len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        let picked = self
            .model_picker_state
            .selected()
            .and_then(|i| self.conversation.catalog().models().get(i).cloned());

        if let Some(model) = picked {
            if self.conversation.select_model(&model) {
                info!(%model, "model selected");
                if self.remember_model {
                    if let Err(e) = Config::save_default_model(&model) {
                        warn!(error = %e, "could not save default model");
                    }
                }
            }
        }
        self.show_model_picker = false;
    }
}
