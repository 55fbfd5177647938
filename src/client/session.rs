//! # Collaboration Session
//!
//! Glue for one pairing session: the sync controller, the chat reconciler and
//! the external services, driven by a single cooperative loop.
//!
//! ## Event Loop
//!
//! [`CollabSession::run`] selects over four sources:
//!
//! - transport events from the relay connection
//! - commands from the user interface
//! - results of HTTP calls, which run in spawned tasks and report back
//! - the partner notice deadline
//!
//! Document, chat and surface state are only touched from this loop, so
//! nothing here needs a lock.
//!
//! ## Output
//!
//! The loop reports what the UI should show through an unbounded channel of
//! [`SessionEvent`]s.

use crate::client::chat::{route_input, ChatReceipt, ChatReconciler, ChatRoute};
use crate::client::config::SessionConfig;
use crate::client::controller::{SyncController, SyncStatus};
use crate::client::identity::identity_hint;
use crate::client::services::{
    select_test_cases, AssistantContext, ExecutionReport, Question, ServiceClient, ServiceError,
};
use crate::client::surface::{EditorSurface, TextBuffer};
use crate::client::transport::{relay_endpoint, RelayTransport, TransportEvent, WsTransport};
use crate::shared::crdt::EditOp;
use crate::shared::language::Language;
use crate::shared::message::{ChatMessage, PartnerNotice};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Input from the user interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// One user edit on the surface, regions in pre-edit coordinates
    Edit(Vec<EditOp>),
    /// Type text at the end of the surface
    Append(String),
    /// A line typed into the chat input
    Chat(String),
    SetLanguage(Language),
    DismissNotice,
    LoadQuestion(String),
    /// Run the current code against the question's test cases
    Run,
    Quit,
}

/// What the user interface should reflect
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(SyncStatus),
    /// Shared buffer content after a change
    Document(String),
    /// New entry appended to the chat panel
    ChatEntry(ChatMessage),
    /// Entry at this index is now delivered
    ChatDelivered(usize),
    /// Partner notice shown (`Some`) or cleared (`None`)
    Notice(Option<PartnerNotice>),
    PeerLeft,
    Question(Question),
    Execution(ExecutionReport),
}

enum ServiceOutcome {
    Question(Result<Question, ServiceError>),
    Execution(ExecutionReport),
    Assistant(String),
}

/// One pairing session
pub struct CollabSession<T> {
    controller: SyncController<T, TextBuffer>,
    chat: ChatReconciler,
    services: ServiceClient,
    question: Option<Question>,
    question_id: Option<String>,
    service_tx: mpsc::UnboundedSender<ServiceOutcome>,
    service_rx: Option<mpsc::UnboundedReceiver<ServiceOutcome>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    last_status: Option<SyncStatus>,
    last_content: String,
    last_notice: Option<PartnerNotice>,
    published_entries: usize,
}

impl CollabSession<WsTransport> {
    /// Build a session from configuration and start connecting
    ///
    /// If a relay parameter is missing the session still starts, with a
    /// `Blocked` status and no connection.
    pub fn connect(
        config: &SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let missing = config.missing_connection_fields();
        let room_id = config.app.room_id.clone().unwrap_or_default();
        let token = config.app.auth_token.clone().unwrap_or_default();

        let (transport, transport_events, failure) = if missing.is_empty() {
            let relay_url = config.app.relay_url.as_deref().unwrap_or_default();
            match relay_endpoint(relay_url, &token) {
                Ok(url) => {
                    let (transport, rx) = WsTransport::connect(url);
                    (transport, rx, None)
                }
                Err(e) => {
                    let (transport, rx) = WsTransport::detached();
                    (transport, rx, Some(e.to_string()))
                }
            }
        } else {
            let (transport, rx) = WsTransport::detached();
            (transport, rx, None)
        };

        let mut controller =
            SyncController::new(transport, TextBuffer::new(), room_id, config.language);
        if !missing.is_empty() {
            controller.block(&missing);
        } else if let Some(message) = failure {
            controller.on_relay_error(message);
        }

        let chat = ChatReconciler::new(identity_hint(&token), config.notice_ttl);
        let services = ServiceClient::new(
            config.app.questions_url.clone(),
            config.app.chatbot_url.clone(),
        );
        let mut session = Self::new(controller, chat, services, events);
        session.question_id = config.question_id.clone();
        (session, transport_events)
    }
}

impl<T: RelayTransport> CollabSession<T> {
    pub fn new(
        controller: SyncController<T, TextBuffer>,
        chat: ChatReconciler,
        services: ServiceClient,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let (service_tx, service_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            chat,
            services,
            question: None,
            question_id: None,
            service_tx,
            service_rx: Some(service_rx),
            events,
            last_status: None,
            last_content: String::new(),
            last_notice: None,
            published_entries: 0,
        }
    }

    pub fn controller(&self) -> &SyncController<T, TextBuffer> {
        &self.controller
    }

    pub fn chat(&self) -> &ChatReconciler {
        &self.chat
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Run until `Quit` is received or the command channel closes
    pub async fn run(
        mut self,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) {
        let Some(mut service_rx) = self.service_rx.take() else {
            tracing::error!("[Sync] Service channel already taken");
            return;
        };
        if let Some(id) = self.question_id.clone() {
            self.load_question(id);
        }
        self.publish();

        let mut transport_live = true;
        loop {
            let deadline = self.chat.notice_deadline();
            tokio::select! {
                event = transport_events.recv(), if transport_live => match event {
                    Some(event) => self.handle_transport(event),
                    None => transport_live = false,
                },
                command = commands.recv() => match command {
                    Some(SessionCommand::Quit) | None => {
                        self.controller.quit();
                        self.publish();
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },
                Some(outcome) = service_rx.recv() => self.handle_service(outcome),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.chat.expire_notice(Instant::now());
                }
            }
            self.publish();
        }
        tracing::info!("[Sync] Session ended");
    }

    /// Apply one transport event
    pub fn handle_transport(&mut self, event: TransportEvent) {
        if let Some(incoming) = self.controller.dispatch(event) {
            let receipt = self.chat.receive_partner(
                incoming.content,
                incoming.sender_id,
                incoming.sent_at,
                incoming.client_id,
                Instant::now(),
            );
            if let ChatReceipt::Confirmed(index) = receipt {
                self.emit(SessionEvent::ChatDelivered(index));
            }
        }
        if self.controller.peer_left() {
            self.controller.clear_peer_left();
            self.emit(SessionEvent::PeerLeft);
        }
    }

    /// Apply one user command other than `Quit`
    pub fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Edit(edits) => {
                self.controller.surface_mut().apply_user_edit(edits);
            }
            SessionCommand::Append(text) => self.controller.surface_mut().append(&text),
            SessionCommand::Chat(line) => self.handle_chat_input(&line),
            SessionCommand::SetLanguage(language) => self.controller.set_language(language),
            SessionCommand::DismissNotice => self.chat.dismiss_notice(),
            SessionCommand::LoadQuestion(id) => self.load_question(id),
            SessionCommand::Run => self.run_code(),
            SessionCommand::Quit => self.controller.quit(),
        }
        self.controller.pump_surface();
    }

    fn handle_chat_input(&mut self, line: &str) {
        match route_input(line) {
            ChatRoute::Partner(body) => {
                // A failure has already been recorded as a system entry.
                let _ = self.chat.send_partner(&body, self.controller.transport());
            }
            ChatRoute::Assistant(message) => {
                self.chat.push_user(message.clone());
                let context = AssistantContext {
                    question_id: self.question_id.clone(),
                    question: self.question.as_ref().map(|q| q.title.clone()),
                    code: self.controller.surface().value(),
                    language: self.controller.language().to_string(),
                };
                let services = self.services.clone();
                let tx = self.service_tx.clone();
                tokio::spawn(async move {
                    let reply = services.assistant_reply(&message, &context).await;
                    let _ = tx.send(ServiceOutcome::Assistant(reply));
                });
            }
            ChatRoute::MissingPartnerBody => {
                self.chat
                    .push_system("Type a message after @partner to send it to your partner.");
            }
            ChatRoute::Empty => {}
        }
    }

    fn load_question(&mut self, id: String) {
        self.question_id = Some(id.clone());
        let services = self.services.clone();
        let tx = self.service_tx.clone();
        tokio::spawn(async move {
            let result = services.fetch_question(&id).await;
            let _ = tx.send(ServiceOutcome::Question(result));
        });
    }

    fn run_code(&mut self) {
        let test_cases = self
            .question
            .as_ref()
            .map(select_test_cases)
            .unwrap_or_default();
        if test_cases.is_empty() {
            self.chat.push_system("No test cases available");
            return;
        }

        // Runs the code as it is at the moment of the request.
        let code = self.controller.document().content();
        let language = self.controller.language();
        let services = self.services.clone();
        let tx = self.service_tx.clone();
        tokio::spawn(async move {
            let report = services.execute_or_report(&code, language, &test_cases).await;
            let _ = tx.send(ServiceOutcome::Execution(report));
        });
    }

    fn handle_service(&mut self, outcome: ServiceOutcome) {
        match outcome {
            ServiceOutcome::Question(Ok(question)) => {
                tracing::info!("[Services] Loaded question '{}'", question.title);
                self.question = Some(question.clone());
                self.emit(SessionEvent::Question(question));
            }
            ServiceOutcome::Question(Err(e)) => {
                tracing::warn!("[Services] Failed to fetch question: {}", e);
            }
            ServiceOutcome::Execution(report) => self.emit(SessionEvent::Execution(report)),
            ServiceOutcome::Assistant(reply) => self.chat.push_assistant(reply),
        }
    }

    fn publish(&mut self) {
        let status = self.controller.status().clone();
        if self.last_status.as_ref() != Some(&status) {
            self.last_status = Some(status.clone());
            self.emit(SessionEvent::Status(status));
        }

        let content = self.controller.document().content();
        if content != self.last_content {
            self.last_content = content.clone();
            self.emit(SessionEvent::Document(content));
        }

        let fresh: Vec<ChatMessage> = self.chat.entries()[self.published_entries..].to_vec();
        self.published_entries = self.chat.entries().len();
        for entry in fresh {
            self.emit(SessionEvent::ChatEntry(entry));
        }

        let notice = self.chat.notice().cloned();
        if notice != self.last_notice {
            self.last_notice = notice.clone();
            self.emit(SessionEvent::Notice(notice));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
