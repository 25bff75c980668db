//! Conversation engine: threads, the active selection, and the send lifecycle

use futures::StreamExt;
use parking_lot::Mutex;
use sheba_ai::Turn;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::{EngineEvent, EngineState},
    generator::Generator,
    persona::DEFAULT_FAILURE_NOTICE,
    store::ThreadStore,
    thread::{ChatMessage, Thread, ThreadSummary},
};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Assistant text used when the generator cannot produce a reply at all
    pub failure_notice: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_notice: DEFAULT_FAILURE_NOTICE.to_string(),
        }
    }
}

/// What happened to a send request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty or whitespace-only text; nothing changed
    Ignored,
    /// A reply was already in flight; nothing changed
    Busy,
    /// The exchange ran to the end (possibly ending in failure text)
    Completed { thread_id: String, reply: String },
}

/// User intents the presentation layer forwards to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Send(String),
    SelectThread(String),
    NewThread,
    DeleteThread(String),
}

#[derive(Default)]
struct Session {
    state: EngineState,
    threads: Vec<Thread>,
    active: Option<String>,
    /// Number of times the generator context has been re-seeded
    reseeds: u64,
}

impl Session {
    fn thread(&self, id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    fn thread_mut(&mut self, id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    fn summaries(&self) -> Vec<ThreadSummary> {
        self.threads.iter().map(Thread::summary).collect()
    }

    fn active_thread(&self) -> Option<&Thread> {
        self.active.as_deref().and_then(|id| self.thread(id))
    }
}

struct Shared {
    session: Mutex<Session>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn ThreadStore>,
    event_tx: broadcast::Sender<EngineEvent>,
    config: EngineConfig,
}

impl Shared {
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    fn set_state(&self, session: &mut Session, state: EngineState) {
        if session.state != state {
            session.state = state;
            self.emit(EngineEvent::StateChanged { state });
        }
    }

    /// Write every thread to the store, minus any in-flight placeholder.
    fn persist(&self, session: &Session) {
        let snapshot: Vec<Thread> = session.threads.iter().map(Thread::settled).collect();
        if let Err(e) = self.store.save_all(&snapshot) {
            tracing::error!("Failed to save thread history: {}", e);
        }
    }

    fn reseed(&self, session: &mut Session, prior_turns: Vec<Turn>) {
        session.reseeds += 1;
        self.generator.initialize(prior_turns);
    }

    fn deactivate(&self, session: &mut Session) {
        session.active = None;
        self.reseed(session, Vec::new());
        self.emit(EngineEvent::ActiveThreadChanged { thread_id: None });
    }
}

/// The conversation engine.
///
/// Cloning is cheap and every clone drives the same session, so a
/// presentation task can observe or issue intents while a reply streams.
#[derive(Clone)]
pub struct ChatEngine {
    shared: Arc<Shared>,
}

impl ChatEngine {
    /// Create an engine over the threads currently in `store`.
    ///
    /// Unreadable history is logged and treated as empty.
    pub fn new(generator: Arc<dyn Generator>, store: Arc<dyn ThreadStore>) -> Self {
        Self::with_config(generator, store, EngineConfig::default())
    }

    pub fn with_config(
        generator: Arc<dyn Generator>,
        store: Arc<dyn ThreadStore>,
        config: EngineConfig,
    ) -> Self {
        let threads = store.load_all().unwrap_or_else(|e| {
            tracing::warn!("Failed to load thread history, starting empty: {}", e);
            Vec::new()
        });
        generator.initialize(Vec::new());

        let (event_tx, _) = broadcast::channel(256);
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    threads,
                    ..Session::default()
                }),
                generator,
                store,
                event_tx,
                config,
            }),
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn state(&self) -> EngineState {
        self.shared.session.lock().state
    }

    pub fn active_thread_id(&self) -> Option<String> {
        self.shared.session.lock().active.clone()
    }

    /// Messages of the active thread; empty when no thread is active
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared
            .session
            .lock()
            .active_thread()
            .map(|t| t.messages.clone())
            .unwrap_or_default()
    }

    /// All threads, in creation order
    pub fn threads(&self) -> Vec<ThreadSummary> {
        self.shared.session.lock().summaries()
    }

    pub fn thread(&self, id: &str) -> Option<Thread> {
        self.shared.session.lock().thread(id).cloned()
    }

    /// Apply one presentation intent
    pub async fn dispatch(&self, intent: Intent) -> Result<()> {
        match intent {
            Intent::Send(text) => {
                self.send_message(&text).await;
            }
            Intent::SelectThread(id) => self.select_thread(&id)?,
            Intent::NewThread => self.new_thread(),
            Intent::DeleteThread(id) => {
                self.delete_thread(&id);
            }
        }
        Ok(())
    }

    /// Send a user message and stream the reply into the active thread.
    ///
    /// Creates a thread first when none is active. Rejected without any
    /// change while another reply is in flight.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let shared = &self.shared;
        let (thread_id, placeholder_id, reseeds) = {
            let mut session = shared.session.lock();
            if !session.state.is_idle() {
                tracing::debug!(state = session.state.as_str(), "send rejected: reply in flight");
                return SendOutcome::Busy;
            }

            let thread_id = self.ensure_active_thread(&mut session, text);
            let user = ChatMessage::user(text);
            let placeholder = ChatMessage::placeholder();
            let placeholder_id = placeholder.id.clone();

            if let Some(thread) = session.thread_mut(&thread_id) {
                thread.messages.push(user.clone());
            }
            shared.emit(EngineEvent::MessageAppended {
                thread_id: thread_id.clone(),
                message: user,
            });
            shared.set_state(&mut session, EngineState::Sending);
            shared.persist(&session);

            if let Some(thread) = session.thread_mut(&thread_id) {
                thread.messages.push(placeholder.clone());
            }
            shared.emit(EngineEvent::MessageAppended {
                thread_id: thread_id.clone(),
                message: placeholder,
            });

            (thread_id, placeholder_id, session.reseeds)
        };

        let mut guard = SendGuard::new(Arc::clone(shared), thread_id.clone(), placeholder_id, reseeds);

        match shared.generator.stream_reply(text).await {
            Ok(mut fragments) => {
                while let Some(fragment) = fragments.next().await {
                    guard.apply_fragment(&fragment);
                }
            }
            Err(e) => {
                tracing::warn!("Generator failed before replying: {}", e);
                guard.fail(&shared.config.failure_notice);
            }
        }

        let reply = guard.finish();
        SendOutcome::Completed { thread_id, reply }
    }

    /// Clear the active selection and reset the generation context
    pub fn new_thread(&self) {
        let mut session = self.shared.session.lock();
        self.shared.deactivate(&mut session);
    }

    /// Make `id` the active thread and re-seed the generator with its history
    pub fn select_thread(&self, id: &str) -> Result<()> {
        let mut session = self.shared.session.lock();
        let turns = session
            .thread(id)
            .ok_or_else(|| Error::ThreadNotFound(id.to_string()))?
            .prior_turns();

        session.active = Some(id.to_string());
        self.shared.reseed(&mut session, turns);
        self.shared.emit(EngineEvent::ActiveThreadChanged {
            thread_id: Some(id.to_string()),
        });
        Ok(())
    }

    /// Delete a thread. Returns false if no such thread existed.
    pub fn delete_thread(&self, id: &str) -> bool {
        let mut session = self.shared.session.lock();
        let Some(index) = session.threads.iter().position(|t| t.id == id) else {
            return false;
        };

        session.threads.remove(index);
        self.shared.persist(&session);
        self.shared.emit(EngineEvent::ThreadsChanged {
            threads: session.summaries(),
        });

        if session.active.as_deref() == Some(id) {
            self.shared.deactivate(&mut session);
        }
        true
    }

    fn ensure_active_thread(&self, session: &mut Session, first_message: &str) -> String {
        if let Some(id) = session.active_thread().map(|t| t.id.clone()) {
            return id;
        }

        let thread = Thread::new(first_message);
        let id = thread.id.clone();
        tracing::debug!(id = %id, title = %thread.title, "created thread");
        session.threads.push(thread);
        session.active = Some(id.clone());
        self.shared.reseed(session, Vec::new());

        self.shared.emit(EngineEvent::ThreadsChanged {
            threads: session.summaries(),
        });
        self.shared.emit(EngineEvent::ActiveThreadChanged {
            thread_id: Some(id.clone()),
        });
        id
    }
}

/// Owns the in-flight placeholder for one send.
///
/// Dropping the guard (including by dropping the send future) finalizes the
/// placeholder and returns the engine to idle.
struct SendGuard {
    shared: Arc<Shared>,
    thread_id: String,
    placeholder_id: String,
    /// Generator re-seed count when the send started
    reseeds: u64,
    reply: String,
    finished: bool,
}

impl SendGuard {
    fn new(shared: Arc<Shared>, thread_id: String, placeholder_id: String, reseeds: u64) -> Self {
        Self {
            shared,
            thread_id,
            placeholder_id,
            reseeds,
            reply: String::new(),
            finished: false,
        }
    }

    fn apply_fragment(&mut self, fragment: &str) {
        let shared = Arc::clone(&self.shared);
        let mut session = shared.session.lock();
        if session.state == EngineState::Sending {
            shared.set_state(&mut session, EngineState::Streaming);
        }
        self.append(&mut session, fragment);
    }

    /// Record failure text without entering the streaming state
    fn fail(&mut self, notice: &str) {
        let shared = Arc::clone(&self.shared);
        let mut session = shared.session.lock();
        self.append(&mut session, notice);
    }

    fn append(&mut self, session: &mut Session, fragment: &str) {
        self.reply.push_str(fragment);

        // The owning thread may have been deleted mid-reply.
        let Some(message) = session
            .thread_mut(&self.thread_id)
            .and_then(|t| t.message_mut(&self.placeholder_id))
        else {
            return;
        };
        message.text.push_str(fragment);
        let message = message.clone();

        self.shared.emit(EngineEvent::MessageUpdated {
            thread_id: self.thread_id.clone(),
            message,
            fragment: fragment.to_string(),
        });
    }

    fn finish(mut self) -> String {
        self.finalize();
        std::mem::take(&mut self.reply)
    }

    fn finalize(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let mut session = self.shared.session.lock();
        let finalized = session
            .thread_mut(&self.thread_id)
            .and_then(|t| t.message_mut(&self.placeholder_id))
            .map(|message| {
                message.is_streaming = false;
                message.clone()
            });

        match finalized {
            Some(message) => self.shared.emit(EngineEvent::MessageFinalized {
                thread_id: self.thread_id.clone(),
                message,
            }),
            None => tracing::debug!(thread = %self.thread_id, "reply finished for a deleted thread"),
        }

        // A context re-seeded mid-reply was built without this reply.
        if session.reseeds != self.reseeds
            && session.active.as_deref() == Some(self.thread_id.as_str())
        {
            if let Some(turns) = session.thread(&self.thread_id).map(Thread::prior_turns) {
                tracing::debug!(thread = %self.thread_id, "re-seeding context with finished reply");
                self.shared.reseed(&mut session, turns);
            }
        }

        self.shared.persist(&session);
        self.shared.emit(EngineEvent::ThreadsChanged {
            threads: session.summaries(),
        });
        self.shared.set_state(&mut session, EngineState::Idle);
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        self.finalize();
    }
}
