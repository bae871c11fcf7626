//! Test utilities for skill_collab_core
//!
//! Shared mocks for the external capabilities the crate consumes: a transport
//! that records what it sends, a persistence endpoint that can be made to
//! fail or to run a hook mid-save, and an editor widget with a fixed viewport.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::editor::{EditorWidget, TextPosition, ViewportPoint, offset_in};
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::protocol::{CollaborationMessage, OutboundEvent, SkillUpdatePayload, TransportEvent};
use crate::save::{BoxFuture, SaveRequest, SkillPersistence, Spawner};
use crate::transport::{Transport, TransportFactory, TransportListener};

/// A transport that records outbound events and lets tests inject inbound ones.
#[derive(Default)]
pub struct MockTransport {
    connected: AtomicBool,
    listeners: ListenerRegistry<TransportEvent>,
    sent: Mutex<Vec<OutboundEvent>>,
}

impl MockTransport {
    /// Transport starting in the given connection state.
    pub fn new(connected: bool) -> Arc<Self> {
        let transport = Self::default();
        transport.connected.store(connected, Ordering::SeqCst);
        Arc::new(transport)
    }

    /// Flip `is_connected` without emitting an event.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Deliver an inbound event to every listener.
    pub fn deliver(&self, event: TransportEvent) {
        self.listeners.emit(&event);
    }

    /// Everything emitted so far.
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    /// Forget emitted events.
    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Decoded outbound envelopes.
    pub fn sent_messages(&self) -> Vec<CollaborationMessage> {
        self.sent()
            .iter()
            .filter_map(|event| match event {
                OutboundEvent::CollaborationEvent(envelope) => {
                    CollaborationMessage::try_from(envelope).ok()
                }
                OutboundEvent::SkillUpdate(_) => None,
            })
            .collect()
    }

    /// Outbound `skill_update` payloads.
    pub fn sent_updates(&self) -> Vec<SkillUpdatePayload> {
        self.sent()
            .into_iter()
            .filter_map(|event| match event {
                OutboundEvent::SkillUpdate(payload) => Some(payload),
                OutboundEvent::CollaborationEvent(_) => None,
            })
            .collect()
    }

    /// Live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Transport for MockTransport {
    fn emit(&self, event: OutboundEvent) {
        self.sent.lock().unwrap().push(event);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn on(&self, listener: TransportListener) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    fn off(&self, id: ListenerId) {
        self.listeners.unsubscribe(id);
    }
}

/// Hands out one [`MockTransport`] per workspace id.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    connected: bool,
    transports: Arc<Mutex<HashMap<String, Arc<MockTransport>>>>,
}

impl MockTransportFactory {
    /// Transports created by this factory start in the given connected state.
    pub fn new(connected: bool) -> Self {
        Self {
            connected,
            transports: Arc::default(),
        }
    }

    /// The current transport for a workspace, created on first use.
    pub fn transport(&self, workspace_id: &str) -> Arc<MockTransport> {
        let mut transports = self.transports.lock().unwrap();
        Arc::clone(
            transports
                .entry(workspace_id.to_string())
                .or_insert_with(|| MockTransport::new(self.connected)),
        )
    }

    /// Swap in a fresh handle, as a reconnect would.
    pub fn replace(&self, workspace_id: &str) -> Arc<MockTransport> {
        let fresh = MockTransport::new(self.connected);
        self.transports
            .lock()
            .unwrap()
            .insert(workspace_id.to_string(), Arc::clone(&fresh));
        fresh
    }
}

impl TransportFactory for MockTransportFactory {
    fn connect(&self, workspace_id: &str) -> Arc<dyn Transport> {
        self.transport(workspace_id)
    }
}

type SaveHook = Box<dyn Fn(&SaveRequest) + Send + Sync>;

/// Persistence endpoint recording every call.
#[derive(Default)]
pub struct MockPersistence {
    calls: Mutex<Vec<SaveRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail: AtomicBool,
    hook: Mutex<Option<SaveHook>>,
}

impl MockPersistence {
    /// Endpoint that accepts every save.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following call reject.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Run `hook` inside each save, after it has yielded once.
    pub fn set_hook(&self, hook: impl Fn(&SaveRequest) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Requests in call order.
    pub fn calls(&self) -> Vec<SaveRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of saves observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl SkillPersistence for MockPersistence {
    fn save<'a>(&'a self, request: &'a SaveRequest) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(request.clone());

            futures_lite::future::yield_now().await;
            if let Some(hook) = self.hook.lock().unwrap().as_ref() {
                hook(request);
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err("persistence unavailable".to_string())
            } else {
                Ok(())
            }
        })
    }
}

/// Executor stand-in: spawned tasks wait until the test runs them.
#[derive(Default)]
pub struct MockSpawner {
    tasks: Mutex<VecDeque<BoxFuture<'static, ()>>>,
}

impl MockSpawner {
    /// Spawner with an empty queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A [`Spawner`] queueing onto this mock.
    pub fn spawner(self: &Arc<Self>) -> Spawner {
        let this = Arc::clone(self);
        Arc::new(move |task| this.tasks.lock().unwrap().push_back(task))
    }

    /// Tasks spawned but not yet run.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Run queued tasks in spawn order, including ones they spawn. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.lock().unwrap().pop_front();
            let Some(task) = next else {
                return ran;
            };
            block_on(task);
            ran += 1;
        }
    }
}

/// Editor widget over a fixed text with a visible line range.
pub struct MockEditor {
    /// Document text.
    pub text: String,
    /// Visible lines, inclusive.
    pub visible_lines: (usize, usize),
}

impl MockEditor {
    /// Editor showing every line of `text`.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible_lines: (0, usize::MAX),
        }
    }

    /// Restrict the viewport to lines `first..=last`.
    pub fn with_visible_lines(mut self, first: usize, last: usize) -> Self {
        self.visible_lines = (first, last);
        self
    }
}

impl EditorWidget for MockEditor {
    fn offset_at(&self, position: TextPosition) -> usize {
        offset_in(&self.text, position)
    }

    fn point_at(&self, offset: usize) -> Option<ViewportPoint> {
        let before: String = self.text.chars().take(offset).collect();
        let line = before.matches('\n').count();
        let column = before.chars().rev().take_while(|c| *c != '\n').count();
        let (first, last) = self.visible_lines;
        if line < first || line > last {
            return None;
        }
        Some(ViewportPoint {
            x: column as f64 * 8.0,
            y: (line - first) as f64 * 20.0,
            height: 20.0,
        })
    }
}

/// Drive a future to completion on the current thread.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    futures_lite::future::block_on(future)
}
