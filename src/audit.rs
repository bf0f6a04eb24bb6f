//! Audit events for message processing outcomes.
//!
//! Every message and every request produces exactly one outcome event. Events
//! carry a stable numeric id so that log pipelines can filter on them.

use crate::types::{RequestId, StandardErrorKind};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;

/// Outcome class of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum AuditEventKind {
    /// Payload holds a single message
    DataIsMessage,
    /// Payload holds a batch of `count` messages
    DataIsBatch { count: usize },
    HandledNotification,
    HandledRequestWithResult,
    HandledRequestWithError { code: i32 },
    /// Result produced for a notification; it is not transmitted
    HandledRequestWithResultAsNotification,
    /// Error produced for a notification; it is not transmitted
    HandledRequestWithErrorAsNotification { code: i32 },
    /// Handler produced nothing for a request that expects a response
    HandledNotificationAsRequest,
    /// Payload could not be parsed
    DataIsInvalid { kind: StandardErrorKind },
    /// Request failed classification
    RequestIsInvalid { kind: StandardErrorKind },
    BatchHasDuplicateIdentifiers,
    /// Handler response broke a protocol invariant
    ProtocolViolation,
}

impl AuditEventKind {
    /// Stable numeric event id
    pub fn event_id(&self) -> u16 {
        match self {
            AuditEventKind::DataIsMessage => 1000,
            AuditEventKind::DataIsBatch { .. } => 1001,
            AuditEventKind::HandledNotification => 1100,
            AuditEventKind::HandledRequestWithResult => 1110,
            AuditEventKind::HandledRequestWithError { .. } => 1111,
            AuditEventKind::HandledRequestWithResultAsNotification => 1200,
            AuditEventKind::HandledRequestWithErrorAsNotification { .. } => 1201,
            AuditEventKind::HandledNotificationAsRequest => 1300,
            AuditEventKind::DataIsInvalid { .. } => 1400,
            AuditEventKind::RequestIsInvalid { .. } => 1401,
            AuditEventKind::BatchHasDuplicateIdentifiers => 1402,
            AuditEventKind::ProtocolViolation => 1500,
        }
    }

    pub fn level(&self) -> Level {
        match self.event_id() {
            1000..=1099 => Level::TRACE,
            1100..=1199 => Level::DEBUG,
            1200..=1299 => Level::INFO,
            1300..=1399 => Level::WARN,
            _ => Level::ERROR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuditEventKind::DataIsMessage => "data_is_message",
            AuditEventKind::DataIsBatch { .. } => "data_is_batch",
            AuditEventKind::HandledNotification => "handled_notification",
            AuditEventKind::HandledRequestWithResult => "handled_request_with_result",
            AuditEventKind::HandledRequestWithError { .. } => "handled_request_with_error",
            AuditEventKind::HandledRequestWithResultAsNotification => {
                "handled_request_with_result_as_notification"
            }
            AuditEventKind::HandledRequestWithErrorAsNotification { .. } => {
                "handled_request_with_error_as_notification"
            }
            AuditEventKind::HandledNotificationAsRequest => "handled_notification_as_request",
            AuditEventKind::DataIsInvalid { .. } => "data_is_invalid",
            AuditEventKind::RequestIsInvalid { .. } => "request_is_invalid",
            AuditEventKind::BatchHasDuplicateIdentifiers => "batch_has_duplicate_identifiers",
            AuditEventKind::ProtocolViolation => "protocol_violation",
        }
    }

    /// Error code carried by the event, if any
    pub fn error_code(&self) -> Option<i32> {
        match self {
            AuditEventKind::HandledRequestWithError { code }
            | AuditEventKind::HandledRequestWithErrorAsNotification { code } => Some(*code),
            AuditEventKind::DataIsInvalid { kind } | AuditEventKind::RequestIsInvalid { kind } => {
                Some(kind.code())
            }
            AuditEventKind::BatchHasDuplicateIdentifiers => {
                Some(StandardErrorKind::BatchDuplicateIdentifiers.code())
            }
            _ => None,
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.event_id())
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    #[serde(flatten)]
    pub kind: AuditEventKind,

    /// Correlation id of the message being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Position of the request inside a batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Diagnostic text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind) -> Self {
        Self {
            kind,
            correlation_id: None,
            index: None,
            method: None,
            id: None,
            detail: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<&str>) -> Self {
        self.correlation_id = correlation_id.map(str::to_owned);
        self
    }

    pub fn with_index(mut self, index: Option<usize>) -> Self {
        self.index = index;
        self
    }

    pub fn with_method<S: Into<String>>(mut self, method: Option<S>) -> Self {
        self.method = method.map(Into::into);
        self
    }

    pub fn with_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn event_id(&self) -> u16 {
        self.kind.event_id()
    }
}

/// Destination for audit events. Recording is synchronous and must not fail.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event)
    }
}

/// Emits audit events as `tracing` events at the level of their kind
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

macro_rules! emit_audit {
    ($level:ident, $event:expr_2021) => {{
        let event = $event;
        tracing::$level!(
            target: "ash_rpc_dispatch::audit",
            event_id = event.kind.event_id(),
            event = event.kind.name(),
            correlation_id = event.correlation_id.as_deref(),
            index = event.index,
            method = event.method.as_deref(),
            id = event.id.as_ref().map(tracing::field::display),
            error_code = event.kind.error_code(),
            detail = event.detail.as_deref(),
            "{}",
            event.kind
        )
    }};
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event.kind.event_id() {
            1000..=1099 => emit_audit!(trace, event),
            1100..=1199 => emit_audit!(debug, event),
            1200..=1299 => emit_audit!(info, event),
            1300..=1399 => emit_audit!(warn, event),
            _ => emit_audit!(error, event),
        }
    }
}

/// Discards all audit events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Forwards audit events to several sinks in order
#[derive(Default)]
pub struct MultiAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl MultiAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AuditSink for MultiAuditSink {
    fn record(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

/// Keeps audit events in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock().clone()
    }

    /// Event ids in recording order
    pub fn event_ids(&self) -> Vec<u16> {
        self.lock().iter().map(AuditEvent::event_id).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock leaves the vector intact.
    fn lock(&self) -> MutexGuard<'_, Vec<AuditEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.lock().push(event.clone());
    }
}
