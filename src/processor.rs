//! Message processor: the entry point a transport calls for each payload.

use crate::audit::{AuditEvent, AuditEventKind, AuditSink, TracingAuditSink};
use crate::batch::{BatchCoordinator, BatchOutcome};
use crate::cancel::CancellationSignal;
use crate::config::ProcessorConfig;
use crate::dispatcher::Dispatcher;
use crate::envelope::{ParseFailure, Payload, parse_payload};
use crate::error::{ConfigurationError, ProcessError};
use crate::registry::ContractRegistry;
use crate::traits::Handler;
use crate::types::*;
use std::sync::Arc;
use tracing::Instrument;

/// What a transport writes back for one message
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Nothing is transmitted, not even an empty array
    NoContent,
    Single(Response),
    Batch(Vec<Response>),
}

impl ProcessOutcome {
    pub fn is_no_content(&self) -> bool {
        matches!(self, ProcessOutcome::NoContent)
    }

    /// Responses in transmission order
    pub fn responses(&self) -> &[Response] {
        match self {
            ProcessOutcome::NoContent => &[],
            ProcessOutcome::Single(response) => std::slice::from_ref(response),
            ProcessOutcome::Batch(responses) => responses,
        }
    }

    /// Serialize to wire text; `None` for [`ProcessOutcome::NoContent`]
    pub fn to_json(&self) -> Result<Option<String>, serde_json::Error> {
        match self {
            ProcessOutcome::NoContent => Ok(None),
            ProcessOutcome::Single(response) => serde_json::to_string(response).map(Some),
            ProcessOutcome::Batch(responses) => serde_json::to_string(responses).map(Some),
        }
    }
}

/// Hosts one handler and processes messages addressed to it.
///
/// Contracts are validated once, at construction. A processor is `Send + Sync`
/// and can serve concurrent messages through an `Arc`.
pub struct RpcProcessor {
    handler: Arc<dyn Handler>,
    registry: Arc<ContractRegistry>,
    config: ProcessorConfig,
    audit: Arc<dyn AuditSink>,
}

impl RpcProcessor {
    /// Host a handler with default configuration and tracing audit events
    pub fn new<H: Handler + 'static>(handler: H) -> Result<Self, ConfigurationError> {
        Self::builder(handler).build()
    }

    pub fn builder<H: Handler + 'static>(handler: H) -> RpcProcessorBuilder {
        RpcProcessorBuilder::new(Arc::new(handler))
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process one payload without cancellation
    pub async fn process_message(&self, payload: &str) -> Result<ProcessOutcome, ProcessError> {
        self.process_message_with_cancellation(payload, &CancellationSignal::never())
            .await
    }

    /// Process one payload, giving up at the next checkpoint once `cancel` fires
    pub async fn process_message_with_cancellation(
        &self,
        payload: &str,
        cancel: &CancellationSignal,
    ) -> Result<ProcessOutcome, ProcessError> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::debug_span!("rpc_message", correlation_id = %correlation_id);
        self.run(payload, cancel, &correlation_id)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        payload: &str,
        cancel: &CancellationSignal,
        correlation_id: &str,
    ) -> Result<ProcessOutcome, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        let dispatcher = Dispatcher::new(self.handler.as_ref(), self.audit.as_ref(), &self.config)
            .with_correlation_id(correlation_id);

        let payload = match parse_payload(payload) {
            Ok(payload) => payload,
            Err(failure) => {
                let kind = match failure {
                    ParseFailure::InvalidJson(_) => StandardErrorKind::InvalidFormat,
                    ParseFailure::InvalidStructure(_) => StandardErrorKind::InvalidOperation,
                };
                tracing::debug!(code = kind.code(), reason = %failure, "payload rejected");
                dispatcher.record(
                    AuditEvent::new(AuditEventKind::DataIsInvalid { kind })
                        .with_detail(failure.reason()),
                );
                return Ok(ProcessOutcome::Single(dispatcher.standard_error(
                    None,
                    kind,
                    failure.reason(),
                )));
            }
        };

        let coordinator = BatchCoordinator::new(dispatcher, &self.registry);

        match payload {
            Payload::Single(envelope) => {
                dispatcher.record(AuditEvent::new(AuditEventKind::DataIsMessage));
                let response = coordinator.process_single(envelope, cancel).await?;
                Ok(response.map_or(ProcessOutcome::NoContent, ProcessOutcome::Single))
            }
            Payload::Batch(envelopes) => {
                let count = envelopes.len();
                dispatcher.record(AuditEvent::new(AuditEventKind::DataIsBatch { count }));

                if !self.config.batch_within_limit(count) {
                    let kind = StandardErrorKind::InvalidOperation;
                    let reason = format!(
                        "batch of {} requests exceeds the limit of {}",
                        count,
                        self.config.max_batch_size.unwrap_or_default()
                    );
                    tracing::warn!(batch_size = count, "batch too large");
                    dispatcher.record(
                        AuditEvent::new(AuditEventKind::DataIsInvalid { kind })
                            .with_detail(reason.as_str()),
                    );
                    return Ok(ProcessOutcome::Single(
                        dispatcher.standard_error(None, kind, &reason),
                    ));
                }

                Ok(match coordinator.process_batch(envelopes, cancel).await? {
                    BatchOutcome::Rejected(response) => ProcessOutcome::Single(response),
                    BatchOutcome::Completed(responses) if responses.is_empty() => {
                        ProcessOutcome::NoContent
                    }
                    BatchOutcome::Completed(responses) => ProcessOutcome::Batch(responses),
                })
            }
        }
    }
}

/// Builder for [`RpcProcessor`]
pub struct RpcProcessorBuilder {
    handler: Arc<dyn Handler>,
    config: ProcessorConfig,
    audit: Arc<dyn AuditSink>,
}

impl RpcProcessorBuilder {
    fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            config: ProcessorConfig::default(),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Validate the handler's contracts and build the processor
    pub fn build(self) -> Result<RpcProcessor, ConfigurationError> {
        let registry = ContractRegistry::from_contracts(self.handler.contracts())?;
        tracing::info!(methods = ?registry.methods(), "handler hosted");
        Ok(RpcProcessor {
            handler: self.handler,
            registry: Arc::new(registry),
            config: self.config,
            audit: self.audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::cancel::{CancellationHandle, cancellation};
    use crate::contract::{MethodContract, ParamKind};
    use crate::error::{HandlerFault, ProtocolViolation};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Calculator;

    #[async_trait::async_trait]
    impl Handler for Calculator {
        fn contracts(&self) -> HashMap<String, MethodContract> {
            HashMap::from([
                (
                    "add".to_string(),
                    MethodContract::positional([ParamKind::Integer, ParamKind::Integer]),
                ),
                ("broken".to_string(), MethodContract::no_params()),
            ])
        }

        async fn handle(&self, request: Request) -> Result<Option<Response>, HandlerFault> {
            match request.method() {
                "add" => {
                    let (a, b): (i64, i64) = request.params().clone().parse()?;
                    Ok(Some(crate::rpc_success!(request, a + b)))
                }
                _ => Ok(Some(Response::result(Some(RequestId::from("wrong")), Value::Null))),
            }
        }
    }

    struct Reserved;

    #[async_trait::async_trait]
    impl Handler for Reserved {
        fn contracts(&self) -> HashMap<String, MethodContract> {
            HashMap::from([("rpc.discover".to_string(), MethodContract::no_params())])
        }

        async fn handle(&self, _request: Request) -> Result<Option<Response>, HandlerFault> {
            Ok(None)
        }
    }

    fn processor() -> (RpcProcessor, Arc<MemoryAuditSink>) {
        let audit = Arc::new(MemoryAuditSink::new());
        let processor = RpcProcessor::builder(Calculator)
            .audit_sink(audit.clone())
            .build()
            .unwrap();
        (processor, audit)
    }

    async fn json_output(processor: &RpcProcessor, payload: &str) -> Option<Value> {
        let outcome = processor.process_message(payload).await.unwrap();
        outcome
            .to_json()
            .unwrap()
            .map(|text| serde_json::from_str(&text).unwrap())
    }

    #[tokio::test]
    async fn test_add_request() {
        let (processor, audit) = processor();
        let output = json_output(
            &processor,
            r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#,
        )
        .await;
        assert_eq!(output, Some(json!({"jsonrpc": "2.0", "result": 5, "id": 1})));
        assert_eq!(audit.event_ids(), vec![1000, 1110]);

        let events = audit.events();
        assert!(events[0].correlation_id.is_some());
        assert_eq!(events[0].correlation_id, events[1].correlation_id);
    }

    #[tokio::test]
    async fn test_add_with_missing_parameter() {
        let (processor, _) = processor();
        let output = json_output(
            &processor,
            r#"{"jsonrpc":"2.0","method":"add","params":[2],"id":1}"#,
        )
        .await
        .unwrap();
        assert_eq!(output["id"], 1);
        assert_eq!(output["error"]["code"], -32602);
        assert!(output["error"].get("data").is_none());
    }

    #[tokio::test]
    async fn test_requests_without_version_member() {
        let (processor, _) = processor();
        let output = json_output(&processor, r#"{"method":"add","params":[2,3],"id":1}"#).await;
        assert_eq!(output, Some(json!({"jsonrpc": "2.0", "result": 5, "id": 1})));

        let outcome = processor
            .process_message(r#"{"method":"add","params":[1,1]}"#)
            .await
            .unwrap();
        assert!(outcome.is_no_content());
        assert_eq!(outcome.to_json().unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_request_objects() {
        let (processor, _) = processor();
        for payload in [r#"{"foo":"bar","id":1}"#, r#"{"jsonrpc":"2.0","id":1}"#] {
            let output = json_output(&processor, payload).await.unwrap();
            assert_eq!(output["error"]["code"], -32600);
            assert_eq!(output["id"], 1);
        }
    }

    #[tokio::test]
    async fn test_duplicate_batch_ids() {
        let (processor, _) = processor();
        let output = json_output(
            &processor,
            r#"[{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1},
                {"jsonrpc":"2.0","method":"add","params":[2,2],"id":1}]"#,
        )
        .await
        .unwrap();
        assert_eq!(output["id"], Value::Null);
        assert_eq!(output["error"]["code"], -32000);
    }

    #[tokio::test]
    async fn test_single_notification_has_no_content() {
        let (processor, audit) = processor();
        let outcome = processor
            .process_message(r#"{"jsonrpc":"2.0","method":"add","params":[1,1]}"#)
            .await
            .unwrap();
        assert!(outcome.is_no_content());
        assert_eq!(outcome.to_json().unwrap(), None);
        assert!(outcome.responses().is_empty());
        assert_eq!(audit.event_ids(), vec![1000, 1200]);
    }

    #[tokio::test]
    async fn test_batch_of_notifications_has_no_content() {
        let (processor, _) = processor();
        let outcome = processor
            .process_message(
                r#"[{"jsonrpc":"2.0","method":"add","params":[1,1]},
                    {"jsonrpc":"2.0","method":"add","params":[2,2]}]"#,
            )
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::NoContent);
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let (processor, _) = processor();
        let output = json_output(
            &processor,
            r#"[{"jsonrpc":"2.0","method":"add","params":[1,2],"id":"x"},
                {"jsonrpc":"2.0","method":"add","params":[1,1]},
                {"jsonrpc":"2.0","method":"subtract","params":[1,1],"id":"y"},
                {"foo":"bar"},
                {"jsonrpc":"2.0","method":"missing"}]"#,
        )
        .await
        .unwrap();

        let items = output.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], json!({"jsonrpc": "2.0", "result": 3, "id": "x"}));
        assert_eq!(items[1]["error"]["code"], -32601);
        assert_eq!(items[1]["id"], "y");
        assert_eq!(items[2]["error"]["code"], -32600);
        assert_eq!(items[2]["id"], Value::Null);
        // invalid notifications are answered
        assert_eq!(items[3]["error"]["code"], -32601);
        assert_eq!(items[3]["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_payloads() {
        let (processor, audit) = processor();

        let output = json_output(&processor, r#"{"jsonrpc":"2.0","method":"#).await.unwrap();
        assert_eq!(output["error"]["code"], -32700);
        assert_eq!(output["id"], Value::Null);

        let output = json_output(&processor, "[]").await.unwrap();
        assert_eq!(output["error"]["code"], -32603);

        let output = json_output(&processor, "42").await.unwrap();
        assert_eq!(output["error"]["code"], -32603);

        assert_eq!(audit.event_ids(), vec![1400, 1400, 1400]);
    }

    #[tokio::test]
    async fn test_error_details_exposed() {
        let processor = RpcProcessor::builder(Calculator)
            .config(ProcessorConfig::builder().expose_error_details(true).build())
            .audit_sink(Arc::new(crate::audit::NoopAuditSink))
            .build()
            .unwrap();

        let output = json_output(
            &processor,
            r#"{"jsonrpc":"2.0","method":"add","params":[2],"id":1}"#,
        )
        .await
        .unwrap();
        assert_eq!(output["error"]["data"], "expected 2 parameters, found 1");
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let processor = RpcProcessor::builder(Calculator)
            .config(ProcessorConfig::builder().max_batch_size(1).build())
            .build()
            .unwrap();

        let outcome = processor
            .process_message(
                r#"[{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1},
                    {"jsonrpc":"2.0","method":"add","params":[2,2],"id":2}]"#,
            )
            .await
            .unwrap();
        let ProcessOutcome::Single(response) = outcome else {
            panic!("expected a single error");
        };
        assert_eq!(response.error_code(), Some(-32603));
        assert_eq!(response.id(), None);
    }

    #[tokio::test]
    async fn test_idempotent_processing() {
        let (processor, _) = processor();
        let payload = r#"{"jsonrpc":"2.0","method":"add","params":[20,22],"id":"same"}"#;
        let first = processor.process_message(payload).await.unwrap();
        let second = processor.process_message(payload).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_request_count_matches_response_count() {
        let (processor, _) = processor();
        let mut items = Vec::new();
        for i in 0..10i64 {
            if i % 3 == 0 {
                items.push(json!({"jsonrpc": "2.0", "method": "add", "params": [i, i]}));
            } else {
                items.push(json!({"jsonrpc": "2.0", "method": "add", "params": [i, 1], "id": i}));
            }
        }
        let payload = Value::Array(items).to_string();

        let outcome = processor.process_message(&payload).await.unwrap();
        let ids: Vec<_> = outcome
            .responses()
            .iter()
            .map(|response| response.id().cloned())
            .collect();
        let expected: Vec<_> = [1i64, 2, 4, 5, 7, 8]
            .into_iter()
            .map(|i| Some(RequestId::Integer(i)))
            .collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_protocol_violation_aborts_message() {
        let (processor, audit) = processor();
        let error = processor
            .process_message(
                r#"[{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1},
                    {"jsonrpc":"2.0","method":"broken","id":2}]"#,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ProcessError::Protocol(ProtocolViolation::ResponseIdMismatch { .. })
        ));
        assert_eq!(audit.event_ids(), vec![1001, 1110, 1500]);
    }

    #[tokio::test]
    async fn test_cancelled_before_parse() {
        let (processor, audit) = processor();
        let (handle, signal) = cancellation();
        handle.cancel();

        let result = processor
            .process_message_with_cancellation(
                r#"{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1}"#,
                &signal,
            )
            .await;
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert!(audit.events().is_empty());
    }

    /// Fires the cancellation handle while serving its first call
    struct CancelsOnFirstCall {
        handle: CancellationHandle,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Handler for CancelsOnFirstCall {
        fn contracts(&self) -> HashMap<String, MethodContract> {
            HashMap::from([("work".to_string(), MethodContract::no_params())])
        }

        async fn handle(&self, request: Request) -> Result<Option<Response>, HandlerFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.handle.cancel();
            Ok(Some(crate::rpc_success!(request, "done")))
        }
    }

    #[tokio::test]
    async fn test_cancelled_mid_batch_discards_partial_output() {
        let (handle, signal) = cancellation();
        let handler = Arc::new(CancelsOnFirstCall {
            handle,
            calls: AtomicUsize::new(0),
        });
        let audit = Arc::new(MemoryAuditSink::new());
        let processor = RpcProcessor::builder(handler.clone())
            .audit_sink(audit.clone())
            .build()
            .unwrap();

        let result = processor
            .process_message_with_cancellation(
                r#"[{"jsonrpc":"2.0","method":"work","id":1},
                    {"jsonrpc":"2.0","method":"work","id":2},
                    {"jsonrpc":"2.0","method":"work","id":3}]"#,
                &signal,
            )
            .await;
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        let handled = audit.event_ids().into_iter().filter(|id| *id == 1110).count();
        assert_eq!(handled, 1);
    }

    #[test]
    fn test_reserved_contract_is_rejected() {
        let result = RpcProcessor::new(Reserved);
        assert!(matches!(
            result,
            Err(ConfigurationError::ReservedMethodName(name)) if name == "rpc.discover"
        ));
    }

    #[tokio::test]
    async fn test_concurrent_messages() {
        let (processor, _) = processor();
        let processor = Arc::new(processor);

        let mut tasks = Vec::new();
        for i in 0..8i64 {
            let processor = processor.clone();
            tasks.push(tokio::spawn(async move {
                let payload = json!({"jsonrpc": "2.0", "method": "add", "params": [i, i], "id": i})
                    .to_string();
                processor.process_message(&payload).await.unwrap()
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            let outcome = task.await.unwrap();
            assert_eq!(
                outcome.responses()[0].result_value(),
                Some(&json!(2 * i as i64))
            );
        }
    }
}
