//! Per-request dispatch: classified request to optional response.

use crate::audit::{AuditEvent, AuditEventKind, AuditSink};
use crate::builders::{ErrorBuilder, ResponseBuilder};
use crate::classifier::{ClassifiedRequest, InvalidRequest};
use crate::config::ProcessorConfig;
use crate::error::{ProcessError, ProtocolViolation};
use crate::traits::Handler;
use crate::types::*;
use serde_json::Value;

/// Dispatches classified requests to a handler and enforces its answers
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    handler: &'a dyn Handler,
    audit: &'a dyn AuditSink,
    config: &'a ProcessorConfig,
    correlation_id: Option<&'a str>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        handler: &'a dyn Handler,
        audit: &'a dyn AuditSink,
        config: &'a ProcessorConfig,
    ) -> Self {
        Self {
            handler,
            audit,
            config,
            correlation_id: None,
        }
    }

    /// Tag every audit event with a correlation id
    pub fn with_correlation_id(mut self, correlation_id: &'a str) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        self.config
    }

    /// Dispatch one request.
    ///
    /// `Ok(None)` means nothing is transmitted for it: the request was a valid
    /// notification, or the handler produced no response.
    pub async fn dispatch(
        &self,
        classified: ClassifiedRequest,
        index: Option<usize>,
    ) -> Result<Option<Response>, ProcessError> {
        match classified {
            ClassifiedRequest::Invalid(invalid) => Ok(Some(self.reject(invalid, index))),
            ClassifiedRequest::Valid(request) => self.invoke(request, index).await,
        }
    }

    /// Answer a request that failed classification
    pub fn reject(&self, invalid: InvalidRequest, index: Option<usize>) -> Response {
        tracing::debug!(
            index,
            method = invalid.method.as_deref(),
            code = invalid.kind.code(),
            reason = %invalid.reason,
            "request rejected"
        );
        self.record(
            AuditEvent::new(AuditEventKind::RequestIsInvalid { kind: invalid.kind })
                .with_index(index)
                .with_method(invalid.method)
                .with_id(invalid.id.clone())
                .with_detail(invalid.reason.as_str()),
        );
        self.standard_error(invalid.id, invalid.kind, &invalid.reason)
    }

    /// Standard error response, with the reason as `data` when details are exposed
    pub fn standard_error(
        &self,
        id: Option<RequestId>,
        kind: StandardErrorKind,
        reason: &str,
    ) -> Response {
        let mut error = ErrorBuilder::new(kind.code(), kind.message());
        if self.config.expose_error_details {
            error = error.data(Value::String(reason.to_string()));
        }
        ResponseBuilder::new().id(id).error(error.build()).build()
    }

    pub fn record(&self, event: AuditEvent) {
        self.audit
            .record(&event.with_correlation_id(self.correlation_id));
    }

    async fn invoke(
        &self,
        request: Request,
        index: Option<usize>,
    ) -> Result<Option<Response>, ProcessError> {
        let method = request.method.clone();
        let id = request.id.clone();
        let is_notification = request.is_notification();

        tracing::trace!(method = %method, index, is_notification, "invoking handler");

        let answer = match self.handler.handle(request).await {
            Ok(answer) => answer,
            Err(source) => {
                tracing::error!(method = %method, index, error = %source, "handler failed");
                return Err(ProcessError::Handler { method, source });
            }
        };

        let event = AuditEvent::new(AuditEventKind::HandledNotification)
            .with_index(index)
            .with_method(Some(method.as_str()))
            .with_id(id.clone());

        let Some(response) = answer else {
            let kind = if is_notification {
                AuditEventKind::HandledNotification
            } else {
                AuditEventKind::HandledNotificationAsRequest
            };
            self.record(AuditEvent { kind, ..event });
            return Ok(None);
        };

        if let Err(violation) = self.check_response(&method, id.as_ref(), &response) {
            tracing::error!(method = %method, index, error = %violation, "protocol violation");
            self.record(
                AuditEvent {
                    kind: AuditEventKind::ProtocolViolation,
                    ..event
                }
                .with_detail(violation.to_string()),
            );
            return Err(violation.into());
        }

        let kind = match (is_notification, response.error_code()) {
            (false, None) => AuditEventKind::HandledRequestWithResult,
            (false, Some(code)) => AuditEventKind::HandledRequestWithError { code },
            (true, None) => AuditEventKind::HandledRequestWithResultAsNotification,
            (true, Some(code)) => AuditEventKind::HandledRequestWithErrorAsNotification { code },
        };
        self.record(AuditEvent { kind, ..event });

        if is_notification {
            return Ok(None);
        }
        Ok(Some(response))
    }

    fn check_response(
        &self,
        method: &str,
        expected: Option<&RequestId>,
        response: &Response,
    ) -> Result<(), ProtocolViolation> {
        if !same_wire_id(expected, response.id()) {
            return Err(ProtocolViolation::ResponseIdMismatch {
                method: method.to_string(),
                expected: expected.cloned(),
                actual: response.id.clone(),
            });
        }

        if let Some(error) = response.error_info()
            && error.is_reserved()
        {
            return Err(ProtocolViolation::ReservedErrorCode {
                method: method.to_string(),
                code: error.code(),
            });
        }

        Ok(())
    }
}

// An absent id and an explicit null id are both written as `null`.
fn same_wire_id(left: Option<&RequestId>, right: Option<&RequestId>) -> bool {
    left.unwrap_or(&RequestId::Null) == right.unwrap_or(&RequestId::Null)
}
