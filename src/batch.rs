//! Batch coordination: classify every item, check ids, then dispatch in order.

use crate::audit::{AuditEvent, AuditEventKind};
use crate::cancel::CancellationSignal;
use crate::classifier::{ClassifiedRequest, classify};
use crate::dispatcher::Dispatcher;
use crate::envelope::RawEnvelope;
use crate::error::ProcessError;
use crate::registry::ContractRegistry;
use crate::types::*;
use std::collections::HashSet;

/// First id shared by two valid requests that expect a response
pub fn find_duplicate_id(items: &[ClassifiedRequest]) -> Option<&RequestId> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter_map(|item| match item {
            ClassifiedRequest::Valid(request) => request.id(),
            ClassifiedRequest::Invalid(_) => None,
        })
        .find(|id| !seen.insert(*id))
}

/// Result of processing a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The batch was refused as a whole and is answered by one error object
    Rejected(Response),
    /// Responses of the dispatched requests, in request order; may be empty
    Completed(Vec<Response>),
}

impl BatchOutcome {
    /// All responses to transmit
    pub fn into_responses(self) -> Vec<Response> {
        match self {
            BatchOutcome::Rejected(response) => vec![response],
            BatchOutcome::Completed(responses) => responses,
        }
    }
}

/// Drives classification and dispatch for one message
pub struct BatchCoordinator<'a> {
    dispatcher: Dispatcher<'a>,
    registry: &'a ContractRegistry,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(dispatcher: Dispatcher<'a>, registry: &'a ContractRegistry) -> Self {
        Self {
            dispatcher,
            registry,
        }
    }

    /// Process a single request; no duplicate check applies
    pub async fn process_single(
        &self,
        envelope: RawEnvelope,
        cancel: &CancellationSignal,
    ) -> Result<Option<Response>, ProcessError> {
        checkpoint(cancel)?;
        let classified = classify(envelope, self.registry);
        checkpoint(cancel)?;
        self.dispatcher.dispatch(classified, None).await
    }

    /// Process a batch.
    ///
    /// Responses keep the relative order of their requests. An empty result
    /// means nothing is transmitted. Cancellation discards the whole batch.
    pub async fn process_batch(
        &self,
        envelopes: Vec<RawEnvelope>,
        cancel: &CancellationSignal,
    ) -> Result<BatchOutcome, ProcessError> {
        let mut items = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            checkpoint(cancel)?;
            items.push(classify(envelope, self.registry));
        }

        if let Some(id) = find_duplicate_id(&items) {
            tracing::warn!(id = %id, batch_size = items.len(), "batch has duplicate identifiers");
            self.dispatcher.record(
                AuditEvent::new(AuditEventKind::BatchHasDuplicateIdentifiers)
                    .with_id(Some(id.clone())),
            );
            return Ok(BatchOutcome::Rejected(Response::standard(
                None,
                StandardErrorKind::BatchDuplicateIdentifiers,
            )));
        }

        let mut responses = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            checkpoint(cancel)?;
            if let Some(response) = self.dispatcher.dispatch(item, Some(index)).await? {
                responses.push(response);
            }
        }

        tracing::debug!(response_count = responses.len(), "batch processed");
        Ok(BatchOutcome::Completed(responses))
    }
}

fn checkpoint(cancel: &CancellationSignal) -> Result<(), ProcessError> {
    if cancel.is_cancelled() {
        tracing::debug!("message processing cancelled");
        return Err(ProcessError::Cancelled);
    }
    Ok(())
}
