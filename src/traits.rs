//! Core traits for hosted handlers.

use crate::contract::MethodContract;
use crate::error::HandlerFault;
use crate::types::*;
use std::collections::HashMap;

/// A JSON-RPC handler hosted by a processor.
///
/// The processor reads [`Handler::contracts`] once, when it is built, and
/// only forwards requests that match one of them. `handle` receives the
/// request with its parameters already resolved against the contract.
///
/// Returning `Ok(None)` means "no response". For a request with an id this
/// is allowed but audited as a warning. A returned response must carry the
/// request's id and must not use a reserved error code.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    /// Method name to contract
    fn contracts(&self) -> HashMap<String, MethodContract>;

    /// Handle one classified request
    async fn handle(&self, request: Request) -> Result<Option<Response>, HandlerFault>;
}

#[async_trait::async_trait]
impl<T: Handler + ?Sized> Handler for std::sync::Arc<T> {
    fn contracts(&self) -> HashMap<String, MethodContract> {
        (**self).contracts()
    }

    async fn handle(&self, request: Request) -> Result<Option<Response>, HandlerFault> {
        (**self).handle(request).await
    }
}
