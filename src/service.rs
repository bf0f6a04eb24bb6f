//! Service binding layer: build a [`Handler`] from plain async functions.
//!
//! Each method is registered with an explicit contract and a typed closure.
//! The closure's arguments are deserialized from the already validated
//! parameters, and its return value is serialized into the result.
//!
//! ```rust
//! use ash_rpc_dispatch::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Greeting {
//!     name: String,
//!     greeting: String,
//! }
//!
//! let service = ServiceBuilder::new()
//!     .by_position("add", [ParamKind::Integer, ParamKind::Integer], |(a, b): (i64, i64)| async move {
//!         Ok(a + b)
//!     })
//!     .by_name(
//!         "greet",
//!         [
//!             ("name", NamedParam::required(ParamKind::String)),
//!             ("greeting", NamedParam::optional(ParamKind::String, serde_json::json!("Hello"))),
//!         ],
//!         |args: Greeting| async move { Ok(format!("{}, {}!", args.greeting, args.name)) },
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(service.methods(), vec!["add", "greet"]);
//! ```

use crate::builders::{ErrorBuilder, ResponseBuilder};
use crate::contract::{MethodContract, NamedParam, ParamKind};
use crate::error::{ConfigurationError, HandlerFault};
use crate::registry::ContractRegistry;
use crate::traits::Handler;
use crate::types::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Application error returned by a service method
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ServiceError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

impl ServiceError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Parameters that passed the contract but are unusable by the method
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMETERS, message)
    }

    fn into_error(self) -> Error {
        let builder = ErrorBuilder::new(self.code, self.message);
        match self.data {
            Some(data) => builder.data(data).build(),
            None => builder.build(),
        }
    }
}

enum Invocation {
    Value(Value),
    Nothing,
    Failed(ServiceError),
}

type InvocationFuture = Pin<Box<dyn Future<Output = Result<Invocation, HandlerFault>> + Send>>;
type Invoke = Box<dyn Fn(Params) -> InvocationFuture + Send + Sync>;

struct ServiceMethod {
    contract: MethodContract,
    invoke: Invoke,
}

fn finish<R: Serialize>(outcome: Result<R, ServiceError>) -> Result<Invocation, HandlerFault> {
    match outcome {
        Ok(value) => Ok(Invocation::Value(serde_json::to_value(value)?)),
        Err(error) => Ok(Invocation::Failed(error)),
    }
}

fn bind<A: DeserializeOwned>(params: Params) -> Result<A, ServiceError> {
    params
        .parse()
        .map_err(|e| ServiceError::invalid_params(e.to_string()))
}

// An empty argument list also binds to `()`, which serde only reads from null.
fn bind_positional<A: DeserializeOwned>(params: Params) -> Result<A, ServiceError> {
    if params.is_empty()
        && let Ok(args) = serde_json::from_value(Value::Null)
    {
        return Ok(args);
    }
    bind(params)
}

/// Registers service methods and builds a [`ServiceHandler`]
#[derive(Default)]
pub struct ServiceBuilder {
    methods: Vec<(String, ServiceMethod)>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: impl Into<String>, contract: MethodContract, invoke: Invoke) -> Self {
        self.methods
            .push((name.into(), ServiceMethod { contract, invoke }));
        self
    }

    /// Register a method that receives the raw parameters
    pub fn method<F, Fut, R>(self, name: impl Into<String>, contract: MethodContract, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
        R: Serialize + 'static,
    {
        self.push(
            name,
            contract,
            Box::new(move |params: Params| -> InvocationFuture {
                let call = f(params);
                Box::pin(async move { finish(call.await) })
            }),
        )
    }

    /// Register a method whose positional parameters deserialize into `A`, usually a tuple
    pub fn by_position<A, F, Fut, R>(
        self,
        name: impl Into<String>,
        kinds: impl IntoIterator<Item = ParamKind>,
        f: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
        R: Serialize + 'static,
    {
        self.push(
            name,
            MethodContract::positional(kinds),
            Box::new(move |params: Params| -> InvocationFuture {
                match bind_positional::<A>(params) {
                    Ok(args) => {
                        let call = f(args);
                        Box::pin(async move { finish(call.await) })
                    }
                    Err(error) => Box::pin(async move { Ok(Invocation::Failed(error)) }),
                }
            }),
        )
    }

    /// Register a method whose named parameters deserialize into `A`, usually a struct
    pub fn by_name<A, K, F, Fut, R>(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = (K, NamedParam)>,
        f: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        K: Into<String>,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
        R: Serialize + 'static,
    {
        self.push(
            name,
            MethodContract::named_with(params),
            Box::new(move |params: Params| -> InvocationFuture {
                match bind::<A>(params) {
                    Ok(args) => {
                        let call = f(args);
                        Box::pin(async move { finish(call.await) })
                    }
                    Err(error) => Box::pin(async move { Ok(Invocation::Failed(error)) }),
                }
            }),
        )
    }

    /// Register a method without parameters
    pub fn no_params<F, Fut, R>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
        R: Serialize + 'static,
    {
        self.push(
            name,
            MethodContract::no_params(),
            Box::new(move |_: Params| -> InvocationFuture {
                let call = f();
                Box::pin(async move { finish(call.await) })
            }),
        )
    }

    /// Register a method that never produces a result
    pub fn notification<F, Fut>(self, name: impl Into<String>, contract: MethodContract, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        self.push(
            name,
            contract.notification_only(),
            Box::new(move |params: Params| -> InvocationFuture {
                let call = f(params);
                Box::pin(async move {
                    Ok(match call.await {
                        Ok(()) => Invocation::Nothing,
                        Err(error) => Invocation::Failed(error),
                    })
                })
            }),
        )
    }

    /// Validate method names and build the handler
    pub fn build(self) -> Result<ServiceHandler, ConfigurationError> {
        let mut registry = ContractRegistry::new();
        let mut methods = HashMap::with_capacity(self.methods.len());
        for (name, method) in self.methods {
            registry.register(name.as_str(), method.contract.clone())?;
            methods.insert(name, method);
        }
        tracing::debug!(method_count = methods.len(), "service built");
        Ok(ServiceHandler { methods })
    }
}

/// Handler backed by a table of registered functions
pub struct ServiceHandler {
    methods: HashMap<String, ServiceMethod>,
}

impl ServiceHandler {
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ServiceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("methods", &self.methods())
            .finish()
    }
}

#[async_trait::async_trait]
impl Handler for ServiceHandler {
    fn contracts(&self) -> HashMap<String, MethodContract> {
        self.methods
            .iter()
            .map(|(name, method)| (name.clone(), method.contract.clone()))
            .collect()
    }

    async fn handle(&self, request: Request) -> Result<Option<Response>, HandlerFault> {
        let Some(method) = self.methods.get(request.method()) else {
            return Err(format!("method '{}' is not registered", request.method()).into());
        };

        let reply = ResponseBuilder::reply_to(&request);
        let is_notification = request.is_notification();
        let invocation = (method.invoke)(request.take_params()).await?;

        Ok(match invocation {
            Invocation::Failed(error) => Some(reply.error(error.into_error()).build()),
            Invocation::Value(_) if is_notification => None,
            Invocation::Value(value) => Some(reply.success(value).build()),
            Invocation::Nothing => None,
        })
    }
}
