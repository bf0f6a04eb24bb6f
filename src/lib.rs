//! # ash-rpc-dispatch
//!
//! JSON-RPC 2.0 request dispatch and contract validation.
//!
//! ## Features
//!
//! - **Contract validation** - Positional and named parameter shapes with per-parameter kinds and defaults
//! - **Batch semantics** - Duplicate id detection, ordered dispatch, notification suppression
//! - **Protocol enforcement** - Handler answers are checked for id equality and reserved error codes
//! - **Service binding** - Register typed async functions as methods
//! - **Audit events** - Stable event ids for every processing outcome
//! - **Cancellation** - Cooperative abort of in-flight messages
//! - **HTTP transport** - Optional Axum router (feature `axum`)
//!
//! ## Quick Start
//!
//! ```rust
//! use ash_rpc_dispatch::*;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let service = ServiceBuilder::new()
//!     .by_position("add", [ParamKind::Integer, ParamKind::Integer], |(a, b): (i64, i64)| async move {
//!         Ok(a + b)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let processor = RpcProcessor::new(service).unwrap();
//!
//! let outcome = processor
//!     .process_message(r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#)
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.to_json().unwrap().unwrap(), r#"{"jsonrpc":"2.0","result":5,"id":1}"#);
//!
//! // notifications are never answered
//! let outcome = processor
//!     .process_message(r#"{"jsonrpc":"2.0","method":"add","params":[2,3]}"#)
//!     .await
//!     .unwrap();
//! assert!(outcome.is_no_content());
//! # });
//! ```

pub mod audit;
pub mod batch;
pub mod builders;
pub mod cancel;
pub mod classifier;
pub mod config;
pub mod contract;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod macros;
pub mod processor;
pub mod registry;
pub mod service;
pub mod traits;
pub mod transports;
pub mod types;

pub use audit::*;
pub use batch::*;
pub use builders::*;
pub use cancel::*;
pub use classifier::*;
pub use config::*;
pub use contract::*;
pub use dispatcher::*;
pub use envelope::*;
pub use error::*;
pub use processor::*;
pub use registry::*;
pub use service::*;
pub use traits::*;
pub use types::*;

// Re-export async_trait for users implementing traits
pub use async_trait::async_trait;
