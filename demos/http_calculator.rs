//! Serves a calculator over HTTP.
//!
//! ```text
//! cargo run --example http_calculator --features axum
//! curl -d '{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}' http://127.0.0.1:3001/rpc
//! ```

use ash_rpc_dispatch::transports::axum::rpc_router;
use ash_rpc_dispatch::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let service = ServiceBuilder::new()
        .by_position(
            "add",
            [ParamKind::Integer, ParamKind::Integer],
            |(a, b): (i64, i64)| async move { Ok(a.wrapping_add(b)) },
        )
        .by_position(
            "subtract",
            [ParamKind::Integer, ParamKind::Integer],
            |(a, b): (i64, i64)| async move { Ok(a.wrapping_sub(b)) },
        )
        .build()?;

    let processor = Arc::new(RpcProcessor::new(service)?);
    let app = rpc_router(processor, "/rpc");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
    println!("JSON-RPC server listening on http://127.0.0.1:3001/rpc");

    axum::serve(listener, app).await?;
    Ok(())
}
