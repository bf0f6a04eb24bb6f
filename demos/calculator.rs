//! Hosts a small calculator service and feeds it a few payloads.
//!
//! Run with `RUST_LOG=trace cargo run --example calculator` to see audit events.

use ash_rpc_dispatch::*;
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct Power {
    base: f64,
    exponent: i32,
}

fn calculator() -> Result<ServiceHandler, ConfigurationError> {
    ServiceBuilder::new()
        .by_position(
            "add",
            [ParamKind::Integer, ParamKind::Integer],
            |(a, b): (i64, i64)| async move { a.checked_add(b).ok_or_else(|| ServiceError::new(-1, "overflow")) },
        )
        .by_position(
            "divide",
            [ParamKind::Float, ParamKind::Float],
            |(a, b): (f64, f64)| async move {
                if b == 0.0 {
                    return Err(ServiceError::new(-2, "division by zero").with_data(json!({"dividend": a})));
                }
                Ok(a / b)
            },
        )
        .by_name(
            "power",
            [
                ("base", NamedParam::required(ParamKind::Float)),
                ("exponent", NamedParam::optional(ParamKind::Integer, json!(2))),
            ],
            |args: Power| async move { Ok(args.base.powi(args.exponent)) },
        )
        .notification("log", MethodContract::positional([ParamKind::String]), |params| async move {
            if let Some(line) = params.get(0).and_then(|value| value.as_str()) {
                tracing::info!(line, "client log");
            }
            Ok(())
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let processor = RpcProcessor::builder(calculator()?)
        .config(ProcessorConfig::builder().expose_error_details(true).max_batch_size(16).build())
        .build()?;

    let payloads = [
        r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#,
        r#"{"jsonrpc":"2.0","method":"add","params":[2],"id":2}"#,
        r#"{"jsonrpc":"2.0","method":"power","params":{"base":3},"id":"p"}"#,
        r#"{"jsonrpc":"2.0","method":"divide","params":[1,0],"id":3}"#,
        r#"{"jsonrpc":"2.0","method":"log","params":["hello"]}"#,
        r#"[{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1},{"jsonrpc":"2.0","method":"add","params":[2,2],"id":1}]"#,
        r#"[{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1},{"jsonrpc":"2.0","method":"log","params":["x"]},{"jsonrpc":"2.0","method":"sqrt","id":2}]"#,
        r#"{"jsonrpc":"2.0","method":"#,
    ];

    for payload in payloads {
        let outcome = processor.process_message(payload).await?;
        match outcome.to_json()? {
            Some(json) => println!("--> {}\n<-- {}\n", payload, json),
            None => println!("--> {}\n<-- (no content)\n", payload),
        }
    }

    Ok(())
}
