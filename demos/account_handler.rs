//! A hand-written `Handler` that answers with the response macros.
//!
//! Run with `cargo run --example account_handler`.

use ash_rpc_dispatch::*;
use std::collections::HashMap;
use std::sync::Mutex;

struct Accounts {
    balances: Mutex<HashMap<String, i64>>,
}

impl Accounts {
    fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::from([("alice".to_string(), 100), ("bob".to_string(), 5)])),
        }
    }
}

#[async_trait]
impl Handler for Accounts {
    fn contracts(&self) -> HashMap<String, MethodContract> {
        HashMap::from([
            ("balance".to_string(), MethodContract::named([("account", ParamKind::String)])),
            (
                "withdraw".to_string(),
                MethodContract::named([("account", ParamKind::String), ("amount", ParamKind::Integer)]),
            ),
        ])
    }

    async fn handle(&self, request: Request) -> Result<Option<Response>, HandlerFault> {
        let account = request
            .params()
            .get_named("account")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();

        let mut balances = self.balances.lock().map_err(|_| "balances lock poisoned")?;
        let Some(balance) = balances.get_mut(&account) else {
            return Ok(Some(rpc_error!(request, -1, format!("unknown account '{}'", account))));
        };

        let response = match request.method() {
            "balance" => rpc_success!(request, *balance),
            _ => {
                let amount = request
                    .params()
                    .get_named("amount")
                    .and_then(|value| value.as_i64())
                    .unwrap_or_default();
                if amount <= 0 {
                    rpc_invalid_params!(request, "amount must be positive")
                } else if amount > *balance {
                    rpc_error!(request, -2, "insufficient funds", {"balance": *balance})
                } else {
                    *balance -= amount;
                    rpc_success!(request, {"balance": *balance})
                }
            }
        };
        Ok(Some(response))
    }
}

#[tokio::main]
async fn main() -> Result<(), HandlerFault> {
    tracing_subscriber::fmt().init();

    let accounts = std::sync::Arc::new(Accounts::new());

    // direct call, bypassing classification
    let request = RequestBuilder::new("balance")
        .named("account", serde_json::json!("alice"))
        .id(0i64)
        .build();
    if let Some(response) = accounts.handle(request).await? {
        println!("direct <-- {}", serde_json::to_string(&response)?);
    }

    let processor = RpcProcessor::new(accounts)?;
    let payloads = [
        r#"{"jsonrpc":"2.0","method":"withdraw","params":{"account":"alice","amount":30},"id":1}"#,
        r#"{"jsonrpc":"2.0","method":"withdraw","params":{"account":"bob","amount":30},"id":2}"#,
        r#"{"jsonrpc":"2.0","method":"withdraw","params":{"account":"bob","amount":0},"id":3}"#,
        r#"{"jsonrpc":"2.0","method":"balance","params":{"account":"carol"},"id":4}"#,
    ];

    for payload in payloads {
        match processor.process_message(payload).await?.to_json()? {
            Some(json) => println!("--> {}\n<-- {}\n", payload, json),
            None => println!("--> {}\n<-- (no content)\n", payload),
        }
    }

    Ok(())
}
