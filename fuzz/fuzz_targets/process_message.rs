#![no_main]

use ash_rpc_dispatch::*;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn processor() -> &'static RpcProcessor {
    static PROCESSOR: OnceLock<RpcProcessor> = OnceLock::new();
    PROCESSOR.get_or_init(|| {
        let service = ServiceBuilder::new()
            .by_position(
                "add",
                [ParamKind::Integer, ParamKind::Integer],
                |(a, b): (i64, i64)| async move { Ok(a.wrapping_add(b)) },
            )
            .no_params("ping", || async { Ok("pong") })
            .build()
            .unwrap();
        RpcProcessor::builder(service)
            .audit_sink(std::sync::Arc::new(NoopAuditSink))
            .build()
            .unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = runtime
        .block_on(processor().process_message(text))
        .expect("well-behaved handlers never abort a message");

    for response in outcome.responses() {
        assert!(response.is_success() || response.error_code().is_some());
    }
    let _ = outcome.to_json().unwrap();
});
