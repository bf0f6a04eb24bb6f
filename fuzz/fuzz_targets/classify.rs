#![no_main]

use ash_rpc_dispatch::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let mut registry = ContractRegistry::new();
    let _ = registry.register("add", MethodContract::positional([ParamKind::Integer, ParamKind::Float]));
    let _ = registry.register(
        "greet",
        MethodContract::named_with([
            ("name", NamedParam::required(ParamKind::String)),
            ("greeting", NamedParam::optional(ParamKind::nullable(ParamKind::String), serde_json::Value::Null)),
        ]),
    );
    let _ = registry.register("ping", MethodContract::no_params());

    match classify(RawEnvelope::from_value(value), &registry) {
        ClassifiedRequest::Valid(request) => assert!(registry.contains(request.method())),
        ClassifiedRequest::Invalid(invalid) => assert!(invalid.kind.is_reserved() || invalid.kind == StandardErrorKind::InvalidParameters),
    }
});
