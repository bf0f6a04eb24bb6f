//! Response macros for hand-written handlers.
//!
//! Every macro takes the request being answered first and copies its id, so a
//! handler cannot answer with the wrong identifier. Reserved codes are
//! rejected by the dispatcher; `rpc_invalid_params!` covers the one standard
//! code handlers may use.

/// Answer a request with a result
///
/// # Examples:
/// ```text
/// rpc_success!(request, a + b)
/// rpc_success!(request, {"status": "ok"})
/// ```
#[macro_export]
macro_rules! rpc_success {
    ($request:expr_2021, $($result:tt)+) => {
        $crate::ResponseBuilder::reply_to(&$request)
            .success(serde_json::json!($($result)+))
            .build()
    };
}

/// Answer a request with an application error, optionally carrying data
///
/// # Usage:
/// ```text
/// rpc_error!(request, -1, "Account is locked")
/// rpc_error!(request, -2, "Insufficient funds", {"balance": 3})
/// ```
#[macro_export]
macro_rules! rpc_error {
    ($request:expr_2021, $code:expr_2021, $message:expr_2021) => {
        $crate::ResponseBuilder::reply_to(&$request)
            .error($crate::ErrorBuilder::new($code, $message).build())
            .build()
    };
    ($request:expr_2021, $code:expr_2021, $message:expr_2021, $($data:tt)+) => {
        $crate::ResponseBuilder::reply_to(&$request)
            .error(
                $crate::ErrorBuilder::new($code, $message)
                    .data(serde_json::json!($($data)+))
                    .build(),
            )
            .build()
    };
}

/// Answer a request whose parameters passed the contract but cannot be used
///
/// # Usage:
/// ```text
/// rpc_invalid_params!(request, "Divisor must not be zero")
/// ```
#[macro_export]
macro_rules! rpc_invalid_params {
    ($request:expr_2021, $message:expr_2021) => {
        $crate::rpc_error!($request, $crate::error_codes::INVALID_PARAMETERS, $message)
    };
}
