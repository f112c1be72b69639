use crate::error::{CoreError, RpcError};

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) id: u64,
    pub(super) method: &'a str,
    /// avalanchego takes named parameters, always as a single object.
    pub(super) params: serde_json::Value,
}

#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<NodeError>,
}

/// avalanchego error object. `data` carries the underlying Go error text,
/// which is often more specific than `message`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NodeError {
    Structured {
        code: i64,
        message: String,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    Other(serde_json::Value),
}

impl JsonRpcResponse {
    pub(super) fn decode(body: &str) -> Result<Self, CoreError> {
        serde_json::from_str(body).map_err(|e| {
            RpcError::InvalidResponse(format!("decode JSON-RPC response: {e}; body={body}")).into()
        })
    }

    /// The call result, or the node's error as [`RpcError::ServerError`].
    /// A missing result is `null`.
    pub(super) fn into_result(self) -> Result<serde_json::Value, CoreError> {
        match self.error {
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
            Some(NodeError::Structured {
                code,
                message,
                data,
            }) => {
                let message = match data.as_ref().and_then(serde_json::Value::as_str) {
                    Some(detail) if !detail.is_empty() && detail != message => {
                        format!("{message}: {detail}")
                    }
                    _ => message,
                };
                Err(RpcError::ServerError { code, message }.into())
            }
            Some(NodeError::Other(raw)) => Err(RpcError::InvalidResponse(format!(
                "unrecognized error object from node: {raw}"
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: serde_json::Value) -> JsonRpcResponse {
        JsonRpcResponse::decode(&json.to_string()).expect("response must decode")
    }

    #[test]
    fn node_error_becomes_server_error() {
        let err = decode(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "couldn't get tx" }
        }))
        .into_result()
        .expect_err("error object must fail the call");
        assert!(matches!(
            err,
            CoreError::Rpc(RpcError::ServerError { code: -32000, ref message }) if message == "couldn't get tx"
        ));
    }

    #[test]
    fn error_data_is_appended_to_message() {
        let err = decode(serde_json::json!({
            "error": { "code": -32000, "message": "couldn't get tx", "data": "not found" }
        }))
        .into_result()
        .expect_err("error object must fail the call");
        assert!(err.to_string().contains("couldn't get tx: not found"));
    }

    #[test]
    fn odd_error_shape_is_invalid_response() {
        let err = decode(serde_json::json!({ "error": "boom" }))
            .into_result()
            .expect_err("error must fail the call");
        assert!(matches!(err, CoreError::Rpc(RpcError::InvalidResponse(_))));
    }

    #[test]
    fn missing_result_is_null() {
        let result = decode(serde_json::json!({ "jsonrpc": "2.0", "id": 3 }))
            .into_result()
            .expect("no error means success");
        assert!(result.is_null());
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let err = JsonRpcResponse::decode("<html>502</html>")
            .err()
            .expect("html must not decode");
        assert!(matches!(err, CoreError::Rpc(RpcError::InvalidResponse(_))));
    }

    #[test]
    fn request_serializes_named_params() {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "platform.getHeight",
            params: serde_json::json!({}),
        };
        let json = serde_json::to_value(&req).expect("request must serialize");
        assert_eq!(json["method"], "platform.getHeight");
        assert_eq!(json["params"], serde_json::json!({}));
    }
}
