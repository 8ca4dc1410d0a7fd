use alloy::{primitives::Bytes, transports::TransportError};

pub trait TransportErrorExt {
    /// Returns the revert data if the node answered with an execution error.
    /// Empty revert data (e.g. calling a missing function) still counts as a
    /// revert.
    fn revert_data(&self) -> Option<Bytes>;

    /// Returns whether the node failed to answer the request, as opposed to
    /// the executed code reverting.
    fn is_node_error(&self) -> bool {
        self.revert_data().is_none()
    }
}

impl TransportErrorExt for TransportError {
    fn revert_data(&self) -> Option<Bytes> {
        // alloy's decoding helpers treat empty revert data like no revert at
        // all, so look at the raw error payload instead.
        match self {
            TransportError::ErrorResp(err) => {
                let revert_data = err.as_revert_data();
                tracing::debug!(?err, no_revert_data = revert_data.is_none(), "rpc error response");
                revert_data
            }
            _ => None,
        }
    }
}

/// Create an alloy error carrying revert data. Useful for testing.
#[cfg(any(test, feature = "test-util"))]
pub fn testing_revert_error() -> TransportError {
    let payload: alloy::rpc::json_rpc::ErrorPayload = serde_json::from_value(serde_json::json!({
        "code": 3,
        "message": "execution reverted",
        "data": "0x",
    }))
    .expect("valid error payload");
    TransportError::ErrorResp(payload)
}

/// Create an alloy error that classifies as a node error. Useful for testing.
#[cfg(any(test, feature = "test-util"))]
pub fn testing_node_error() -> TransportError {
    TransportError::ErrorResp(alloy::rpc::json_rpc::ErrorPayload::internal_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_with_empty_data_is_not_a_node_error() {
        let err = testing_revert_error();
        assert_eq!(err.revert_data(), Some(Bytes::new()));
        assert!(!err.is_node_error());
    }

    #[test]
    fn node_errors() {
        assert!(testing_node_error().is_node_error());
        assert!(TransportError::local_usage_str("boom").is_node_error());
    }
}
