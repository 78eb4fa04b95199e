// This file is part of Conduit.
//
// Conduit is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Conduit is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Conduit.
// If not, see https://www.gnu.org/licenses/.

use alloy_json_rpc::RpcError;
use alloy_transport::TransportErrorKind;

/// Error enumeration for the Provider trait
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Error response returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the node
        message: String,
    },
    /// Transport or internal errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result of a provider method call
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// The error message as reported by the node, or the rendered error chain otherwise
    pub fn message(&self) -> String {
        match self {
            Self::Rpc { message, .. } => message.clone(),
            Self::Other(error) => format!("{error:#}"),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for ProviderError {
    fn from(value: RpcError<TransportErrorKind>) -> Self {
        match value {
            RpcError::ErrorResp(payload) => Self::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            _ => Self::Other(value.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_json_rpc::ErrorPayload;

    use super::*;

    #[test]
    fn test_error_response_keeps_code_and_message() {
        let payload: ErrorPayload = serde_json::from_str(
            r#"{"code":-32000,"message":"replacement transaction underpriced"}"#,
        )
        .unwrap();
        let error = ProviderError::from(RpcError::<TransportErrorKind>::ErrorResp(payload));

        match &error {
            ProviderError::Rpc { code, message } => {
                assert_eq!(*code, -32000);
                assert_eq!(message, "replacement transaction underpriced");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(error.message(), "replacement transaction underpriced");
    }

    #[test]
    fn test_other_message_includes_chain() {
        let error = ProviderError::from(
            anyhow::anyhow!("no backends available for method").context("sending tx"),
        );
        assert_eq!(
            error.message(),
            "sending tx: no backends available for method"
        );
    }
}
