use crate::domain_model::*;
use crate::domain_port::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_REFRESH_PATH: &str = "/admin/auth/refresh-token";

#[derive(Debug, Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    status: u16,
    data: RefreshData,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    access_token: String,
    refresh_token: String,
    #[serde(rename = "_id")]
    id: String,
}

/// Calls the refresh endpoint over a [`Transport`], without an `Authorization` header.
pub struct ApiRefreshClient {
    transport: Arc<dyn Transport>,
    path: String,
}

impl ApiRefreshClient {
    pub fn new(transport: Arc<dyn Transport>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }
}

fn parse_pair(response: &ApiResponse) -> Result<CredentialPair, RefreshError> {
    if !response.is_success() {
        return Err(RefreshError::Rejected(response.status));
    }
    let envelope: RefreshEnvelope = response
        .json()
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;
    if !(200..300).contains(&envelope.status) {
        return Err(RefreshError::Rejected(envelope.status));
    }
    let RefreshData {
        access_token,
        refresh_token,
        id,
    } = envelope.data;
    if access_token.is_empty() || refresh_token.is_empty() || id.is_empty() {
        return Err(RefreshError::Malformed("empty credential field".to_string()));
    }
    Ok(CredentialPair::new(access_token, refresh_token, id))
}

#[async_trait::async_trait]
impl RefreshClient for ApiRefreshClient {
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<CredentialPair, RefreshError> {
        let body = serde_json::to_value(RefreshBody {
            refresh_token: refresh_token.as_str(),
        })
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        let request = ApiRequest::post(self.path.clone(), body);
        let response = self.transport.execute(&request, None).await?;
        parse_pair(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_http::{FakeApiTransport, FakeRefreshMode};

    #[test]
    fn parses_contract_response() {
        let response = ApiResponse::new(
            200,
            r#"{"status":200,"data":{"access_token":"at2","refresh_token":"rt2","_id":"u1"}}"#,
        );
        assert_eq!(
            parse_pair(&response).unwrap(),
            CredentialPair::new("at2", "rt2", "u1")
        );
    }

    #[test]
    fn envelope_status_must_be_2xx() {
        let response = ApiResponse::new(
            200,
            r#"{"status":403,"data":{"access_token":"a","refresh_token":"r","_id":"u"}}"#,
        );
        assert!(matches!(parse_pair(&response), Err(RefreshError::Rejected(403))));
    }

    #[test]
    fn other_shapes_are_malformed() {
        let response = ApiResponse::new(200, r#"{"status":200,"data":{"token":"x"}}"#);
        assert!(matches!(parse_pair(&response), Err(RefreshError::Malformed(_))));

        let response = ApiResponse::new(200, "not json");
        assert!(matches!(parse_pair(&response), Err(RefreshError::Malformed(_))));
    }

    #[test]
    fn http_error_is_rejected() {
        let response = ApiResponse::new(500, "");
        assert!(matches!(parse_pair(&response), Err(RefreshError::Rejected(500))));
    }

    #[tokio::test]
    async fn exchanges_token_through_transport() {
        let api = Arc::new(FakeApiTransport::new("u1"));
        api.accept_refresh_token("rt1", 1);
        let client = ApiRefreshClient::new(api.clone(), DEFAULT_REFRESH_PATH);

        let pair = client.refresh(&RefreshToken("rt1".to_string())).await.unwrap();
        assert_eq!(pair, CredentialPair::new("at2", "rt2", "u1"));
        assert_eq!(api.refresh_calls(), 1);
        assert_eq!(api.api_calls(), 0);
    }

    #[tokio::test]
    async fn network_failure_is_transport_error() {
        let api = Arc::new(FakeApiTransport::new("u1"));
        api.set_refresh_mode(FakeRefreshMode::NetworkError);
        let client = ApiRefreshClient::new(api, DEFAULT_REFRESH_PATH);

        let err = client
            .refresh(&RefreshToken("rt1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Transport(_)));
    }
}
