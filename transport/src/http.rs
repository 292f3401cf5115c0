//! reqwest-backed implementation of the transport traits.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use streakduel_types::{
    AcceptOutcome, ChallengeId, ChallengeRecord, Direction, EventId, InstallId, RevealEvent,
    UserSummary,
};

use crate::api::{ChallengeTransport, IncomingSort, RevealTransport};
use crate::wire::{
    self, AckRequest, AcceptWire, CancelRequest, ChallengeWire, CreateRequest, InstallRequest,
    RespondRequest,
};
use crate::{TransportConfig, TransportError};

const PATH_SEARCH: &str = "/users/search";
const PATH_INCOMING: &str = "/challenges/incoming";
const PATH_OUTGOING: &str = "/challenges/outgoing";
const PATH_CREATE: &str = "/challenges";
const PATH_CANCEL: &str = "/challenges/cancel";
const PATH_DECLINE: &str = "/challenges/decline";
const PATH_ACCEPT: &str = "/challenges/accept";
const PATH_OPENED: &str = "/challenges/opened";
const PATH_REVEAL_NEXT: &str = "/reveals/next";
const PATH_REVEAL_ACK: &str = "/reveals/ack";

/// HTTP client for the challenge server.
///
/// Wraps `reqwest::Client` with the server's base URL. Cheap to clone; clones
/// share the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, TransportError> {
        tracing::debug!(path, "GET");
        let response = self.http.get(self.url(path)).query(query).send().await?;
        check_status(response).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, TransportError> {
        tracing::debug!(path, "POST");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        check_status(response).await
    }
}

/// Map non-2xx responses to `Rejected` when the body names a code, `Status` otherwise.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match wire::parse_error_code(&body) {
        Some(code) => Err(TransportError::Rejected {
            status: status.as_u16(),
            code,
        }),
        None => Err(TransportError::Status(status.as_u16())),
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

#[async_trait]
impl ChallengeTransport for HttpTransport {
    async fn search_users(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<UserSummary>, TransportError> {
        let limit = limit.to_string();
        let response = self.get(PATH_SEARCH, &[("q", query), ("limit", limit.as_str())]).await?;
        decode(response).await
    }

    async fn list_incoming(
        &self,
        install_id: &InstallId,
        limit: u32,
        sort: IncomingSort,
    ) -> Result<Vec<ChallengeRecord>, TransportError> {
        let limit = limit.to_string();
        let response = self
            .get(
                PATH_INCOMING,
                &[
                    ("installId", install_id.as_str()),
                    ("limit", limit.as_str()),
                    ("sort", sort.as_str()),
                ],
            )
            .await?;
        let rows: Option<Vec<serde_json::Value>> = decode(response).await?;
        Ok(wire::into_records(rows.unwrap_or_default(), Direction::Incoming))
    }

    async fn list_outgoing(
        &self,
        install_id: &InstallId,
    ) -> Result<Vec<ChallengeRecord>, TransportError> {
        let response = self
            .get(PATH_OUTGOING, &[("installId", install_id.as_str())])
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let body: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(wire::into_records(wire::outgoing_rows(body), Direction::Outgoing))
    }

    async fn create(
        &self,
        challenger: &InstallId,
        target: &InstallId,
    ) -> Result<ChallengeRecord, TransportError> {
        let response = self
            .post(
                PATH_CREATE,
                &CreateRequest {
                    challenger_install_id: challenger,
                    target_install_id: target,
                },
            )
            .await?;
        let row: ChallengeWire = decode(response).await?;
        row.into_created(target)
    }

    async fn cancel(
        &self,
        challenger: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<(), TransportError> {
        self.post(
            PATH_CANCEL,
            &CancelRequest {
                challenger_install_id: challenger,
                challenge_id,
            },
        )
        .await?;
        Ok(())
    }

    async fn decline(
        &self,
        target: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<(), TransportError> {
        self.post(
            PATH_DECLINE,
            &RespondRequest {
                target_install_id: target,
                challenge_id,
            },
        )
        .await?;
        Ok(())
    }

    async fn accept(
        &self,
        target: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<AcceptOutcome, TransportError> {
        let response = self
            .post(
                PATH_ACCEPT,
                &RespondRequest {
                    target_install_id: target,
                    challenge_id,
                },
            )
            .await?;
        let body: AcceptWire = decode(response).await?;
        body.validate()
    }

    async fn mark_opened(&self, install_id: &InstallId) -> Result<(), TransportError> {
        self.post(PATH_OPENED, &InstallRequest { install_id }).await?;
        Ok(())
    }
}

#[async_trait]
impl RevealTransport for HttpTransport {
    async fn poll_next(
        &self,
        install_id: &InstallId,
    ) -> Result<Option<RevealEvent>, TransportError> {
        let response = self
            .get(PATH_REVEAL_NEXT, &[("installId", install_id.as_str())])
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn ack(&self, install_id: &InstallId, event_id: &EventId) -> Result<(), TransportError> {
        self.post(
            PATH_REVEAL_ACK,
            &AckRequest {
                install_id,
                event_id,
            },
        )
        .await?;
        Ok(())
    }
}
