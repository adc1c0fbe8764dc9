//! HTTP implementation of [`MatchTransport`] using `reqwest`
//!
//! Every endpoint is a JSON POST. Non-2xx answers are turned into
//! [`TransportError::Rejected`] when the service explained itself, otherwise
//! [`TransportError::Status`]. A few endpoints answer 200 with
//! `{"status": "error"}`; those are rejected as well.

use super::transport::{MatchTransport, MoveSubmission};
use crate::core::error::{TransportError, TransportResult};
use async_trait::async_trait;
use match_protocol::{
    status, Ack, BoardRequest, BoardResponse, ErrorBody, ForceResetRequest, ForceResetResponse,
    MatchStartStatus, PollRequest, PollResponse, ResetProposal, ResignRequest, ResignResponse,
    Role, RoleRequest, SessionKey, StartMatchRequest, SubmitMoveRequest, SubmitMoveResponse,
    UndoResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

mod endpoint {
    pub const POLL: &str = "get_match_move";
    pub const BOARD: &str = "get_match_board";
    pub const SUBMIT: &str = "submit_match_move";
    pub const REQUEST_RESET: &str = "request_reset_match";
    pub const ACCEPT_RESET: &str = "accept_reset_request";
    pub const FORCE_RESET: &str = "force_reset_match";
    pub const UNDO: &str = "undo_last_move";
    pub const RESIGN: &str = "resign2";
    pub const START: &str = "start_match_game";
    pub const CHECK_START: &str = "check_match_start";
    pub const LEAVE: &str = "leave_match";
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

#[derive(Serialize)]
struct SessionOnly<'a> {
    #[serde(flatten)]
    session: &'a SessionKey,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        // Url::join replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> TransportResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| TransportError::Endpoint(format!("{path}: {e}")))?;
        trace!("[POLL] POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let code = response.status();
        let text = response.text().await?;

        if !code.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.text().map(str::to_string));
            debug!("[POLL] /{} answered {}: {}", path, code, text);
            return Err(match message {
                Some(message) => TransportError::Rejected { message },
                None => TransportError::Status {
                    code: code.as_u16(),
                    body: text,
                },
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn post_ack<B>(&self, path: &str, body: &B) -> TransportResult<Ack>
    where
        B: Serialize + ?Sized + Sync,
    {
        let ack: Ack = self.post_json(path, body).await?;
        if ack.is_ok() {
            Ok(ack)
        } else {
            Err(TransportError::rejected(
                ack.message
                    .unwrap_or_else(|| format!("/{path} was refused")),
            ))
        }
    }
}

fn reject_error_status(status_text: &str, message: Option<String>) -> TransportResult<()> {
    if status_text.eq_ignore_ascii_case(status::ERROR) {
        Err(TransportError::rejected(
            message.unwrap_or_else(|| "service reported an error".to_string()),
        ))
    } else {
        Ok(())
    }
}

#[async_trait]
impl MatchTransport for HttpTransport {
    async fn poll(
        &self,
        session: &SessionKey,
        role: Role,
        client_ply: u32,
    ) -> TransportResult<PollResponse> {
        let request = PollRequest {
            session: session.clone(),
            role,
            client_kifu_len: client_ply,
        };
        let response: PollResponse = self.post_json(endpoint::POLL, &request).await?;
        reject_error_status(&response.status, response.message.clone())?;
        Ok(response)
    }

    async fn fetch_board(
        &self,
        session: &SessionKey,
        player: Role,
    ) -> TransportResult<BoardResponse> {
        let request = BoardRequest {
            session: session.clone(),
            player,
        };
        let response: BoardResponse = self.post_json(endpoint::BOARD, &request).await?;
        reject_error_status(&response.status, response.message.clone())?;
        Ok(response)
    }

    async fn submit_move(
        &self,
        session: &SessionKey,
        role: Role,
        submission: &MoveSubmission,
    ) -> TransportResult<SubmitMoveResponse> {
        let request = SubmitMoveRequest {
            session: session.clone(),
            role,
            from: submission.from,
            to: submission.to,
            drop: submission.drop,
            promote: submission.promote,
            comment: submission.comment.clone(),
        };
        let response: SubmitMoveResponse = self.post_json(endpoint::SUBMIT, &request).await?;
        reject_error_status(&response.status, response.message.clone())?;
        Ok(response)
    }

    async fn request_reset(
        &self,
        session: &SessionKey,
        role: Role,
        comment: &str,
    ) -> TransportResult<Ack> {
        let request = ResetProposal {
            session: session.clone(),
            role,
            comment: comment.to_string(),
        };
        self.post_ack(endpoint::REQUEST_RESET, &request).await
    }

    async fn accept_reset(&self, session: &SessionKey, role: Role) -> TransportResult<Ack> {
        let request = RoleRequest {
            session: session.clone(),
            role,
        };
        self.post_ack(endpoint::ACCEPT_RESET, &request).await
    }

    async fn force_reset(
        &self,
        session: &SessionKey,
        swap_first: bool,
        player_id: &str,
    ) -> TransportResult<ForceResetResponse> {
        let request = ForceResetRequest {
            session: session.clone(),
            swap_first,
            id: player_id.to_string(),
        };
        let response: ForceResetResponse =
            self.post_json(endpoint::FORCE_RESET, &request).await?;
        if !response.ok {
            return Err(TransportError::rejected(
                response
                    .message
                    .unwrap_or_else(|| "force reset was refused".to_string()),
            ));
        }
        Ok(response)
    }

    async fn undo(&self, session: &SessionKey, role: Role) -> TransportResult<UndoResponse> {
        let request = RoleRequest {
            session: session.clone(),
            role,
        };
        let response: UndoResponse = self.post_json(endpoint::UNDO, &request).await?;
        if !response.status.eq_ignore_ascii_case(status::UNDO) {
            return Err(TransportError::rejected(
                response
                    .message
                    .unwrap_or_else(|| "undo was refused".to_string()),
            ));
        }
        Ok(response)
    }

    async fn resign(
        &self,
        session: &SessionKey,
        resigner: Role,
        player_id: &str,
    ) -> TransportResult<ResignResponse> {
        let request = ResignRequest {
            session: session.clone(),
            resigner,
            id: player_id.to_string(),
        };
        let response: ResignResponse = self.post_json(endpoint::RESIGN, &request).await?;
        if !response.success {
            return Err(TransportError::rejected(
                response
                    .error
                    .unwrap_or_else(|| "resignation was refused".to_string()),
            ));
        }
        Ok(response)
    }

    async fn start_match(&self, session: &SessionKey, first: Role) -> TransportResult<Ack> {
        let request = StartMatchRequest {
            session: session.clone(),
            first,
        };
        self.post_ack(endpoint::START, &request).await
    }

    async fn check_match_start(&self, session: &SessionKey) -> TransportResult<MatchStartStatus> {
        self.post_json(endpoint::CHECK_START, &SessionOnly { session })
            .await
    }

    async fn leave_match(&self, session: &SessionKey, role: Role) -> TransportResult<Ack> {
        let request = RoleRequest {
            session: session.clone(),
            role,
        };
        self.post_ack(endpoint::LEAVE, &request).await
    }
}
