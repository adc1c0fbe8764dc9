//! Seam between the sync client and the match service
//!
//! [`SyncClient`](super::SyncClient) only ever talks through this trait, so
//! tests can script the service and the binary can use
//! [`HttpTransport`](super::HttpTransport).

use crate::core::error::TransportResult;
use async_trait::async_trait;
use match_protocol::{
    Ack, BoardResponse, ForceResetResponse, MatchStartStatus, PieceKind, PollResponse,
    ResignResponse, Role, SessionKey, Square, SubmitMoveResponse, UndoResponse,
};
use std::sync::Arc;

/// A move as sent to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSubmission {
    pub from: Option<Square>,
    pub to: Square,
    pub drop: Option<PieceKind>,
    pub promote: bool,
    pub comment: String,
}

#[async_trait]
pub trait MatchTransport: Send + Sync {
    /// One poll for news, reporting how many plies we hold.
    async fn poll(
        &self,
        session: &SessionKey,
        role: Role,
        client_ply: u32,
    ) -> TransportResult<PollResponse>;

    /// Authoritative board as seen by `player`.
    async fn fetch_board(&self, session: &SessionKey, player: Role)
        -> TransportResult<BoardResponse>;

    async fn submit_move(
        &self,
        session: &SessionKey,
        role: Role,
        submission: &MoveSubmission,
    ) -> TransportResult<SubmitMoveResponse>;

    async fn request_reset(
        &self,
        session: &SessionKey,
        role: Role,
        comment: &str,
    ) -> TransportResult<Ack>;

    async fn accept_reset(&self, session: &SessionKey, role: Role) -> TransportResult<Ack>;

    async fn force_reset(
        &self,
        session: &SessionKey,
        swap_first: bool,
        player_id: &str,
    ) -> TransportResult<ForceResetResponse>;

    async fn undo(&self, session: &SessionKey, role: Role) -> TransportResult<UndoResponse>;

    async fn resign(
        &self,
        session: &SessionKey,
        resigner: Role,
        player_id: &str,
    ) -> TransportResult<ResignResponse>;

    async fn start_match(&self, session: &SessionKey, first: Role) -> TransportResult<Ack>;

    async fn check_match_start(&self, session: &SessionKey) -> TransportResult<MatchStartStatus>;

    async fn leave_match(&self, session: &SessionKey, role: Role) -> TransportResult<Ack>;
}

/// Lets callers keep a handle on the transport while the client owns a clone.
#[async_trait]
impl<T: MatchTransport + ?Sized> MatchTransport for Arc<T> {
    async fn poll(
        &self,
        session: &SessionKey,
        role: Role,
        client_ply: u32,
    ) -> TransportResult<PollResponse> {
        (**self).poll(session, role, client_ply).await
    }

    async fn fetch_board(&self, session: &SessionKey, player: Role)
        -> TransportResult<BoardResponse> {
        (**self).fetch_board(session, player).await
    }

    async fn submit_move(
        &self,
        session: &SessionKey,
        role: Role,
        submission: &MoveSubmission,
    ) -> TransportResult<SubmitMoveResponse> {
        (**self).submit_move(session, role, submission).await
    }

    async fn request_reset(
        &self,
        session: &SessionKey,
        role: Role,
        comment: &str,
    ) -> TransportResult<Ack> {
        (**self).request_reset(session, role, comment).await
    }

    async fn accept_reset(&self, session: &SessionKey, role: Role) -> TransportResult<Ack> {
        (**self).accept_reset(session, role).await
    }

    async fn force_reset(
        &self,
        session: &SessionKey,
        swap_first: bool,
        player_id: &str,
    ) -> TransportResult<ForceResetResponse> {
        (**self).force_reset(session, swap_first, player_id).await
    }

    async fn undo(&self, session: &SessionKey, role: Role) -> TransportResult<UndoResponse> {
        (**self).undo(session, role).await
    }

    async fn resign(
        &self,
        session: &SessionKey,
        resigner: Role,
        player_id: &str,
    ) -> TransportResult<ResignResponse> {
        (**self).resign(session, resigner, player_id).await
    }

    async fn start_match(&self, session: &SessionKey, first: Role) -> TransportResult<Ack> {
        (**self).start_match(session, first).await
    }

    async fn check_match_start(&self, session: &SessionKey) -> TransportResult<MatchStartStatus> {
        (**self).check_match_start(session).await
    }

    async fn leave_match(&self, session: &SessionKey, role: Role) -> TransportResult<Ack> {
        (**self).leave_match(session, role).await
    }
}
