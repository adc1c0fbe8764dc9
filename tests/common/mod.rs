//! Shared fixtures: a scripted match service and a presenter that records
//! everything it is asked to show.

#![allow(dead_code)]

use async_trait::async_trait;
use match_protocol::{
    Ack, BoardResponse, ForceResetResponse, MatchStartStatus, PollResponse, ResignResponse, Role,
    SessionKey, SubmitMoveResponse, UndoResponse,
};
use parking_lot::Mutex;
use shogi_sync::core::error::{TransportError, TransportResult};
use shogi_sync::core::settings::PollDelays;
use shogi_sync::game::{BoardView, MatchSession};
use shogi_sync::networking::transport::{MatchTransport, MoveSubmission};
use shogi_sync::networking::SyncClient;
use shogi_sync::ui::Presenter;
use std::collections::VecDeque;

// ============================================================================
// Scripted transport
// ============================================================================

/// One recorded call to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Poll { role: Role, client_ply: u32 },
    FetchBoard { player: Role },
    SubmitMove { role: Role, to: u8, comment: String },
    RequestReset { role: Role, comment: String },
    AcceptReset { role: Role },
    ForceReset { swap_first: bool, player_id: String },
    Undo { role: Role },
    Resign { resigner: Role, player_id: String },
    StartMatch { first: Role },
    CheckMatchStart,
    LeaveMatch { role: Role },
}

type Reply<T> = TransportResult<T>;

/// Answers every call from a queue. An empty queue answers with a
/// connection-style error, which is what an unreachable service looks like.
#[derive(Default)]
pub struct ScriptedTransport {
    polls: Mutex<VecDeque<Reply<PollResponse>>>,
    boards: Mutex<VecDeque<Reply<BoardResponse>>>,
    submits: Mutex<VecDeque<Reply<SubmitMoveResponse>>>,
    undos: Mutex<VecDeque<Reply<UndoResponse>>>,
    resigns: Mutex<VecDeque<Reply<ResignResponse>>>,
    force_resets: Mutex<VecDeque<Reply<ForceResetResponse>>>,
    acks: Mutex<VecDeque<Reply<Ack>>>,
    starts: Mutex<VecDeque<Reply<MatchStartStatus>>>,
    calls: Mutex<Vec<Call>>,
}

fn next<T>(queue: &Mutex<VecDeque<Reply<T>>>, what: &str) -> Reply<T> {
    queue
        .lock()
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::Endpoint(format!("no scripted {what}"))))
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_poll(&self, response: PollResponse) {
        self.polls.lock().push_back(Ok(response));
    }

    pub fn push_poll_error(&self, error: TransportError) {
        self.polls.lock().push_back(Err(error));
    }

    pub fn push_board(&self, response: BoardResponse) {
        self.boards.lock().push_back(Ok(response));
    }

    pub fn push_submit(&self, response: SubmitMoveResponse) {
        self.submits.lock().push_back(Ok(response));
    }

    pub fn push_undo(&self, response: Reply<UndoResponse>) {
        self.undos.lock().push_back(response);
    }

    pub fn push_resign(&self, response: ResignResponse) {
        self.resigns.lock().push_back(Ok(response));
    }

    pub fn push_force_reset(&self, response: ForceResetResponse) {
        self.force_resets.lock().push_back(Ok(response));
    }

    pub fn push_ack(&self, response: Reply<Ack>) {
        self.acks.lock().push_back(response);
    }

    pub fn push_start_status(&self, response: MatchStartStatus) {
        self.starts.lock().push_back(Ok(response));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Poll { .. }))
            .count()
    }

    pub fn last_poll_ply(&self) -> Option<u32> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            Call::Poll { client_ply, .. } => Some(*client_ply),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl MatchTransport for ScriptedTransport {
    async fn poll(
        &self,
        _session: &SessionKey,
        role: Role,
        client_ply: u32,
    ) -> TransportResult<PollResponse> {
        self.record(Call::Poll { role, client_ply });
        next(&self.polls, "poll")
    }

    async fn fetch_board(
        &self,
        _session: &SessionKey,
        player: Role,
    ) -> TransportResult<BoardResponse> {
        self.record(Call::FetchBoard { player });
        next(&self.boards, "board")
    }

    async fn submit_move(
        &self,
        _session: &SessionKey,
        role: Role,
        submission: &MoveSubmission,
    ) -> TransportResult<SubmitMoveResponse> {
        self.record(Call::SubmitMove {
            role,
            to: submission.to,
            comment: submission.comment.clone(),
        });
        next(&self.submits, "submit")
    }

    async fn request_reset(
        &self,
        _session: &SessionKey,
        role: Role,
        comment: &str,
    ) -> TransportResult<Ack> {
        self.record(Call::RequestReset {
            role,
            comment: comment.to_string(),
        });
        next(&self.acks, "ack")
    }

    async fn accept_reset(&self, _session: &SessionKey, role: Role) -> TransportResult<Ack> {
        self.record(Call::AcceptReset { role });
        next(&self.acks, "ack")
    }

    async fn force_reset(
        &self,
        _session: &SessionKey,
        swap_first: bool,
        player_id: &str,
    ) -> TransportResult<ForceResetResponse> {
        self.record(Call::ForceReset {
            swap_first,
            player_id: player_id.to_string(),
        });
        next(&self.force_resets, "force reset")
    }

    async fn undo(&self, _session: &SessionKey, role: Role) -> TransportResult<UndoResponse> {
        self.record(Call::Undo { role });
        next(&self.undos, "undo")
    }

    async fn resign(
        &self,
        _session: &SessionKey,
        resigner: Role,
        player_id: &str,
    ) -> TransportResult<ResignResponse> {
        self.record(Call::Resign {
            resigner,
            player_id: player_id.to_string(),
        });
        next(&self.resigns, "resign")
    }

    async fn start_match(&self, _session: &SessionKey, first: Role) -> TransportResult<Ack> {
        self.record(Call::StartMatch { first });
        next(&self.acks, "ack")
    }

    async fn check_match_start(&self, _session: &SessionKey) -> TransportResult<MatchStartStatus> {
        self.record(Call::CheckMatchStart);
        next(&self.starts, "match start")
    }

    async fn leave_match(&self, _session: &SessionKey, role: Role) -> TransportResult<Ack> {
        self.record(Call::LeaveMatch { role });
        Ok(Ack::ok())
    }
}

// ============================================================================
// Recording presenter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Board(BoardView),
    Turn(bool),
    Status(String),
    Check(bool),
    OpponentComment(String),
    ResetOffer { from: Role, comment: String },
    ResetRequested,
    ResetPromptCleared,
    GameOver(String),
    Interaction(bool),
    Undo(bool),
}

#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub shown: Vec<Shown>,
}

impl RecordingPresenter {
    pub fn count(&self, pred: impl Fn(&Shown) -> bool) -> usize {
        self.shown.iter().filter(|shown| pred(shown)).count()
    }

    pub fn game_over_messages(&self) -> Vec<String> {
        self.shown
            .iter()
            .filter_map(|shown| match shown {
                Shown::GameOver(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_undo_availability(&self) -> Option<bool> {
        self.shown.iter().rev().find_map(|shown| match shown {
            Shown::Undo(available) => Some(*available),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn render_board(&mut self, view: &BoardView) {
        self.shown.push(Shown::Board(view.clone()));
    }

    fn show_turn(&mut self, my_turn: bool) {
        self.shown.push(Shown::Turn(my_turn));
    }

    fn show_status(&mut self, message: &str) {
        self.shown.push(Shown::Status(message.to_string()));
    }

    fn show_check(&mut self, in_check: bool) {
        self.shown.push(Shown::Check(in_check));
    }

    fn show_opponent_comment(&mut self, comment: &str) {
        self.shown.push(Shown::OpponentComment(comment.to_string()));
    }

    fn offer_reset_acceptance(&mut self, from: Role, comment: &str) {
        self.shown.push(Shown::ResetOffer {
            from,
            comment: comment.to_string(),
        });
    }

    fn note_reset_requested(&mut self) {
        self.shown.push(Shown::ResetRequested);
    }

    fn clear_reset_prompt(&mut self) {
        self.shown.push(Shown::ResetPromptCleared);
    }

    fn show_game_over(&mut self, message: &str) {
        self.shown.push(Shown::GameOver(message.to_string()));
    }

    fn set_interaction_enabled(&mut self, enabled: bool) {
        self.shown.push(Shown::Interaction(enabled));
    }

    fn set_undo_available(&mut self, available: bool) {
        self.shown.push(Shown::Undo(available));
    }
}

// ============================================================================
// Builders
// ============================================================================

pub type TestClient = SyncClient<ScriptedTransport, RecordingPresenter>;

pub fn session(role: Role) -> MatchSession {
    MatchSession::new(SessionKey::new("alice", "bob"), role, Role::Main)
}

pub fn client(role: Role) -> TestClient {
    SyncClient::new(
        ScriptedTransport::new(),
        RecordingPresenter::default(),
        session(role),
        PollDelays::default(),
    )
}

pub fn empty_board() -> Vec<Vec<String>> {
    vec![vec![String::new(); 9]; 9]
}

pub fn board_at(ply: u32, turn: Role, epoch: u64) -> BoardResponse {
    BoardResponse {
        status: "ok".into(),
        board: Some(empty_board()),
        turn: Some(turn),
        first: Some(Role::Main),
        kifu_len: Some(ply),
        reset_epoch: Some(epoch),
        phase: Some(if ply == 0 { "init" } else { "playing" }.into()),
        ..BoardResponse::default()
    }
}

pub fn wait(ply: u32, epoch: u64) -> PollResponse {
    PollResponse {
        status: "wait".into(),
        kifu_len: Some(ply),
        reset_epoch: Some(epoch),
        phase: Some("playing".into()),
        ..PollResponse::default()
    }
}

pub fn ack() -> TransportResult<Ack> {
    Ok(Ack::ok())
}

/// Parse a poll answer exactly as the service would send it.
pub fn poll_json(value: serde_json::Value) -> PollResponse {
    serde_json::from_value(value).expect("scripted poll payload must decode")
}

/// Start a match and run the entry board fetch so the client is `Active`.
pub async fn started(role: Role) -> TestClient {
    let mut client = client(role);
    client.transport().push_board(board_at(0, Role::Main, 1));
    if role == Role::Main {
        client.transport().push_ack(ack());
        client.start_match().await.expect("match starts");
    } else {
        client
            .transport()
            .push_start_status(MatchStartStatus {
                started: true,
                first: Some(Role::Main),
            });
        enter_when_started(&mut client).await;
    }
    client
}

/// Begin the match-start watch and run one check, which must enter the match.
pub async fn enter_when_started(client: &mut TestClient) {
    client.await_match_start().await.expect("watch begins");
    assert!(client.match_start_tick().await, "match entered");
    assert!(!client.start_watch().is_active());
}
