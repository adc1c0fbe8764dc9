//! Sync client - owner of all match state and the poll loop
//!
//! # Architecture
//!
//! One [`SyncClient`] value owns the transport, the presenter and every
//! piece of match state. Its [`run`](SyncClient::run) loop selects between:
//!
//! - the poll scheduler: [`tick`](SyncClient::tick) polls once, classifies
//!   the answer, lets [`plan`] pick a directive, carries it out and
//!   reschedules,
//! - the post-game heartbeat,
//! - the match-start watch: [`match_start_tick`](SyncClient::match_start_tick)
//!   asks whether the other side has started the match,
//! - user [`Intent`]s from an mpsc channel.
//!
//! Each branch is awaited to completion before the next select, so there is
//! never more than one poll in flight and every response is handled against
//! the phase as it is when the response arrives.
//!
//! Transport and protocol failures never stop the loop; they only push the
//! next tick back by the error backoff.

use super::classify::{board_view, classify, Classified};
use super::heartbeat::PostGameHeartbeat;
use super::scheduler::PollScheduler;
use super::transport::{MatchTransport, MoveSubmission};
use crate::core::error::{ActionError, ActionResult, PreconditionError, TickFault};
use crate::core::settings::PollDelays;
use crate::game::dispatch::{plan, DispatchContext, Directive};
use crate::game::move_gate::{MoveGate, Rejection};
use crate::game::phase::{GamePhase, PhaseEvent};
use crate::game::reset::{RequestNotice, ResetNegotiator};
use crate::game::state::{MatchSession, MatchState, OverrideCause};
use crate::game::termination::TerminationHandler;
use crate::game::types::{
    BoardView, FinishInfo, FinishReason, Markers, MoveIntent, MoveRecord,
};
use crate::game::undo::UndoCoordinator;
use crate::ui::Presenter;
use match_protocol::{status, BoardResponse, Role};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A user action delivered to the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    StartMatch,
    AwaitMatchStart,
    SubmitMove(MoveIntent),
    RequestReset { comment: String },
    AcceptReset,
    ForceReset { swap_first: bool },
    Undo,
    Resign,
    Leave,
}

pub struct SyncClient<T: MatchTransport, P: Presenter> {
    transport: T,
    presenter: P,
    delays: PollDelays,
    state: MatchState,
    scheduler: PollScheduler,
    start_watch: PollScheduler,
    heartbeat: PostGameHeartbeat,
    gate: MoveGate,
    reset: ResetNegotiator,
    undo: UndoCoordinator,
}

impl<T: MatchTransport, P: Presenter> SyncClient<T, P> {
    pub fn new(transport: T, presenter: P, session: MatchSession, delays: PollDelays) -> Self {
        Self {
            transport,
            presenter,
            delays,
            state: MatchState::new(session),
            scheduler: PollScheduler::new("poll"),
            start_watch: PollScheduler::new("match_start"),
            heartbeat: PostGameHeartbeat::new(),
            gate: MoveGate::new(),
            reset: ResetNegotiator::new(),
            undo: UndoCoordinator::new(),
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn start_watch(&self) -> &PollScheduler {
        &self.start_watch
    }

    pub fn heartbeat(&self) -> &PostGameHeartbeat {
        &self.heartbeat
    }

    pub fn reset_negotiator(&self) -> &ResetNegotiator {
        &self.reset
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Drive the client until a `Leave` intent arrives or the channel closes.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        info!("[SYNC] Run loop started as {}", self.state.role());
        loop {
            let keep_running = tokio::select! {
                _ = self.scheduler.fired() => {
                    self.tick().await;
                    true
                }
                _ = self.heartbeat.fired() => {
                    self.heartbeat_tick().await;
                    true
                }
                _ = self.start_watch.fired() => {
                    self.match_start_tick().await;
                    true
                }
                intent = intents.recv() => match intent {
                    Some(Intent::Leave) | None => false,
                    Some(intent) => {
                        self.handle_intent(intent).await;
                        true
                    }
                },
            };

            if !keep_running {
                break;
            }
        }
        self.leave().await;
    }

    async fn handle_intent(&mut self, intent: Intent) {
        let (operation, result) = match intent {
            Intent::StartMatch => ("start_match", self.start_match().await),
            Intent::AwaitMatchStart => ("await_match_start", self.await_match_start().await),
            Intent::SubmitMove(intent) => ("submit_move", self.submit_move(intent).await),
            Intent::RequestReset { comment } => {
                ("request_reset", self.request_reset(comment).await)
            }
            Intent::AcceptReset => ("accept_reset", self.accept_reset().await),
            Intent::ForceReset { swap_first } => {
                ("force_reset", self.force_reset(swap_first).await)
            }
            Intent::Undo => ("undo", self.request_undo().await),
            Intent::Resign => ("resign", self.resign().await),
            Intent::Leave => return,
        };

        if let Err(e) = result {
            warn!("[SYNC] {} refused: {}", operation, e);
            self.presenter.show_status(&e.to_string());
        }
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Poll once, act on the answer and schedule the next tick.
    ///
    /// Returns the delay that was scheduled, or `None` when polling is stopped
    /// (not started, or the game ended during this tick).
    pub async fn tick(&mut self) -> Option<Duration> {
        if !self.state.phase().is_polling() {
            debug!("[POLL] Tick skipped in phase {}", self.state.phase());
            return None;
        }

        let delay = match self.poll_once().await {
            Ok(delay) => delay,
            Err(TickFault::Transport(e)) => {
                warn!("[POLL] Poll failed, backing off: {}", e);
                self.delays.error_backoff()
            }
            Err(TickFault::Protocol(detail)) => {
                warn!("[POLL] Protocol violation, discarding answer: {}", detail);
                self.delays.error_backoff()
            }
        };

        if self.scheduler.is_active() {
            self.scheduler.queue_next(delay);
            Some(delay)
        } else {
            None
        }
    }

    async fn poll_once(&mut self) -> Result<Duration, TickFault> {
        let response = self
            .transport
            .poll(&self.state.session.key, self.state.role(), self.state.ply())
            .await?;
        let Classified { outcome, markers } = classify(response)?;

        let epoch_changed = self.state.observe_markers(&markers);
        self.relay_comment(&markers);

        let context = DispatchContext {
            phase: self.state.phase(),
            epoch_changed,
        };
        debug!(
            "[POLL] {} in phase {} (ply {})",
            outcome.label(),
            context.phase,
            self.state.ply()
        );

        let directive = plan(context, outcome);
        self.execute(directive).await
    }

    async fn execute(&mut self, directive: Directive) -> Result<Duration, TickFault> {
        match directive {
            Directive::CompleteReset => {
                if self.reset.begin_reset(&mut self.state) {
                    self.presenter.clear_reset_prompt();
                }
                self.reinitialize().await
            }
            Directive::Reinitialize => self.reinitialize().await,
            Directive::Resync { ply } => {
                info!("[POLL] Resync requested by service (ply {})", ply);
                self.state.zero_mirrors(OverrideCause::Resync);
                let board = self
                    .transport
                    .fetch_board(&self.state.session.key, self.state.role())
                    .await?;
                self.adopt_board(board, OverrideCause::Resync);
                self.refresh_undo();
                Ok(self.cadence())
            }
            Directive::ObserveResetRequest { initiator, comment } => {
                match self
                    .reset
                    .observe_request(&mut self.state, initiator, comment)
                {
                    RequestNotice::PromptLocal { comment } => {
                        self.presenter.offer_reset_acceptance(initiator, &comment);
                        self.presenter.set_undo_available(false);
                    }
                    RequestNotice::AwaitingPeer | RequestNotice::AlreadyPrompted => {}
                }
                Ok(self.delays.reset_pending())
            }
            Directive::Hold => Ok(self.cadence()),
            Directive::Finalize(info) => {
                self.finalize(info);
                Ok(self.cadence())
            }
            Directive::ApplyMove {
                record,
                ply,
                board,
                in_check,
            } => Ok(self.apply_opponent_move(record, ply, board, in_check)),
            Directive::ApplyUndo { ply, turn, board } => {
                UndoCoordinator::apply_peer_undo(&mut self.state, ply, turn);
                match board {
                    Some(view) => self.show_board(view),
                    None => self.refetch_board_view().await,
                }
                self.presenter.show_turn(self.state.is_my_turn());
                self.presenter.show_check(false);
                self.refresh_undo();
                Ok(self.delays.after_undo())
            }
            Directive::Idle => {
                self.refresh_undo();
                Ok(self.cadence())
            }
            Directive::Discard(reason) => {
                debug!("[POLL] Discarded: {}", reason);
                Ok(self.cadence())
            }
        }
    }

    fn apply_opponent_move(
        &mut self,
        record: MoveRecord,
        ply: Option<u32>,
        board: Option<BoardView>,
        in_check: bool,
    ) -> Duration {
        let admission = match self.gate.admit(&self.state, &record, ply) {
            Ok(admission) => admission,
            Err(Rejection::Busy) => return self.delays.busy(),
            Err(rejection) => {
                debug!("[MOVE_GATE] Ignored reported move: {:?}", rejection);
                return self.cadence();
            }
        };

        if let Some(view) = board {
            self.show_board(view);
        }
        self.gate
            .complete(&mut self.state, admission, record, in_check);

        self.presenter.show_check(in_check);
        self.presenter.show_turn(true);
        self.refresh_undo();
        self.delays.own_turn()
    }

    /// Fetch the initial position after an accepted or forced reset.
    async fn reinitialize(&mut self) -> Result<Duration, TickFault> {
        if self.state.phase() != GamePhase::Resetting {
            return Ok(self.cadence());
        }

        let board = self
            .transport
            .fetch_board(&self.state.session.key, self.state.role())
            .await?;
        self.adopt_board(board, OverrideCause::ResetAccepted);
        self.reset.finish_reset(&mut self.state);
        self.gate.abandon();
        self.undo.failed();

        info!("[RESET] Reinitialised, {} moves first", self.state.session.first);
        self.presenter.show_status("New game started");
        self.presenter.set_interaction_enabled(true);
        self.refresh_undo();
        Ok(self.cadence())
    }

    // ========================================================================
    // Post-game
    // ========================================================================

    /// One heartbeat check while the game is over. Returns `true` on recovery.
    pub async fn heartbeat_tick(&mut self) -> bool {
        if self.state.phase() != GamePhase::PostGameRecovery {
            self.heartbeat.disarm();
            return false;
        }

        let board = match self
            .transport
            .fetch_board(&self.state.session.key, self.state.role())
            .await
        {
            Ok(board) => board,
            Err(e) => {
                debug!("[HEARTBEAT] Check failed, retrying: {}", e);
                self.heartbeat.reschedule(self.delays.heartbeat());
                return false;
            }
        };

        if !self.heartbeat.detect(&board) {
            self.heartbeat.reschedule(self.delays.heartbeat());
            return false;
        }

        self.heartbeat.disarm();
        self.state.zero_mirrors(OverrideCause::Recovery);
        self.adopt_board(board, OverrideCause::Recovery);
        self.state.transition(PhaseEvent::RecoveryDetected);
        self.gate.abandon();

        self.presenter.show_status("New game started");
        self.presenter.set_interaction_enabled(true);
        self.refresh_undo();
        self.scheduler.start(Duration::ZERO);
        true
    }

    fn finalize(&mut self, info: FinishInfo) -> bool {
        if !TerminationHandler::finalize(&mut self.state, &info) {
            return false;
        }

        self.scheduler.stop();
        self.gate.abandon();
        self.reset.clear();
        self.presenter.clear_reset_prompt();
        self.presenter.set_interaction_enabled(false);
        self.presenter.set_undo_available(false);
        self.presenter.show_check(false);
        if let Some(view) = &info.board {
            self.presenter.render_board(view);
        }
        let message = TerminationHandler::outcome_message(&self.state.session, &info);
        self.presenter.show_game_over(&message);

        TerminationHandler::arm_heartbeat(&mut self.state);
        self.heartbeat
            .arm(self.state.known_epoch, self.delays.heartbeat());
        true
    }

    // ========================================================================
    // User intents
    // ========================================================================

    /// Ask the service to start the match, then enter it.
    pub async fn start_match(&mut self) -> ActionResult<()> {
        self.require_phase("start_match", GamePhase::Idle)?;
        self.transport
            .start_match(&self.state.session.key, self.state.session.first)
            .await
            .map_err(|e| ActionError::failed("start_match", e))?;
        info!("[SYNC] Match start sent, {} moves first", self.state.session.first);
        self.enter_match().await
    }

    /// Start watching for the other side to start the match.
    ///
    /// Returns at once; the run loop checks the service on the
    /// `match_start` schedule and enters the match when it reports started.
    pub async fn await_match_start(&mut self) -> ActionResult<()> {
        self.require_phase("await_match_start", GamePhase::Idle)?;
        self.presenter.show_status("Waiting for the match to start");
        self.start_watch.start(Duration::ZERO);
        Ok(())
    }

    /// One match-start check. Returns `true` once the match has been entered.
    pub async fn match_start_tick(&mut self) -> bool {
        if self.state.phase() != GamePhase::Idle {
            self.start_watch.stop();
            return false;
        }

        match self
            .transport
            .check_match_start(&self.state.session.key)
            .await
        {
            Ok(started) if started.started => {
                if let Some(first) = started.first {
                    self.state.session.first = first;
                }
                match self.enter_match().await {
                    Ok(()) => {
                        self.start_watch.stop();
                        return true;
                    }
                    Err(e) => warn!("[SYNC] Match started but entry failed: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => debug!("[SYNC] Match start check failed: {}", e),
        }

        self.start_watch.queue_next(self.delays.match_start());
        false
    }

    async fn enter_match(&mut self) -> ActionResult<()> {
        let board = self
            .transport
            .fetch_board(&self.state.session.key, self.state.role())
            .await
            .map_err(|e| ActionError::failed("enter_match", e))?;

        self.state.zero_mirrors(OverrideCause::MatchEntry);
        self.adopt_board(board, OverrideCause::MatchEntry);
        self.state.transition(PhaseEvent::MatchStarted);
        info!(
            "[SYNC] Match entered as {}, {} moves first",
            self.state.role(),
            self.state.session.first
        );

        self.presenter.set_interaction_enabled(true);
        self.refresh_undo();
        self.scheduler.start(Duration::ZERO);
        Ok(())
    }

    pub async fn submit_move(&mut self, intent: MoveIntent) -> ActionResult<()> {
        let intent = intent.validated()?;
        self.require_phase("submit_move", GamePhase::Active)?;
        if !self.state.is_my_turn() {
            return Err(PreconditionError::NotYourTurn.into());
        }

        let submission = MoveSubmission {
            from: intent.from,
            to: intent.to,
            drop: intent.drop,
            promote: intent.promote,
            comment: intent.comment.clone(),
        };
        let response = self
            .transport
            .submit_move(&self.state.session.key, self.state.role(), &submission)
            .await
            .map_err(|e| ActionError::failed("submit_move", e))?;

        if !response.status.eq_ignore_ascii_case(status::MOVE) {
            return Err(ActionError::Failed {
                operation: "submit_move",
                reason: response
                    .message
                    .unwrap_or_else(|| format!("unexpected status '{}'", response.status)),
            });
        }

        let role = self.state.role();
        let record = MoveRecord {
            from: intent.from,
            to: intent.to,
            drop: intent.drop,
            promote: intent.promote,
            by: Some(role),
        };
        if let Some(view) = board_view(response.board, response.captured) {
            self.show_board(view.highlighted(record.highlight()));
        }

        self.state.history.push(record);
        match response.kifu_len {
            Some(ply) => {
                if !self.state.advance_ply(ply) {
                    warn!(
                        "[SYNC] Service ply {} is behind local {}",
                        ply,
                        self.state.ply()
                    );
                }
            }
            None => self.state.increment_ply(),
        }
        self.state.last_self_ply = self.state.ply();
        self.state.last_mover = Some(role);
        self.state.in_check = false;
        self.presenter.show_check(false);
        info!("[SYNC] Move accepted at ply {}", self.state.ply());

        if response.finished {
            let reason = response
                .reason
                .as_deref()
                .and_then(FinishReason::parse)
                .unwrap_or(FinishReason::Checkmate);
            self.finalize(FinishInfo {
                reason,
                winner: response.winner.or(Some(role)),
                resigner: None,
                resigner_id: None,
                board: None,
            });
            return Ok(());
        }

        self.state.turn = Some(response.turn.unwrap_or(self.state.session.peer()));
        self.presenter.show_turn(self.state.is_my_turn());
        self.refresh_undo();
        self.scheduler.start(Duration::ZERO);
        Ok(())
    }

    pub async fn request_reset(&mut self, comment: String) -> ActionResult<()> {
        self.reset.check_request(&self.state)?;
        self.transport
            .request_reset(&self.state.session.key, self.state.role(), &comment)
            .await
            .map_err(|e| ActionError::failed("request_reset", e))?;

        self.reset.proposal_sent(&mut self.state, comment);
        self.presenter.note_reset_requested();
        self.presenter.set_undo_available(false);
        self.scheduler.start(self.delays.reset_pending());
        Ok(())
    }

    pub async fn accept_reset(&mut self) -> ActionResult<()> {
        self.reset.check_accept(&self.state)?;
        self.transport
            .accept_reset(&self.state.session.key, self.state.role())
            .await
            .map_err(|e| ActionError::failed("accept_reset", e))?;

        // The service reinitialises the session when it next reports the
        // acceptance, so the initial position is fetched from the next tick.
        self.reset.begin_reset(&mut self.state);
        self.presenter.clear_reset_prompt();
        self.presenter.show_status("Reset accepted, preparing a new game");
        self.presenter.set_undo_available(false);
        self.scheduler.start(Duration::ZERO);
        Ok(())
    }

    /// Restart the game from any phase without negotiation (main only).
    pub async fn force_reset(&mut self, swap_first: bool) -> ActionResult<()> {
        if self.state.role() != Role::Main {
            return Err(PreconditionError::MainOnly.into());
        }

        let response = self
            .transport
            .force_reset(
                &self.state.session.key,
                swap_first,
                &self.state.session.player_id,
            )
            .await
            .map_err(|e| ActionError::failed("force_reset", e))?;

        self.heartbeat.disarm();
        self.reset.clear();
        self.presenter.clear_reset_prompt();
        if let Some(first) = response.first {
            self.state.session.first = first;
        }
        if let Some(epoch) = response.reset_epoch {
            self.state.known_epoch = Some(epoch);
        }
        self.state.transition(PhaseEvent::ForceReset);
        self.state.zero_mirrors(OverrideCause::ForceReset);
        info!("[RESET] Forced reset (swap_first={})", swap_first);

        let delay = match self.reinitialize().await {
            Ok(delay) => delay,
            Err(e) => {
                warn!("[RESET] Initial position not available yet: {}", e);
                self.delays.resetting()
            }
        };
        self.scheduler.start(delay);
        Ok(())
    }

    pub async fn request_undo(&mut self) -> ActionResult<()> {
        self.undo.begin(&self.state)?;
        self.presenter.set_undo_available(false);

        let response = match self
            .transport
            .undo(&self.state.session.key, self.state.role())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.undo.failed();
                self.refresh_undo();
                return Err(ActionError::failed("undo", e));
            }
        };

        if let Some(first) = response.first {
            self.state.session.first = first;
        }
        let ply = response
            .kifu_len
            .unwrap_or_else(|| self.state.ply().saturating_sub(1));
        self.undo
            .succeeded(&mut self.state, ply, response.turn, response.last_by);

        match board_view(response.board, response.captured) {
            Some(view) => self.show_board(view),
            None => self.refetch_board_view().await,
        }
        self.presenter.show_check(false);
        self.presenter.show_turn(self.state.is_my_turn());
        self.refresh_undo();
        self.scheduler.start(Duration::ZERO);
        Ok(())
    }

    pub async fn resign(&mut self) -> ActionResult<()> {
        let phase = self.state.phase();
        if !matches!(phase, GamePhase::Active | GamePhase::ResetRequested) {
            return Err(PreconditionError::WrongPhase {
                operation: "resign",
                phase,
            }
            .into());
        }

        let role = self.state.role();
        let response = self
            .transport
            .resign(&self.state.session.key, role, &self.state.session.player_id)
            .await
            .map_err(|e| ActionError::failed("resign", e))?;

        let reason = response
            .reason
            .as_deref()
            .and_then(FinishReason::parse)
            .unwrap_or(FinishReason::Resign);
        self.finalize(FinishInfo {
            reason,
            winner: response.winner.or(Some(role.peer())),
            resigner: response.resigner.or(Some(role)),
            resigner_id: response.resigner_id,
            board: None,
        });
        Ok(())
    }

    /// Stop polling, tell the service (best effort) and drop the session.
    pub async fn leave(mut self) {
        self.scheduler.stop();
        self.start_watch.stop();
        self.heartbeat.disarm();
        if let Err(e) = self
            .transport
            .leave_match(&self.state.session.key, self.state.role())
            .await
        {
            warn!("[SYNC] Leave notification failed: {}", e);
        }
        info!("[SYNC] Left match {:?}", self.state.session.key);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn require_phase(
        &self,
        operation: &'static str,
        expected: GamePhase,
    ) -> Result<(), PreconditionError> {
        let phase = self.state.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(PreconditionError::WrongPhase { operation, phase })
        }
    }

    /// Poll delay for the current situation.
    fn cadence(&self) -> Duration {
        match self.state.phase() {
            GamePhase::ResetRequested => self.delays.reset_pending(),
            GamePhase::Resetting => self.delays.resetting(),
            GamePhase::Active if self.state.is_my_turn() => self.delays.own_turn(),
            _ => self.delays.opponent_turn(),
        }
    }

    fn show_board(&mut self, view: BoardView) {
        self.presenter.render_board(&view);
        self.state.board = Some(view);
    }

    async fn refetch_board_view(&mut self) {
        match self
            .transport
            .fetch_board(&self.state.session.key, self.state.role())
            .await
        {
            Ok(board) => {
                if let Some(view) = board_view(board.board, board.captured) {
                    self.show_board(view);
                }
            }
            Err(e) => debug!("[SYNC] Board refresh failed: {}", e),
        }
    }

    /// Overwrite mirrors from an authoritative board snapshot and show it.
    fn adopt_board(&mut self, board: BoardResponse, cause: OverrideCause) {
        if let Some(first) = board.first {
            self.state.session.first = first;
        }
        self.state.adopt_ply(board.kifu_len.unwrap_or(0), cause);
        if let Some(epoch) = board.reset_epoch {
            self.state.known_epoch = Some(epoch);
        }

        let role = self.state.role();
        let turn = match (board.turn, board.my_turn()) {
            (Some(turn), _) => turn,
            (None, Some(true)) => role,
            (None, Some(false)) => role.peer(),
            (None, None) => self.state.parity_turn(),
        };
        self.state.turn = Some(turn);
        self.state.in_check = false;

        if let Some(view) = board_view(board.board, board.captured) {
            self.show_board(view);
        }
        self.presenter.show_check(false);
        self.presenter.show_turn(self.state.is_my_turn());
    }

    fn refresh_undo(&mut self) {
        let available = self.undo.eligible(&self.state);
        self.presenter.set_undo_available(available);
    }

    /// Forward the opponent's comment when it changes.
    fn relay_comment(&mut self, markers: &Markers) {
        let Some(comment) = markers.comment.as_deref() else {
            return;
        };
        if markers.last_by == Some(self.state.role()) {
            return;
        }
        if self.state.opponent_comment.as_deref() == Some(comment) {
            return;
        }
        self.state.opponent_comment = Some(comment.to_string());
        self.presenter.show_opponent_comment(comment);
    }
}
