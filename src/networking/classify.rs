//! Classification of raw poll answers
//!
//! A single `/get_match_move` answer can carry several concerns at once
//! (`reset_accepted` rides on a `resync` status, finish fields ride on move
//! payloads). [`classify`] resolves each answer into exactly one
//! [`PollOutcome`] plus the bookkeeping [`Markers`], or reports a protocol
//! violation.

use crate::core::error::TickFault;
use crate::game::types::{BoardView, FinishInfo, FinishReason, Markers, MoveRecord, PollOutcome};
use match_protocol::{status, BoardMatrix, Captured, Origin, PollResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub outcome: PollOutcome,
    pub markers: Markers,
}

pub fn board_view(board: Option<BoardMatrix>, captured: Option<Captured>) -> Option<BoardView> {
    board.map(|board| BoardView::new(board, captured))
}

pub fn classify(response: PollResponse) -> Result<Classified, TickFault> {
    let mut markers = Markers {
        ply: response.kifu_len,
        epoch: response.reset_epoch,
        phase: response.phase.clone(),
        last_by: response.last_by,
        comment: response.comment.clone().filter(|c| !c.is_empty()),
    };

    if response.reset_accepted {
        return Ok(Classified {
            outcome: PollOutcome::ResetAccepted,
            markers,
        });
    }

    if response.is_status(status::RESYNC) {
        return Ok(Classified {
            outcome: PollOutcome::Resync {
                ply: response.kifu_len.unwrap_or(0),
            },
            markers,
        });
    }

    if response.reset_requested {
        let initiator = match response.from {
            Some(Origin::Role(role)) => role,
            _ => return Err(TickFault::protocol("reset request without a proposing role")),
        };
        // The comment belongs to the proposal, not to the last move
        markers.comment = None;
        return Ok(Classified {
            outcome: PollOutcome::ResetRequested {
                initiator,
                comment: response.comment.unwrap_or_default(),
            },
            markers,
        });
    }

    if response.is_status(status::END) || response.finished {
        let info = finish_info(response)?;
        return Ok(Classified {
            outcome: PollOutcome::Finished(info),
            markers,
        });
    }

    let outcome = match response.status.to_ascii_lowercase().as_str() {
        status::MOVE => move_outcome(response)?,
        status::UNDO => {
            let ply = response
                .kifu_len
                .ok_or_else(|| TickFault::protocol("undo without a ply count"))?;
            PollOutcome::Undo {
                ply,
                turn: response.turn,
                board: board_view(response.board, response.captured),
            }
        }
        status::WAIT | status::OK => PollOutcome::Wait,
        other => return Err(TickFault::protocol(format!("unknown poll status '{other}'"))),
    };

    Ok(Classified { outcome, markers })
}

fn move_outcome(response: PollResponse) -> Result<PollOutcome, TickFault> {
    let to = response
        .to
        .ok_or_else(|| TickFault::protocol("move without a target square"))?;
    let from = match response.from {
        Some(Origin::Square(square)) => Some(square),
        None => None,
        Some(Origin::Role(role)) => {
            return Err(TickFault::protocol(format!(
                "move origin is a role ({role}) instead of a square"
            )))
        }
    };
    if from.is_none() && response.drop.is_none() {
        return Err(TickFault::protocol("move has neither origin nor dropped piece"));
    }

    let record = MoveRecord {
        from,
        to,
        drop: response.drop,
        promote: response.promote,
        by: response.by,
    };
    let board = board_view(response.board, response.captured)
        .map(|view| view.highlighted(record.highlight()));

    Ok(PollOutcome::Move {
        record,
        ply: response.kifu_len,
        board,
        in_check: response.in_check,
    })
}

fn finish_info(response: PollResponse) -> Result<FinishInfo, TickFault> {
    let reason = match response.reason.as_deref() {
        Some(reason) => FinishReason::parse(reason)
            .ok_or_else(|| TickFault::protocol(format!("unknown finish reason '{reason}'")))?,
        None if response.resigner.is_some() => FinishReason::Resign,
        None if response.winner.is_some() => FinishReason::Checkmate,
        None => return Err(TickFault::protocol("finish without reason or winner")),
    };

    Ok(FinishInfo {
        reason,
        winner: response.winner,
        resigner: response.resigner,
        resigner_id: response.resigner_id,
        board: board_view(response.board, response.captured),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_protocol::{PieceKind, Role};
    use serde_json::json;

    fn parse(value: serde_json::Value) -> PollResponse {
        serde_json::from_value(value).expect("valid poll payload")
    }

    #[test]
    fn test_reset_accepted_wins_over_resync_status() {
        let classified = classify(parse(json!({
            "kifu_len": 0, "comment": "", "reset_epoch": 4, "phase": "init", "last_by": null,
            "status": "resync", "reset_accepted": true, "board": [], "captured": {"main": [], "sub": []}
        })))
        .expect("classifies");
        assert_eq!(classified.outcome, PollOutcome::ResetAccepted);
        assert_eq!(classified.markers.epoch, Some(4));
        assert!(classified.markers.is_init());
    }

    #[test]
    fn test_reset_request_names_proposer() {
        let classified = classify(parse(json!({
            "status": "ok", "reset_requested": true, "from": "sub", "comment": "one more", "kifu_len": 0
        })))
        .expect("classifies");
        assert_eq!(
            classified.outcome,
            PollOutcome::ResetRequested {
                initiator: Role::Sub,
                comment: "one more".into()
            }
        );
        assert_eq!(classified.markers.comment, None);
    }

    #[test]
    fn test_reset_request_without_proposer_is_violation() {
        let result = classify(parse(json!({"status": "ok", "reset_requested": true})));
        assert!(matches!(result, Err(TickFault::Protocol(_))));
    }

    #[test]
    fn test_drop_move_payload() {
        let classified = classify(parse(json!({
            "status": "move", "from": null, "to": 40, "drop": "P", "promote": false,
            "by": "main", "kifu_len": 5, "in_check": false, "comment": "hmm",
            "board": [["", ""]], "captured": {"main": [], "sub": []}
        })))
        .expect("classifies");

        match classified.outcome {
            PollOutcome::Move { record, ply, board, .. } => {
                assert_eq!(record.drop, Some(PieceKind::Pawn));
                assert_eq!(record.from, None);
                assert_eq!(ply, Some(5));
                assert_eq!(board.map(|b| b.highlight), Some(vec![40]));
            }
            other => panic!("expected move, got {other:?}"),
        }
        assert_eq!(classified.markers.comment.as_deref(), Some("hmm"));
    }

    #[test]
    fn test_move_without_target_is_violation() {
        let result = classify(parse(json!({"status": "move", "from": 3})));
        assert!(matches!(result, Err(TickFault::Protocol(_))));
    }

    #[test]
    fn test_end_payload_becomes_finish() {
        let classified = classify(parse(json!({
            "status": "end", "finished": true, "reason": "resign", "winner": "main",
            "resigner": "sub", "resigner_id": "bob"
        })))
        .expect("classifies");
        match classified.outcome {
            PollOutcome::Finished(info) => {
                assert_eq!(info.reason, FinishReason::Resign);
                assert_eq!(info.resigner_id.as_deref(), Some("bob"));
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_finish_reason_is_violation() {
        let result = classify(parse(json!({"status": "end", "reason": "timeout", "winner": "main"})));
        assert!(matches!(result, Err(TickFault::Protocol(_))));
    }

    #[test]
    fn test_unknown_status_is_violation() {
        let result = classify(parse(json!({"status": "teleport"})));
        assert!(matches!(result, Err(TickFault::Protocol(_))));
    }

    #[test]
    fn test_wait_and_ok_are_quiet() {
        let wait = classify(parse(json!({"status": "wait", "kifu_len": 2, "last_by": "sub"})))
            .expect("wait");
        assert_eq!(wait.outcome, PollOutcome::Wait);
        assert_eq!(wait.markers.last_by, Some(Role::Sub));
        let ok = classify(parse(json!({"status": "ok"}))).expect("ok");
        assert_eq!(ok.outcome, PollOutcome::Wait);
    }
}
