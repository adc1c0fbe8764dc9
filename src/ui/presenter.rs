//! Presentation seam between the sync client and whatever draws the game
//!
//! The client never prints. It reports state changes through [`Presenter`];
//! [`ConsolePresenter`] renders them as plain text for the binary.

use crate::game::types::BoardView;
use match_protocol::Role;

/// Everything the sync client can ask the screen to do.
pub trait Presenter: Send {
    fn render_board(&mut self, view: &BoardView);

    fn show_turn(&mut self, my_turn: bool);

    fn show_status(&mut self, message: &str);

    fn show_check(&mut self, in_check: bool);

    fn show_opponent_comment(&mut self, comment: &str);

    /// The peer proposed a reset; offer an accept control.
    fn offer_reset_acceptance(&mut self, from: Role, comment: &str);

    /// Our own proposal is waiting for the peer.
    fn note_reset_requested(&mut self);

    fn clear_reset_prompt(&mut self);

    fn show_game_over(&mut self, message: &str);

    fn set_interaction_enabled(&mut self, enabled: bool);

    fn set_undo_available(&mut self, available: bool);
}

/// Plain terminal output for the `shogi-sync` binary
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    last_comment: Option<String>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn format_board(view: &BoardView) -> String {
        let mut out = String::new();
        for (row_index, row) in view.board.iter().enumerate() {
            for (col_index, cell) in row.iter().enumerate() {
                let highlighted = u8::try_from(row_index * 9 + col_index)
                    .is_ok_and(|square| view.highlight.contains(&square));
                let label = if cell.is_empty() { "・" } else { cell.as_str() };
                if highlighted {
                    out.push_str(&format!("[{label}]"));
                } else {
                    out.push_str(&format!(" {label} "));
                }
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "in hand  main: {}  sub: {}\n",
            view.captured.main.join(" "),
            view.captured.sub.join(" ")
        ));
        out
    }
}

impl Presenter for ConsolePresenter {
    fn render_board(&mut self, view: &BoardView) {
        println!("{}", Self::format_board(view));
    }

    fn show_turn(&mut self, my_turn: bool) {
        if my_turn {
            println!(">> Your move");
        } else {
            println!(">> Opponent is thinking...");
        }
    }

    fn show_status(&mut self, message: &str) {
        println!("-- {message}");
    }

    fn show_check(&mut self, in_check: bool) {
        if in_check {
            println!("!! Check");
        }
    }

    fn show_opponent_comment(&mut self, comment: &str) {
        if self.last_comment.as_deref() == Some(comment) {
            return;
        }
        self.last_comment = Some(comment.to_string());
        println!("opponent: {comment}");
    }

    fn offer_reset_acceptance(&mut self, from: Role, comment: &str) {
        if comment.is_empty() {
            println!("?? {from} asks for a new game. Type `accept` to agree.");
        } else {
            println!("?? {from} asks for a new game ({comment}). Type `accept` to agree.");
        }
    }

    fn note_reset_requested(&mut self) {
        println!("-- Reset requested, waiting for your opponent");
    }

    fn clear_reset_prompt(&mut self) {}

    fn show_game_over(&mut self, message: &str) {
        println!("== {message}");
    }

    fn set_interaction_enabled(&mut self, enabled: bool) {
        if !enabled {
            println!("-- Board locked");
        }
    }

    fn set_undo_available(&mut self, _available: bool) {}
}
