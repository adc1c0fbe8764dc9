use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Absolute square index on the 9x9 board (0..=80), in the first mover's orientation.
pub type Square = u8;

/// Number of squares on the board.
pub const BOARD_SQUARES: u8 = 81;

/// Row-major 9x9 board as the service renders it (one piece label per cell, "" when empty).
pub type BoardMatrix = Vec<Vec<String>>;

/// Poll / submit `status` values understood by the client.
pub mod status {
    pub const WAIT: &str = "wait";
    pub const MOVE: &str = "move";
    pub const RESYNC: &str = "resync";
    pub const UNDO: &str = "undo";
    pub const END: &str = "end";
    pub const OK: &str = "ok";
    pub const ERROR: &str = "error";
}

/// Which seat of a paired session a participant occupies.
///
/// `main` created the pairing and owns session-level actions (forced reset);
/// `sub` joined it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "Main", alias = "MAIN")]
    Main,
    #[serde(alias = "Sub", alias = "SUB")]
    Sub,
}

impl Role {
    pub fn peer(self) -> Role {
        match self {
            Role::Main => Role::Sub,
            Role::Sub => Role::Main,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Main => "main",
            Role::Sub => "sub",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}' (expected main or sub)", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Role::Main),
            "sub" => Ok(Role::Sub),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Piece kinds that can appear in a drop (USI letters on the wire).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    #[serde(rename = "P")]
    Pawn,
    #[serde(rename = "L")]
    Lance,
    #[serde(rename = "N")]
    Knight,
    #[serde(rename = "S")]
    Silver,
    #[serde(rename = "G")]
    Gold,
    #[serde(rename = "B")]
    Bishop,
    #[serde(rename = "R")]
    Rook,
    #[serde(rename = "K")]
    King,
}

impl PieceKind {
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Lance => 'L',
            PieceKind::Knight => 'N',
            PieceKind::Silver => 'S',
            PieceKind::Gold => 'G',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::King => 'K',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePieceError(String);

impl fmt::Display for ParsePieceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown piece kind '{}'", self.0)
    }
}

impl std::error::Error for ParsePieceError {}

impl FromStr for PieceKind {
    type Err = ParsePieceError;

    /// Accepts USI letters in either case; a promotion marker (`+P`) is
    /// stripped because pieces in hand are always unpromoted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letter = s.trim().trim_start_matches('+').to_ascii_uppercase();
        match letter.as_str() {
            "P" => Ok(PieceKind::Pawn),
            "L" => Ok(PieceKind::Lance),
            "N" => Ok(PieceKind::Knight),
            "S" => Ok(PieceKind::Silver),
            "G" => Ok(PieceKind::Gold),
            "B" => Ok(PieceKind::Bishop),
            "R" => Ok(PieceKind::Rook),
            "K" => Ok(PieceKind::King),
            _ => Err(ParsePieceError(s.to_string())),
        }
    }
}

/// Pieces in hand for each seat.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Captured {
    #[serde(default)]
    pub main: Vec<String>,
    #[serde(default)]
    pub sub: Vec<String>,
}

/// Identifies a paired session on the service: the ids of both seats.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub main: String,
    pub sub: String,
}

impl SessionKey {
    pub fn new(main: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            sub: sub.into(),
        }
    }

    pub fn id_of(&self, role: Role) -> &str {
        match role {
            Role::Main => &self.main,
            Role::Sub => &self.sub,
        }
    }
}

// ============================================================================
// Requests (client → service)
// ============================================================================

/// Body of `/get_match_move`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PollRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub role: Role,
    pub client_kifu_len: u32,
}

/// Body of `/get_match_board`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoardRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub player: Role,
}

/// Body of `/submit_match_move`. `from` is absent for drops.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubmitMoveRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub role: Role,
    pub from: Option<Square>,
    pub to: Square,
    pub drop: Option<PieceKind>,
    pub promote: bool,
    pub comment: String,
}

/// Body of `/request_reset_match`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResetProposal {
    #[serde(flatten)]
    pub session: SessionKey,
    pub role: Role,
    pub comment: String,
}

/// Body shared by `/accept_reset_request`, `/undo_last_move` and `/leave_match`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RoleRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub role: Role,
}

/// Body of `/force_reset_match` (main only).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ForceResetRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub swap_first: bool,
    pub id: String,
}

/// Body of `/resign2`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResignRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub resigner: Role,
    pub id: String,
}

/// Body of `/start_match_game`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StartMatchRequest {
    #[serde(flatten)]
    pub session: SessionKey,
    pub first: Role,
}

// ============================================================================
// Responses (service → client)
// ============================================================================

/// `from` is overloaded by the service: a square index on move payloads, the
/// proposing role on reset-request payloads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Origin {
    Square(Square),
    Role(Role),
}

/// One `/get_match_move` answer. Several concerns can be present at once
/// (e.g. `reset_accepted` rides on a `resync` status), so every field is
/// optional and classification happens on the client.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PollResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub kifu_len: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub reset_epoch: Option<u64>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub last_by: Option<Role>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub finished: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub winner: Option<Role>,
    #[serde(default)]
    pub resigner: Option<Role>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub resigner_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub reset_accepted: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub reset_requested: bool,
    #[serde(default)]
    pub from: Option<Origin>,
    #[serde(default)]
    pub to: Option<Square>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub promote: bool,
    #[serde(default, deserialize_with = "lenient_piece")]
    pub drop: Option<PieceKind>,
    #[serde(default)]
    pub by: Option<Role>,
    #[serde(default)]
    pub board: Option<BoardMatrix>,
    #[serde(default)]
    pub captured: Option<Captured>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub in_check: bool,
    #[serde(default)]
    pub turn: Option<Role>,
    #[serde(default)]
    pub first: Option<Role>,
}

impl PollResponse {
    pub fn is_status(&self, status: &str) -> bool {
        self.status.eq_ignore_ascii_case(status)
    }
}

/// `/get_match_board` answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BoardResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub board: Option<BoardMatrix>,
    #[serde(default)]
    pub captured: Option<Captured>,
    #[serde(default)]
    pub turn: Option<Role>,
    #[serde(default)]
    pub first: Option<Role>,
    #[serde(default)]
    pub kifu_len: Option<u32>,
    #[serde(default)]
    pub reset_epoch: Option<u64>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub winner: Option<Role>,
    #[serde(default)]
    pub is_my_turn: Option<bool>,
    /// Older camel-case spelling; the service sends both
    #[serde(default, rename = "isMyTurn")]
    pub is_my_turn_legacy: Option<bool>,
}

impl BoardResponse {
    pub fn my_turn(&self) -> Option<bool> {
        self.is_my_turn.or(self.is_my_turn_legacy)
    }
}

/// `/submit_match_move` answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SubmitMoveResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub board: Option<BoardMatrix>,
    #[serde(default)]
    pub captured: Option<Captured>,
    #[serde(default)]
    pub winner: Option<Role>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub finished: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub promote: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub in_check: bool,
    #[serde(default)]
    pub by: Option<Role>,
    #[serde(default)]
    pub kifu_len: Option<u32>,
    #[serde(default)]
    pub turn: Option<Role>,
}

/// `/undo_last_move` answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UndoResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub board: Option<BoardMatrix>,
    #[serde(default)]
    pub captured: Option<Captured>,
    #[serde(default)]
    pub kifu_len: Option<u32>,
    #[serde(default)]
    pub turn: Option<Role>,
    #[serde(default)]
    pub first: Option<Role>,
    #[serde(default)]
    pub last_by: Option<Role>,
}

/// `/resign2` answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResignResponse {
    #[serde(default, deserialize_with = "null_as_false")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub finished: bool,
    #[serde(default)]
    pub winner: Option<Role>,
    #[serde(default)]
    pub resigner: Option<Role>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub resigner_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `/force_reset_match` answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ForceResetResponse {
    #[serde(default, deserialize_with = "null_as_false")]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub first: Option<Role>,
    #[serde(default)]
    pub reset_epoch: Option<u64>,
}

/// `/check_match_start` answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MatchStartStatus {
    #[serde(default, deserialize_with = "null_as_false")]
    pub started: bool,
    #[serde(default)]
    pub first: Option<Role>,
}

/// Plain acknowledgment. The service answers either `{"status": "ok"}` or
/// `{"ok": true}` depending on the endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            status: Some(status::OK.to_string()),
            ok: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(status::ERROR.to_string()),
            ok: None,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok == Some(true)
            || self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(status::OK))
    }
}

/// Error body the service attaches to non-2xx answers.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// The service stores a move's drop as `None`, `false` or a piece letter.
fn lenient_piece<'de, D>(deserializer: D) -> Result<Option<PieceKind>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!(
            "unexpected drop value: {other}"
        ))),
    }
}

/// Player ids may be numeric or textual depending on how the pairing was created.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("unexpected id value: {other}"))),
    }
}
