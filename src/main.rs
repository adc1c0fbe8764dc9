use anyhow::{bail, Context};
use clap::Parser;
use match_protocol::{PieceKind, Role, SessionKey, Square};
use shogi_sync::core::settings::{settings_path, ClientSettings};
use shogi_sync::game::{MatchSession, MoveIntent};
use shogi_sync::networking::{HttpTransport, Intent, SyncClient};
use shogi_sync::ui::ConsolePresenter;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Terminal client for a paired shogi match
#[derive(Parser, Debug)]
#[command(name = "shogi-sync", version, about)]
struct Args {
    /// Id of the participant that created the pairing
    #[arg(long)]
    main_id: String,

    /// Id of the participant that joined the pairing
    #[arg(long)]
    sub_id: String,

    /// Seat this client plays (main or sub)
    #[arg(long)]
    role: Role,

    /// Seat that moves first (main only; sub learns it from the service)
    #[arg(long, default_value = "main")]
    first: Role,

    /// Player id sent with resign / force-reset; defaults to this seat's id
    #[arg(long)]
    player_id: Option<String>,

    /// Match service base URL (overrides the settings file)
    #[arg(long)]
    server: Option<Url>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// One line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Send(Intent),
    Comment(String),
    Help,
}

fn parse_square(token: Option<&str>) -> anyhow::Result<Square> {
    let token = token.context("missing square")?;
    let square: Square = token
        .parse()
        .with_context(|| format!("'{token}' is not a square index"))?;
    Ok(square)
}

fn parse_command(line: &str) -> anyhow::Result<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let command = match word {
        "start" => Command::Send(Intent::StartMatch),
        "move" => {
            let from = parse_square(args.next())?;
            let to = parse_square(args.next())?;
            let promote = args.next() == Some("+");
            Command::Send(Intent::SubmitMove(MoveIntent::board_move(from, to, promote)))
        }
        "drop" => {
            let piece: PieceKind = args.next().context("missing piece")?.parse()?;
            let to = parse_square(args.next())?;
            Command::Send(Intent::SubmitMove(MoveIntent::drop_piece(piece, to)))
        }
        "reset" => Command::Send(Intent::RequestReset {
            comment: rest.to_string(),
        }),
        "accept" => Command::Send(Intent::AcceptReset),
        "force" => Command::Send(Intent::ForceReset {
            swap_first: rest == "swap",
        }),
        "undo" => Command::Send(Intent::Undo),
        "resign" => Command::Send(Intent::Resign),
        "comment" => Command::Comment(rest.to_string()),
        "quit" | "exit" => Command::Send(Intent::Leave),
        "help" | "" => Command::Help,
        other => bail!("unknown command '{other}' (try `help`)"),
    };
    Ok(command)
}

const HELP: &str = "commands: start | move <from> <to> [+] | drop <piece> <to> | reset [comment] | \
accept | force [swap] | undo | resign | comment <text> | quit";

async fn read_commands(intents: mpsc::Sender<Intent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_comment = String::new();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("[SYNC] stdin closed: {}", e);
                break;
            }
        };

        let intent = match parse_command(&line) {
            Ok(Command::Send(Intent::SubmitMove(intent))) => {
                Intent::SubmitMove(intent.with_comment(std::mem::take(&mut pending_comment)))
            }
            Ok(Command::Send(intent)) => intent,
            Ok(Command::Comment(text)) => {
                pending_comment = text;
                println!("-- comment will be sent with your next move");
                continue;
            }
            Ok(Command::Help) => {
                println!("{HELP}");
                continue;
            }
            Err(e) => {
                println!("-- {e:#}");
                continue;
            }
        };

        let leaving = intent == Intent::Leave;
        if intents.send(intent).await.is_err() || leaving {
            break;
        }
    }

    let _ = intents.send(Intent::Leave).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(settings_path);
    let mut settings = ClientSettings::load_from(&config_path);
    if let Some(server) = args.server.clone() {
        settings.server_url = server;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let key = SessionKey::new(args.main_id, args.sub_id);
    let mut session = MatchSession::new(key, args.role, args.first);
    if let Some(player_id) = args.player_id {
        session = session.with_player_id(player_id);
    }

    info!(
        "[SYNC] Connecting to {} as {}",
        settings.server_url, session.role
    );
    let transport = HttpTransport::new(settings.server_url.clone());
    let client = SyncClient::new(
        transport,
        ConsolePresenter::new(),
        session,
        settings.delays.clone(),
    );

    let (tx, rx) = mpsc::channel(16);
    if args.role == Role::Sub {
        tx.send(Intent::AwaitMatchStart)
            .await
            .context("intent channel closed")?;
    } else {
        println!("type `start` to begin the match");
    }
    println!("{HELP}");

    tokio::spawn(read_commands(tx));
    client.run(rx).await;
    Ok(())
}
