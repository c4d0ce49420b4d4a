// Framework bootstrap for the operator console.

use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::domain::envelope::ItemType;
use crate::frameworks::config::ClientConfig;
use crate::frameworks::transport::{HostEnvironment, SelectedTransport};
use crate::interface_adapters::events::{ClientEvent, EventHub, EventKind};
use crate::use_cases::client::UnifiedClient;
use crate::use_cases::status_board::StatusBoard;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Place { item_type: ItemType, count: u32 },
    Reset,
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "water" | "food" => {
                let item_type = verb.parse::<ItemType>().map_err(|e| e.to_string())?;
                let count = match words.next() {
                    None => 1,
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| format!("invalid count `{raw}`"))?,
                };
                Command::Place { item_type, count }
            }
            "reset" => Command::Reset,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command `{other}`")),
        };

        if words.next().is_some() {
            return Err(format!("too many arguments for `{verb}`"));
        }
        Ok(command)
    }
}

fn register_listeners(client: &UnifiedClient) {
    client.on(EventKind::Connected, |_| {
        info!("Link up");
        Ok(())
    });
    client.on(EventKind::Disconnected, |_| {
        warn!("Link down");
        Ok(())
    });
    client.on(EventKind::ActionResult, |event| {
        if let ClientEvent::ActionResult(result) = event {
            match result.alert_text() {
                Some(alert) => warn!(%alert, "Action failed"),
                None => info!(action = ?result.action, remaining = ?result.remaining, "Action ok"),
            }
        }
        Ok(())
    });
    client.on(EventKind::ServerError, |event| {
        if let ClientEvent::ServerError(e) = event {
            error!(code = ?e.code, details = ?e.details, "{}", e.message);
        }
        Ok(())
    });
}

fn report_status(board: &StatusBoard) {
    let alive = board.is_alive();
    let Some(status) = board.latest() else {
        info!(alive, "No status received yet");
        return;
    };
    info!(
        water = status.item_count(ItemType::Water),
        food = status.item_count(ItemType::Food),
        used = status.inventory.used,
        capacity = status.inventory.capacity,
        distance = status.distance_to_npc,
        person_detected = status.is_person_detected(),
        following = status.npc_is_following,
        mission_completed = status.mission_completed,
        alive,
        "Status"
    );
    if let Some(alert) = board.last_alert() {
        info!(%alert, "Last alert");
    }
}

fn execute(client: &UnifiedClient, board: &StatusBoard, command: Command) {
    let result = match command {
        Command::Place { item_type, count } => client.place_item(item_type, count),
        Command::Reset => client.reset_mission(),
        Command::Status => {
            report_status(board);
            Ok(())
        }
        Command::Quit => Ok(()),
    };
    if let Err(e) = result {
        warn!(error = %e, ?command, "Command not sent");
    }
}

/// Runs the console until stdin closes, `quit` is entered, or Ctrl-C.
pub async fn run() -> std::io::Result<()> {
    init_runtime();

    let config = ClientConfig::from_env();
    let hub = Arc::new(EventHub::new());
    // A native process never has a bridge host.
    let selected = SelectedTransport::select(HostEnvironment::probe(None), &config, hub.clone());
    let client = selected.client();
    let board = StatusBoard::attach(&hub, config.heartbeat_timeout);
    register_listeners(&client);

    info!(
        transport = %client.kind(),
        url = %config.socket_url,
        profile = ?config.profile,
        "Teleop console starting"
    );
    if let Err(e) = client.connect().await {
        warn!(error = %e, "Initial connect failed, retrying in background");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(Command::Quit) => break Ok(()),
                    Ok(command) => execute(&client, &board, command),
                    Err(e) => warn!(input = %line.trim(), error = %e, "Unrecognized input"),
                },
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            },
        }
    };

    client.disconnect().await;
    board.detach(&hub);
    info!("Teleop console stopped");
    outcome
}
