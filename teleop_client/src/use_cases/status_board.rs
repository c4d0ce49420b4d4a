use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::domain::heartbeat::Liveness;
use crate::domain::status::PlayerStatus;
use crate::interface_adapters::events::{ClientEvent, EventHub, EventKind, ListenerId};
use crate::interface_adapters::protocol::FormattedError;

#[derive(Default)]
struct BoardState {
    last_alert: Option<String>,
    last_server_error: Option<FormattedError>,
}

// Read model kept current by hub events: latest status, link liveness, last problems seen.
pub struct StatusBoard {
    status: watch::Sender<Option<Arc<PlayerStatus>>>,
    liveness: Mutex<Liveness>,
    state: Mutex<BoardState>,
    listeners: Mutex<Vec<ListenerId>>,
}

impl StatusBoard {
    pub fn attach(hub: &EventHub, heartbeat_timeout: Duration) -> Arc<Self> {
        let (status, _) = watch::channel(None);
        let board = Arc::new(Self {
            status,
            liveness: Mutex::new(Liveness::new(heartbeat_timeout)),
            state: Mutex::new(BoardState::default()),
            listeners: Mutex::new(Vec::new()),
        });

        let kinds = [
            EventKind::PlayerStatus,
            EventKind::Heartbeat,
            EventKind::ActionResult,
            EventKind::ServerError,
            EventKind::Disconnected,
        ];
        let ids: Vec<ListenerId> = kinds
            .into_iter()
            .map(|kind| {
                // Weak so a dropped board does not stay alive through the hub.
                let weak = Arc::downgrade(&board);
                hub.on(kind, move |event| {
                    if let Some(board) = weak.upgrade() {
                        board.apply(event);
                    }
                    Ok(())
                })
            })
            .collect();
        *lock(&board.listeners) = ids;

        board
    }

    pub fn detach(&self, hub: &EventHub) {
        for id in lock(&self.listeners).drain(..) {
            hub.off(id);
        }
    }

    pub fn latest(&self) -> Option<Arc<PlayerStatus>> {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PlayerStatus>>> {
        self.status.subscribe()
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive_at(Instant::now())
    }

    pub fn is_alive_at(&self, now: Instant) -> bool {
        lock(&self.liveness).is_alive(now)
    }

    pub fn last_alert(&self) -> Option<String> {
        lock(&self.state).last_alert.clone()
    }

    pub fn last_server_error(&self) -> Option<FormattedError> {
        lock(&self.state).last_server_error.clone()
    }

    fn apply(&self, event: &ClientEvent) {
        match event {
            ClientEvent::PlayerStatus(status) => {
                self.status.send_replace(Some(status.clone()));
            }
            ClientEvent::Heartbeat(_) => lock(&self.liveness).record(Instant::now()),
            ClientEvent::ActionResult(result) => {
                if let Some(alert) = result.alert_text() {
                    lock(&self.state).last_alert = Some(alert);
                }
            }
            ClientEvent::ServerError(error) => {
                lock(&self.state).last_server_error = Some(error.clone());
            }
            // A new link starts its own heartbeat history.
            ClientEvent::Disconnected => lock(&self.liveness).reset(),
            _ => {}
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
