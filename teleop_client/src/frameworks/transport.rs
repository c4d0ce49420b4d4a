use std::sync::Arc;

use crate::domain::connection::TransportKind;
use crate::domain::ports::{BridgeHost, Transport};
use crate::frameworks::bridge::BridgeTransport;
use crate::frameworks::config::ClientConfig;
use crate::frameworks::socket::SocketTransport;
use crate::interface_adapters::events::EventHub;
use crate::use_cases::client::UnifiedClient;

/// What the process found about its surroundings at startup.
pub enum HostEnvironment {
    // Running inside the game host, which offers a bridge.
    Embedded(Arc<dyn BridgeHost>),
    Standalone,
}

impl HostEnvironment {
    pub fn probe(host: Option<Arc<dyn BridgeHost>>) -> Self {
        match host {
            Some(host) => HostEnvironment::Embedded(host),
            None => HostEnvironment::Standalone,
        }
    }
}

enum Chosen {
    Bridge(Arc<BridgeTransport>),
    Socket(Arc<SocketTransport>),
}

/// The transport picked once at startup, bound to the hub it publishes events on.
///
/// Bridge users keep the concrete handle via [`SelectedTransport::bridge`] so the host can
/// signal readiness and deliver messages.
pub struct SelectedTransport {
    chosen: Chosen,
    hub: Arc<EventHub>,
}

impl SelectedTransport {
    pub fn select(env: HostEnvironment, config: &ClientConfig, hub: Arc<EventHub>) -> Self {
        let chosen = match env {
            HostEnvironment::Embedded(host) => Chosen::Bridge(Arc::new(BridgeTransport::new(
                host,
                hub.clone(),
                config.bridge_ready_timeout,
            ))),
            HostEnvironment::Standalone => Chosen::Socket(Arc::new(SocketTransport::new(
                config.socket_url.clone(),
                config.reconnect,
                hub.clone(),
            ))),
        };
        Self { chosen, hub }
    }

    pub fn kind(&self) -> TransportKind {
        match self.chosen {
            Chosen::Bridge(_) => TransportKind::Bridge,
            Chosen::Socket(_) => TransportKind::Socket,
        }
    }

    pub fn as_transport(&self) -> Arc<dyn Transport> {
        match &self.chosen {
            Chosen::Bridge(bridge) => bridge.clone(),
            Chosen::Socket(socket) => socket.clone(),
        }
    }

    pub fn bridge(&self) -> Option<&Arc<BridgeTransport>> {
        match &self.chosen {
            Chosen::Bridge(bridge) => Some(bridge),
            Chosen::Socket(_) => None,
        }
    }

    // The client shares the hub the transport emits on, so its listeners see every event.
    pub fn client(&self) -> UnifiedClient {
        UnifiedClient::new(self.as_transport(), self.hub.clone())
    }
}
