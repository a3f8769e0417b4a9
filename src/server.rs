//! ChatServer Actor implementation
//!
//! The client registry: the single owner of the subscriber map.
//! Login, logout, list and the broadcast snapshot all run on the actor
//! task one command at a time, so no locks are needed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::channel::{DeliveryChannel, Eviction};
use crate::client::ClientHandle;
use crate::message::Message;
use crate::types::{ClientId, SessionId};

/// Commands sent from `ChatService` handles to the ChatServer actor
pub enum ServerCommand {
    /// Register a client under a display name
    Login {
        handle: Arc<dyn ClientHandle>,
        name: String,
        done: oneshot::Sender<()>,
    },
    /// Unregister a client; replies whether it was registered
    Logout {
        client_id: ClientId,
        done: oneshot::Sender<bool>,
    },
    /// Fan a message out to every subscriber
    Broadcast {
        message: Message,
    },
    /// Names of every subscriber
    List {
        reply: oneshot::Sender<Vec<String>>,
    },
}

/// A logged-in client's server-side state
struct Subscriber {
    /// Display name, fixed at login
    name: String,
    channel: DeliveryChannel,
}

/// The main ChatServer actor
///
/// Owns every subscriber and its delivery channel. Workers whose push
/// fails report back through the eviction channel.
pub struct ChatServer {
    /// All logged-in clients: ClientId -> Subscriber
    subscribers: HashMap<ClientId, Subscriber>,
    /// Session issued to the most recent login
    last_session: SessionId,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    /// Handed to every delivery worker
    evict_tx: mpsc::UnboundedSender<Eviction>,
    evict_rx: mpsc::UnboundedReceiver<Eviction>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        let (evict_tx, evict_rx) = mpsc::unbounded_channel();
        Self {
            subscribers: HashMap::new(),
            last_session: SessionId(0),
            receiver,
            evict_tx,
            evict_rx,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives commands and eviction reports until all
    /// command senders are dropped. Remaining subscribers are dropped on
    /// exit, which stops their delivery workers.
    pub async fn run(mut self) {
        info!("ChatServer started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(eviction) = self.evict_rx.recv() => {
                    self.handle_eviction(eviction);
                }
            }
        }

        info!(
            "ChatServer shutting down with {} subscribers",
            self.subscribers.len()
        );
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Login { handle, name, done } => {
                self.login(handle, name);
                let _ = done.send(());
            }
            ServerCommand::Logout { client_id, done } => {
                let removed = self.logout(client_id);
                let _ = done.send(removed);
            }
            ServerCommand::Broadcast { message } => {
                self.broadcast(message);
            }
            ServerCommand::List { reply } => {
                let _ = reply.send(self.list());
            }
        }
    }

    /// Register a client, replacing any previous entry with the same ID
    fn login(&mut self, handle: Arc<dyn ClientHandle>, name: String) {
        debug_assert!(!name.is_empty());

        let client_id = handle.id();
        self.last_session = self.last_session.next();

        let mut channel = DeliveryChannel::new(handle, self.last_session);
        channel.start(self.evict_tx.clone());

        let subscriber = Subscriber {
            name: name.clone(),
            channel,
        };
        if let Some(previous) = self.subscribers.insert(client_id, subscriber) {
            // Dropping the old subscriber stops its channel
            info!(
                "Client {} logged in again, replacing '{}'",
                client_id, previous.name
            );
        }

        info!(
            "Client {} logged in as '{}' (session {})",
            client_id, name, self.last_session
        );
        debug!("Total subscribers: {}", self.subscribers.len());

        self.broadcast(Message::system(format!("{} Signed on.", name)));
    }

    /// Unregister a client; a no-op if it is not registered
    fn logout(&mut self, client_id: ClientId) -> bool {
        let Some(mut subscriber) = self.subscribers.remove(&client_id) else {
            debug!("Logout for unknown client {}", client_id);
            return false;
        };

        subscriber.channel.stop();
        info!("Client {} ('{}') logged out", client_id, subscriber.name);
        debug!("Total subscribers: {}", self.subscribers.len());

        self.broadcast(Message::system(format!("{} Signed off.", subscriber.name)));
        true
    }

    /// Handle a worker's failure report
    ///
    /// Reports from a session that has since been replaced are ignored.
    fn handle_eviction(&mut self, eviction: Eviction) {
        let current = self
            .subscribers
            .get(&eviction.client_id)
            .map(|s| s.channel.session());

        if current != Some(eviction.session) {
            debug!(
                "Ignoring stale eviction for client {} (session {})",
                eviction.client_id, eviction.session
            );
            return;
        }

        warn!("Client {} unreachable, logging out", eviction.client_id);
        self.logout(eviction.client_id);
    }

    /// Enqueue a message on every subscriber's channel
    fn broadcast(&self, message: Message) {
        let message = Arc::new(message);
        for subscriber in self.subscribers.values() {
            subscriber.channel.enqueue(Arc::clone(&message));
        }
    }

    fn list(&self) -> Vec<String> {
        self.subscribers.values().map(|s| s.name.clone()).collect()
    }
}
