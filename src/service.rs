//! Caller-facing chat contract
//!
//! `ChatService` is a cheap, cloneable handle to the `ChatServer` actor.
//! Transports and local callers use it for every registry operation.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::client::ClientHandle;
use crate::error::AppError;
use crate::message::Message;
use crate::server::{ChatServer, ServerCommand};
use crate::types::ClientId;

/// Handle for talking to a running `ChatServer`
///
/// Each call returns once the actor has accepted the command. Delivery to
/// the other clients happens asynchronously after that.
#[derive(Clone)]
pub struct ChatService {
    commands: mpsc::Sender<ServerCommand>,
}

impl ChatService {
    /// Wrap an existing command channel
    pub fn new(commands: mpsc::Sender<ServerCommand>) -> Self {
        Self { commands }
    }

    /// Start a `ChatServer` on the current runtime and return its handle
    ///
    /// The actor shuts down once every clone of the handle is dropped.
    pub fn spawn(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        tokio::spawn(ChatServer::new(rx).run());
        Self::new(tx)
    }

    /// Register `handle` under `name` and announce it to everyone
    ///
    /// Logging in again with the same client ID replaces the previous entry.
    pub async fn login(
        &self,
        handle: Arc<dyn ClientHandle>,
        name: impl Into<String>,
    ) -> Result<(), AppError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppError::InvalidArgument("name must not be empty".to_string()));
        }

        let (done, ack) = oneshot::channel();
        self.send(ServerCommand::Login { handle, name, done }).await?;
        ack.await.map_err(|_| AppError::ServerClosed)
    }

    /// Unregister a client. Logging out twice is not an error.
    pub async fn logout(&self, client_id: ClientId) -> Result<(), AppError> {
        let (done, ack) = oneshot::channel();
        self.send(ServerCommand::Logout { client_id, done }).await?;
        ack.await.map_err(|_| AppError::ServerClosed)?;
        Ok(())
    }

    /// Queue `message` for every client logged in right now
    pub async fn broadcast(&self, message: Message) -> Result<(), AppError> {
        self.send(ServerCommand::Broadcast { message }).await
    }

    /// Display names of every logged-in client
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        let (reply, names) = oneshot::channel();
        self.send(ServerCommand::List { reply }).await?;
        names.await.map_err(|_| AppError::ServerClosed)
    }

    async fn send(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| AppError::ServerClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{recv_message, RecordingHandle};

    /// Poll `list()` until it matches, failing after one second
    async fn wait_for_names(service: &ChatService, expected: &[&str]) {
        let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        expected.sort();

        for _ in 0..100 {
            let mut names = service.list().await.unwrap();
            names.sort();
            if names == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("list never became {:?}", expected);
    }

    #[tokio::test]
    async fn test_login_announces_to_self() {
        let service = ChatService::spawn(16);
        let (alice, mut alice_rx) = RecordingHandle::new();

        service.login(alice, "Alice").await.unwrap();

        assert_eq!(service.list().await.unwrap(), vec!["Alice".to_string()]);
        let msg = recv_message(&mut alice_rx).await;
        assert_eq!(msg, Message::system("Alice Signed on."));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let service = ChatService::spawn(16);
        let (alice, mut alice_rx) = RecordingHandle::new();
        let (bob, mut bob_rx) = RecordingHandle::new();

        service.login(alice, "Alice").await.unwrap();
        service.login(bob, "Bob").await.unwrap();

        let hi = Message::new("Alice", "hi").unwrap();
        service.broadcast(hi.clone()).await.unwrap();

        assert_eq!(recv_message(&mut alice_rx).await.text(), "Alice Signed on.");
        assert_eq!(recv_message(&mut alice_rx).await.text(), "Bob Signed on.");
        assert_eq!(recv_message(&mut alice_rx).await, hi);

        assert_eq!(recv_message(&mut bob_rx).await.text(), "Bob Signed on.");
        assert_eq!(recv_message(&mut bob_rx).await, hi);

        // Queues are FIFO, so a duplicate "hi" would arrive before this
        let bye = Message::new("Bob", "bye").unwrap();
        service.broadcast(bye.clone()).await.unwrap();
        assert_eq!(recv_message(&mut alice_rx).await, bye);
        assert_eq!(recv_message(&mut bob_rx).await, bye);
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());

        let mut names = service.list().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[tokio::test]
    async fn test_delivery_failure_logs_client_out() {
        let service = ChatService::spawn(16);
        let (alice, mut alice_rx) = RecordingHandle::new();

        service.login(alice.clone(), "Alice").await.unwrap();
        recv_message(&mut alice_rx).await;

        alice.fail();
        service
            .broadcast(Message::new("Alice", "anyone?").unwrap())
            .await
            .unwrap();

        wait_for_names(&service, &[]).await;
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let service = ChatService::spawn(16);
        let (alice, _alice_rx) = RecordingHandle::new();
        let alice_id = alice.id();

        service.login(alice, "Alice").await.unwrap();
        service.logout(alice_id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());

        service.logout(alice_id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());

        // Never registered at all
        service.logout(ClientId::new()).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let service = ChatService::spawn(16);
        let (alice, _alice_rx) = RecordingHandle::new();

        let result = service.login(alice, "").await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_isolated_from_other_clients() {
        let service = ChatService::spawn(16);
        let (alice, mut alice_rx) = RecordingHandle::new();
        let (bob, mut bob_rx) = RecordingHandle::new();

        service.login(alice.clone(), "Alice").await.unwrap();
        service.login(bob, "Bob").await.unwrap();
        recv_message(&mut alice_rx).await;
        recv_message(&mut alice_rx).await;
        assert_eq!(recv_message(&mut bob_rx).await.text(), "Bob Signed on.");

        alice.fail();
        service
            .broadcast(Message::new("Bob", "first").unwrap())
            .await
            .unwrap();
        assert_eq!(recv_message(&mut bob_rx).await.text(), "first");

        wait_for_names(&service, &["Bob"]).await;
        assert_eq!(recv_message(&mut bob_rx).await.text(), "Alice Signed off.");

        service
            .broadcast(Message::new("Bob", "second").unwrap())
            .await
            .unwrap();
        assert_eq!(recv_message(&mut bob_rx).await.text(), "second");
    }

    #[tokio::test]
    async fn test_per_client_order_preserved() {
        let service = ChatService::spawn(16);
        let (alice, mut alice_rx) = RecordingHandle::new();

        service.login(alice, "Alice").await.unwrap();
        recv_message(&mut alice_rx).await;

        for i in 0..50 {
            let msg = Message::new("Alice", format!("msg {}", i)).unwrap();
            service.broadcast(msg).await.unwrap();
        }
        for i in 0..50 {
            assert_eq!(recv_message(&mut alice_rx).await.text(), format!("msg {}", i));
        }
    }

    #[tokio::test]
    async fn test_shutdown_reports_server_closed() {
        let (tx, rx) = mpsc::channel(4);
        let service = ChatService::new(tx);
        drop(rx);

        assert!(matches!(service.list().await, Err(AppError::ServerClosed)));
    }
}
