use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::channels::ChannelHub;
use crate::presence::PresenceIndex;
use crate::room::service::RoomService;
use crate::shared::AppError;

/// Per-connection lifecycle states. Offline is terminal: a reconnect
/// builds a fresh lifecycle bound to a new connection id, even for the
/// same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Online,
    Offline,
}

/// Drives one connection through Connecting -> Online -> Offline.
///
/// Going online registers presence and replays the user's room
/// memberships as channel attachments, which is what makes "send to
/// room" reach the user on reconnect without per-room join calls.
/// Collaborator failures on the way up are logged and degrade
/// functionality; they never block the transition or close the socket.
pub struct ConnectionLifecycle {
    pub connection_id: String,
    pub user_id: String,
    pub display_name: String,
    state: ConnectionState,
    presence: Arc<dyn PresenceIndex>,
    room_service: Arc<RoomService>,
    channel_hub: Arc<dyn ChannelHub>,
}

impl ConnectionLifecycle {
    pub fn new(
        connection_id: String,
        user_id: String,
        display_name: String,
        presence: Arc<dyn PresenceIndex>,
        room_service: Arc<RoomService>,
        channel_hub: Arc<dyn ChannelHub>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            display_name,
            state: ConnectionState::Connecting,
            presence,
            room_service,
            channel_hub,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connecting -> Online: register the outbound channel, register
    /// presence, attach the connection to every room the user belongs to.
    pub async fn go_online(
        &mut self,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Result<(), AppError> {
        if self.state != ConnectionState::Connecting {
            warn!(
                connection_id = %self.connection_id,
                state = ?self.state,
                "go_online from non-connecting state ignored"
            );
            return Ok(());
        }

        self.channel_hub
            .register_connection(&self.connection_id, outbound)
            .await;

        // Non-fatal: the connection stays open even if presence fails,
        // at the cost of this user looking offline to senders
        if let Err(e) = self
            .presence
            .register(&self.user_id, &self.connection_id)
            .await
        {
            warn!(
                user_id = %self.user_id,
                connection_id = %self.connection_id,
                error = %e,
                "Presence registration failed, continuing degraded"
            );
        }

        // Non-fatal: a failed listing means no live delivery until the
        // next reconnect, but the connection itself is fine
        match self.room_service.rooms_for_user(&self.user_id).await {
            Ok(rooms) => {
                for room in &rooms {
                    self.channel_hub.attach(&self.connection_id, &room.id).await;
                }
                info!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    room_count = rooms.len(),
                    "User is now online"
                );
            }
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    error = %e,
                    "Room listing failed, no channels attached"
                );
            }
        }

        self.state = ConnectionState::Online;
        Ok(())
    }

    /// Online -> Offline (terminal): guarded presence unregister and
    /// channel detachment. Safe to call once from any state.
    pub async fn go_offline(&mut self) {
        if self.state == ConnectionState::Offline {
            return;
        }

        // The guard keeps a superseded session's teardown from evicting
        // the successor's presence entry
        match self
            .presence
            .unregister_connection(&self.user_id, &self.connection_id)
            .await
        {
            Ok(true) => info!(
                user_id = %self.user_id,
                connection_id = %self.connection_id,
                "User is now offline"
            ),
            Ok(false) => info!(
                user_id = %self.user_id,
                connection_id = %self.connection_id,
                "Stale connection closed, newer session stays online"
            ),
            Err(e) => warn!(
                user_id = %self.user_id,
                connection_id = %self.connection_id,
                error = %e,
                "Presence unregister failed"
            ),
        }

        self.channel_hub.drop_connection(&self.connection_id).await;
        self.state = ConnectionState::Offline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::channels::InMemoryChannelHub;
    use crate::presence::InMemoryPresenceIndex;
    use crate::room::repository::InMemoryRoomRepository;
    use async_trait::async_trait;

    struct Fixture {
        presence: Arc<InMemoryPresenceIndex>,
        hub: Arc<InMemoryChannelHub>,
        room_service: Arc<RoomService>,
    }

    fn fixture() -> Fixture {
        Fixture {
            presence: Arc::new(InMemoryPresenceIndex::new()),
            hub: Arc::new(InMemoryChannelHub::new()),
            room_service: Arc::new(RoomService::new(Arc::new(InMemoryRoomRepository::new()))),
        }
    }

    fn lifecycle(f: &Fixture, connection_id: &str, user_id: &str) -> ConnectionLifecycle {
        ConnectionLifecycle::new(
            connection_id.to_string(),
            user_id.to_string(),
            user_id.to_string(),
            f.presence.clone(),
            f.room_service.clone(),
            f.hub.clone(),
        )
    }

    #[tokio::test]
    async fn test_go_online_registers_presence_and_attaches_rooms() {
        let f = fixture();
        let public = f.room_service.create_public("general", "alice").await.unwrap();
        let private = f
            .room_service
            .find_or_create_private("alice", "bob")
            .await
            .unwrap();

        let mut lc = lifecycle(&f, "conn-a", "alice");
        assert_eq!(lc.state(), ConnectionState::Connecting);

        let (tx, _rx) = mpsc::unbounded_channel();
        lc.go_online(tx).await.unwrap();

        assert_eq!(lc.state(), ConnectionState::Online);
        assert_eq!(
            f.presence.lookup("alice").await.unwrap(),
            Some("conn-a".to_string())
        );
        assert!(f.hub.is_attached("conn-a", &public.id).await);
        assert!(f.hub.is_attached("conn-a", &private.id).await);
    }

    #[tokio::test]
    async fn test_go_offline_unregisters_and_detaches() {
        let f = fixture();
        let room = f.room_service.create_public("general", "alice").await.unwrap();

        let mut lc = lifecycle(&f, "conn-a", "alice");
        let (tx, _rx) = mpsc::unbounded_channel();
        lc.go_online(tx).await.unwrap();

        lc.go_offline().await;

        assert_eq!(lc.state(), ConnectionState::Offline);
        assert_eq!(f.presence.lookup("alice").await.unwrap(), None);
        assert!(!f.hub.is_attached("conn-a", &room.id).await);
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_successor_online() {
        let f = fixture();

        let mut old = lifecycle(&f, "conn-old", "alice");
        let (tx_old, _rx_old) = mpsc::unbounded_channel();
        old.go_online(tx_old).await.unwrap();

        // Reconnect supersedes: a fresh lifecycle on a new connection
        let mut new = lifecycle(&f, "conn-new", "alice");
        let (tx_new, _rx_new) = mpsc::unbounded_channel();
        new.go_online(tx_new).await.unwrap();

        // The old socket finally closes
        old.go_offline().await;

        assert_eq!(
            f.presence.lookup("alice").await.unwrap(),
            Some("conn-new".to_string())
        );
    }

    struct UnreachablePresence;

    #[async_trait]
    impl PresenceIndex for UnreachablePresence {
        async fn register(&self, _: &str, _: &str) -> Result<(), AppError> {
            Err(AppError::CollaboratorUnavailable("presence store down".to_string()))
        }
        async fn lookup(&self, _: &str) -> Result<Option<String>, AppError> {
            Err(AppError::CollaboratorUnavailable("presence store down".to_string()))
        }
        async fn unregister(&self, _: &str) -> Result<(), AppError> {
            Err(AppError::CollaboratorUnavailable("presence store down".to_string()))
        }
        async fn unregister_connection(&self, _: &str, _: &str) -> Result<bool, AppError> {
            Err(AppError::CollaboratorUnavailable("presence store down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_presence_failure_does_not_block_online_transition() {
        let f = fixture();
        let mut lc = ConnectionLifecycle::new(
            "conn-a".to_string(),
            "alice".to_string(),
            "Alice".to_string(),
            Arc::new(UnreachablePresence),
            f.room_service.clone(),
            f.hub.clone(),
        );

        let (tx, _rx) = mpsc::unbounded_channel();
        lc.go_online(tx).await.unwrap();

        assert_eq!(lc.state(), ConnectionState::Online);
    }

    #[tokio::test]
    async fn test_offline_is_terminal() {
        let f = fixture();
        let mut lc = lifecycle(&f, "conn-a", "alice");

        let (tx, _rx) = mpsc::unbounded_channel();
        lc.go_online(tx).await.unwrap();
        lc.go_offline().await;

        // No re-entry: a second go_online is ignored
        let (tx2, _rx2) = mpsc::unbounded_channel();
        lc.go_online(tx2).await.unwrap();
        assert_eq!(lc.state(), ConnectionState::Offline);
    }
}
