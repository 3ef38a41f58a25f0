// Library crate for the parley chat server
// This file exposes the public API for integration tests

pub mod gateway;
pub mod identity;
pub mod message;
pub mod presence;
pub mod room;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use gateway::{ChannelHub, ConnectionLifecycle, ConnectionState, GatewayFrameHandler, ServerFrame};
pub use message::{repository::MessageRepository, router::MessageRouter};
pub use presence::{InMemoryPresenceIndex, PresenceIndex};
pub use room::{models::RoomModel, repository::RoomRepository, service::RoomService};
pub use shared::AppError;
