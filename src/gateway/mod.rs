pub mod channels;
pub mod handler;
pub mod lifecycle;
pub mod messages;
pub mod socket;

pub use channels::{ChannelHub, InMemoryChannelHub};
pub use handler::{chat_ws_handler, GatewayFrameHandler};
pub use lifecycle::{ConnectionLifecycle, ConnectionState};
pub use messages::{ClientFrame, ServerFrame};
pub use socket::{Connection, FrameHandler, SocketWrapper};
