use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text frame to the client
    async fn send_frame(&mut self, frame: String) -> Result<(), SocketError>;

    /// Receive the next frame from the client (None if connection closed)
    async fn receive_frame(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Handler for inbound frames from one client connection
#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn handle_frame(&self, raw: String);
}

#[derive(Debug)]
pub enum SocketError {
    ConnectionClosed,
    SendFailed(String),
    ReceiveFailed(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_frame(&mut self, frame: String) -> Result<(), SocketError> {
        self.send(Message::Text(frame))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_frame(&mut self) -> Result<Option<String>, SocketError> {
        match self.next().await {
            Some(Ok(Message::Text(text))) => Ok(Some(text)),
            Some(Ok(Message::Close(_))) => Ok(None),
            Some(Ok(_)) => Ok(None), // Ignore binary/ping/pong
            Some(Err(e)) => Err(SocketError::ReceiveFailed(e.to_string())),
            None => Ok(None), // Connection closed
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// A managed client connection: pumps outbound frames from the channel
/// hub's queue to the socket, and inbound frames to the frame handler.
///
/// The single select loop is what gives per-connection ordering: a
/// disconnect cannot be observed before an earlier inbound frame from
/// the same connection has been handed to the handler.
pub struct Connection {
    pub connection_id: String,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    frame_handler: Arc<dyn FrameHandler>,
}

impl Connection {
    pub fn new(
        connection_id: String,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        frame_handler: Arc<dyn FrameHandler>,
    ) -> Self {
        Self {
            connection_id,
            socket,
            outbound_receiver,
            frame_handler,
        }
    }

    /// Run the connection - handles both sending and receiving until disconnect
    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                // Outbound frames (from the channel hub to the client)
                frame = self.outbound_receiver.recv() => {
                    match frame {
                        Some(frame) => {
                            self.socket.send_frame(frame).await?
                        }
                        None => break, // Channel closed, disconnect
                    }
                }

                // Inbound frames (from the client to the engine)
                frame = self.socket.receive_frame() => {
                    match frame {
                        Ok(Some(frame)) => {
                            self.frame_handler.handle_frame(frame).await;
                        }
                        Ok(None) => break, // Client disconnected
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Clean disconnect
        let _ = self.socket.close().await;
        Ok(())
    }
}
