//! Live-connection layer: WebSocket upgrade, per-connection reader/writer
//! tasks, heartbeat, and presence tracking.

mod handler;
mod presence;

pub use handler::queue_websocket;
pub use presence::{ConnectionClosed, ConnectionOpened, Presence};
