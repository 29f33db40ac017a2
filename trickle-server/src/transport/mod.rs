mod message_channel;
mod peer_transport;
mod transport_config;
mod transport_event;
mod webrtc_transport;

pub use message_channel::MessageChannel;
pub use peer_transport::{PeerTransport, TransportFactory};
pub use transport_config::{IceServerConfig, TransportConfig};
pub use transport_event::TransportEvent;
pub use webrtc_transport::{WebRtcTransport, WebRtcTransportFactory};
