mod http_client;
mod http_handler;
mod signal_outbox;
mod signaling_output;
mod signaling_service;

pub use http_client::HttpSignalingClient;
pub use http_handler::handle_signal;
pub use signal_outbox::OutboundSignal;
pub(crate) use signal_outbox::spawn_outbox;
pub use signaling_output::SignalingOutput;
pub use signaling_service::{SignalingService, serve, serve_tls};
