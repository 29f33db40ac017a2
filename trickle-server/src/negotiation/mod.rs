mod candidate_buffer;
mod connection;
mod connection_command;
mod connection_event;
mod message_loop;

pub use candidate_buffer::{CandidateBuffer, Gathered};
pub use connection::{Connection, ConnectionSetup, EARLY_CANDIDATE_LIMIT, MessageProducer};
pub use connection_command::ConnectionCommand;
pub use connection_event::ConnectionEvent;
pub use message_loop::spawn_message_loop;
