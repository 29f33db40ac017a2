pub use trickle_core::{PeerIdentity, SessionDescription};

pub mod model {
    pub use trickle_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use trickle_server::*;
}
