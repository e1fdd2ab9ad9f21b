mod provider;
mod transport;

pub use provider::ProviderTransport;
pub use transport::{MediaTransport, RoomCredential, RoomInfo, TransportError};
