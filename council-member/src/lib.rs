//! Library side of the council member node: the TCP realization of the
//! engine's abstract transport.

mod transport;

pub use transport::{TcpTransport, TransportError};
