//! Backend transport

mod session;

pub use session::{ACK_OK, AckPoll, Connection, Connector, END_MARKER, Session, TcpConnector};
