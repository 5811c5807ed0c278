//! clfs-services — object store and the server side of the clfs protocol.

pub mod acceptor;
pub mod handler;
pub mod locks;
pub mod receive;
pub mod send;
pub mod store;

pub use acceptor::{bind_listener, Acceptor};
pub use handler::ConnectionHandler;
pub use locks::{ObjectGuard, ObjectLocks};
pub use receive::{receive_object, ReceiveReport};
pub use send::{send_object, SendError, SendReport};
pub use store::{ObjectReader, ObjectStore, ObjectWriter, StoreError};
