//! Network Module
//!
//! TCP plumbing for both ends of the protocol.
//!
//! ## Architecture
//! - Client: [`connect`] opens one configured connection per operation
//! - Server: single acceptor loop, one thread per connection
//! - Each connection carries exactly one request/response exchange
//! - Requests of the same client id are serialised by [`UserLocks`]

mod connect;
mod locks;
mod server;
mod session;

pub use connect::connect;
pub use locks::{UserGuard, UserLocks};
pub use server::Server;
pub use session::Session;
