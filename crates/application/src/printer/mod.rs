mod buffer;
mod connection;
mod job;

pub use buffer::{CommandBuffer, Trailer};
pub use connection::{ConnectionManager, ConnectionSettings};
pub use job::{JobReceipt, JobTicket};
