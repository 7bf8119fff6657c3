pub mod chats;
pub mod db;
pub mod events;
pub mod graph;
pub mod identities;
pub mod messages;
pub mod models;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
