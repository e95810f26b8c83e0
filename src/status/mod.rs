pub mod api;
pub mod server;

pub use api::StatusState;
pub use server::{serve, start_server};
