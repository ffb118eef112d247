pub mod auth;
pub mod clients;
pub mod error;
pub mod handlers;
pub mod rest;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

pub use auth::AuthUser;
pub use error::*;
pub use rest::ApiDoc;
pub use routes::*;
pub use server::*;
pub use state::*;
pub use store::{ApplicationStore, InMemoryStore};
