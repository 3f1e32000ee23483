// Service exports
pub mod auth;
pub mod memory;
pub mod postgres;
pub mod rest;
pub mod store;

pub use auth::{bearer_token, AuthError, AuthGate, Claims, Principal, MANAGE_PANELISTS};
pub use memory::InMemoryPanelistStore;
pub use postgres::PostgresPanelistStore;
pub use rest::RestPanelistStore;
pub use store::{PanelistStore, StoreError};
