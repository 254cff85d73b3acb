//! Database repositories for the data access layer
//!
//! Each repository owns one table. The store traits in `store` are the seam
//! handlers and services depend on; `memory` provides a process-local
//! implementation of every trait.

pub mod client;
pub mod invoice;
pub mod memory;
pub mod product;
pub mod store;
pub mod user;

pub use client::ClientRepository;
pub use invoice::InvoiceRepository;
pub use memory::InMemoryStore;
pub use product::ProductRepository;
pub use store::{ClientStore, InvoiceStore, ProductStore, UserSettingsStore};
pub use user::UserRepository;
