//! Paydesk persistence layer
//!
//! PostgreSQL repositories plus the store traits the payment layer is written
//! against, with in-memory implementations for tests and local tooling.

pub mod db;

pub use db::{
    ClientRepository, ClientStore, InMemoryStore, InvoiceRepository, InvoiceStore,
    ProductRepository, ProductStore, UserRepository, UserSettingsStore,
};
