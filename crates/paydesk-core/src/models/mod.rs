pub mod client;
pub mod invoice;
pub mod payment;
pub mod product;
pub mod user;

pub use client::*;
pub use invoice::*;
pub use payment::*;
pub use product::*;
pub use user::*;

/// Generate a document id such as `inv_9f1c2b...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
