pub mod clients;
pub mod invoices;
pub mod payments;
pub mod products;
pub mod settings;
pub mod stripe_connect;
pub mod webhooks;
