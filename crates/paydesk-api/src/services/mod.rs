//! Business flows behind the HTTP handlers

pub mod overdue;
pub mod payments;
pub mod reconciliation;
