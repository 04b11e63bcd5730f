//! Core types for the customer console.
//!
//! This module provides type-safe wrappers for the customer domain.

pub mod customer;
pub mod email;
pub mod gender;
pub mod id;

pub use customer::{Customer, CustomerDraft, CustomerUpdate};
pub use email::{Email, EmailError};
pub use gender::Gender;
pub use id::*;
