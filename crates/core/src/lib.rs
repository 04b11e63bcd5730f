//! Customer Console Core - Shared types library.
//!
//! This crate provides the types shared by every customer console component:
//! - `console` - Session handling, customer API access and mutation coordination
//! - `cli` - Command-line front end driving the console
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere,
//! including from form code that must validate input before submitting.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, genders and customer records
//! - [`validation`] - Field validation rules for the customer and login forms

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{CustomerForm, FieldErrors, LoginForm};
