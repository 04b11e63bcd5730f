//! Customer console library.
//!
//! Session handling, customer API access and mutation coordination for an
//! administrative customer console. Presentation layers (the CLI in this
//! workspace, or a GUI) drive it through [`Console`].
//!
//! # Layout
//!
//! - [`session`] - login, logout and the bearer token
//! - [`customers`] - the customer REST endpoints
//! - [`coordinator`] - mutate, then refresh, then notify
//! - [`guard`] - which screens a user may see
//!
//! # Security
//!
//! Tokens and passwords are held as `secrecy::SecretString` and redacted from
//! `Debug` output and logs.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
mod busy;
pub mod collection;
pub mod config;
pub mod coordinator;
pub mod customers;
pub mod error;
pub mod guard;
pub mod notify;
pub mod session;
pub mod state;

pub use collection::CustomerCollection;
pub use config::{ConfigError, ConsoleConfig};
pub use coordinator::{MutationCoordinator, MutationKind, MutationRequest, Submission};
pub use customers::{CustomerRepository, ProfilePicture};
pub use error::{ConsoleError, ErrorKind};
pub use guard::{Navigation, Route, RouteGuard};
pub use notify::{NotificationSink, TracingNotifier};
pub use session::{AuthState, Claims, Credentials, SessionStore};
pub use state::Console;
