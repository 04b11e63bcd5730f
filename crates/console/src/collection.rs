//! The customer list shown to the user.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use customer_console_core::Customer;
use tracing::{debug, instrument};

use crate::customers::CustomerRepository;
use crate::error::ConsoleError;

/// Customers as of the last successful list fetch, plus a loading indicator.
///
/// The list is only ever replaced wholesale; a failed refresh leaves the
/// previous contents in place. When refreshes overlap, the response of the
/// fetch started last wins regardless of arrival order.
#[derive(Debug, Clone, Default)]
pub struct CustomerCollection {
    inner: Arc<CollectionInner>,
}

#[derive(Debug, Default)]
struct CollectionInner {
    listing: RwLock<Listing>,
    loading: AtomicUsize,
    next_fetch: AtomicU64,
}

#[derive(Debug, Default)]
struct Listing {
    /// Sequence number of the fetch that produced `customers`.
    installed: u64,
    customers: Vec<Customer>,
}

impl CustomerCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Customer> {
        self.inner
            .listing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .customers
            .clone()
    }

    /// Number of customers held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .listing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .customers
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a refresh is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire) > 0
    }

    /// Replace the list with a fresh server response.
    ///
    /// Counts as the newest fetch, so refreshes started earlier that are
    /// still running will not overwrite it.
    pub fn replace(&self, customers: Vec<Customer>) {
        let seq = self.next_seq();
        self.install(seq, customers);
    }

    fn next_seq(&self) -> u64 {
        self.inner.next_fetch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Install `customers` unless a later fetch already has. Returns whether
    /// the list was replaced.
    fn install(&self, seq: u64, customers: Vec<Customer>) -> bool {
        let mut listing = self
            .inner
            .listing
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if seq <= listing.installed {
            debug!(seq, installed = listing.installed, "stale customer list discarded");
            return false;
        }
        listing.installed = seq;
        listing.customers = customers;
        true
    }

    /// Fetch the list once and install it, unless a fetch started later has
    /// already completed.
    ///
    /// # Errors
    ///
    /// Returns the repository error; the current list is kept.
    #[instrument(skip_all)]
    pub async fn refresh(&self, repository: &CustomerRepository) -> Result<usize, ConsoleError> {
        let _loading = Loading::start(&self.inner.loading);
        let seq = self.next_seq();
        let customers = repository.list().await?;
        let count = customers.len();
        self.install(seq, customers);
        Ok(count)
    }
}

/// Counts a running refresh; refreshes may overlap.
struct Loading<'a>(&'a AtomicUsize);

impl<'a> Loading<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
