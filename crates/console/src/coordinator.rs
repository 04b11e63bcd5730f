//! Mutation coordination.
//!
//! A `MutationCoordinator` wraps the submissions of one form. Each submission
//! runs the mutation, then on success refreshes the customer list; every
//! outcome produces exactly one notification, and a second submission while
//! one is running is ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use customer_console_core::{CustomerDraft, CustomerId, CustomerUpdate};
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use crate::busy::BusyGuard;
use crate::collection::CustomerCollection;
use crate::customers::{CustomerRepository, ProfilePicture};
use crate::error::ConsoleError;
use crate::notify::NotificationSink;

/// Title of the notification sent when the list could not be reloaded after
/// a successful mutation.
pub const REFRESH_FAILED_TITLE: &str = "Customers not refreshed";

//// What a submission does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    UploadPicture,
}

impl MutationKind {
    /// Uppercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::UploadPicture => "UPLOAD_PICTURE",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One form submission.
///
/// `name` fields carry the customer's display name for the success message.
#[derive(Debug, Clone)]
pub enum MutationRequest {
    /// Register a customer with the given password.
    Create {
        draft: CustomerDraft,
        password: SecretString,
    },
    /// Apply a partial update.
    Update {
        id: CustomerId,
        name: String,
        patch: CustomerUpdate,
    },
    /// Delete a customer.
    Delete { id: CustomerId, name: String },
    /// Attach a profile picture.
    UploadPicture {
        id: CustomerId,
        picture: ProfilePicture,
    },
}

impl MutationRequest {
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::Create { .. } => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
            Self::UploadPicture { .. } => MutationKind::UploadPicture,
        }
    }

    /// Title and message announcing success.
    #[must_use]
    pub fn success_message(&self) -> (&'static str, String) {
        match self {
            Self::Create { draft, .. } => (
                "Customer saved",
                format!("{} was successfully saved", draft.name),
            ),
            Self::Update { name, .. } => {
                ("Customer saved", format!("{name} was successfully updated"))
            }
            Self::Delete { name, .. } => {
                ("Customer deleted", format!("{name} was successfully deleted"))
            }
            Self::UploadPicture { .. } => ("Success", "Profile picture uploaded".to_string()),
        }
    }
}

/// Outcome of [`MutationCoordinator::submit`].
#[derive(Debug, Clone)]
pub enum Submission {
    /// Another submission was still running; nothing was sent.
    Skipped,
    /// The mutation succeeded. `refreshed` is `false` if the list reload
    /// after it failed.
    Completed { refreshed: bool },
    /// The mutation failed; the list was not reloaded.
    Failed(ConsoleError),
}

impl Submission {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The error of a failed submission.
    #[must_use]
    pub const fn error(&self) -> Option<&ConsoleError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Sequences the submissions of a single form.
pub struct MutationCoordinator {
    repository: CustomerRepository,
    collection: CustomerCollection,
    notifier: Arc<dyn NotificationSink>,
    in_flight: AtomicBool,
}

impl MutationCoordinator {
    #[must_use]
    pub fn new(
        repository: CustomerRepository,
        collection: CustomerCollection,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            repository,
            collection,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is running; the submit action should be disabled.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one submission to completion.
    ///
    /// Returns [`Submission::Skipped`] without side effects if a submission
    /// is already running. Otherwise the mutation is awaited; on success the
    /// success notification is sent and the list is fetched exactly once, on
    /// failure the failure notification is sent and nothing is fetched. The
    /// in-flight flag is cleared when this future completes or is dropped.
    #[instrument(skip_all, fields(kind = %request.kind()))]
    pub async fn submit(&self, request: MutationRequest) -> Submission {
        let Some(_in_flight) = BusyGuard::acquire(&self.in_flight) else {
            debug!("Submission already in flight; ignoring");
            return Submission::Skipped;
        };

        let (title, message) = request.success_message();

        if let Err(err) = self.perform(request).await {
            warn!(error = %err, "Mutation failed");
            self.notifier.notify_failure(err.kind().code(), err.detail());
            return Submission::Failed(err);
        }

        info!("{message}");
        self.notifier.notify_success(title, &message);

        let refreshed = match self.collection.refresh(&self.repository).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Customer list refresh failed");
                self.notifier.notify_failure(REFRESH_FAILED_TITLE, err.detail());
                false
            }
        };

        Submission::Completed { refreshed }
    }

    async fn perform(&self, request: MutationRequest) -> Result<(), ConsoleError> {
        match request {
            MutationRequest::Create { draft, password } => {
                self.repository.create(&draft, &password).await.map(|_| ())
            }
            MutationRequest::Update { id, patch, .. } => self.repository.update(id, &patch).await,
            MutationRequest::Delete { id, .. } => self.repository.delete(id).await,
            MutationRequest::UploadPicture { id, picture } => {
                self.repository.upload_profile_picture(id, &picture).await
            }
        }
    }
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("in_flight", &self.is_in_flight())
            .finish_non_exhaustive()
    }
}
