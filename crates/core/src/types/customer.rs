//! Customer records as exchanged with the backend.

use serde::{Deserialize, Serialize};

use super::{CustomerId, Email, Gender};

/// A customer record as returned by the backend.
///
/// Values of this type are only ever constructed from server responses, so
/// everything here reflects a record the server has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Server-assigned identifier.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Contact email, unique across customers.
    pub email: Email,
    /// Age in years.
    pub age: i32,
    /// Gender, used only for display imagery.
    pub gender: Gender,
    /// Login name; the backend uses the email.
    #[serde(default)]
    pub username: Option<String>,
    /// Granted roles (e.g. `ROLE_USER`).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Reference to the uploaded profile picture, if any.
    #[serde(default)]
    pub profile_image_id: Option<String>,
}

impl Customer {
    /// Whether a profile picture has been uploaded for this customer.
    #[must_use]
    pub fn has_profile_image(&self) -> bool {
        self.profile_image_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// Fields for a customer that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDraft {
    pub name: String,
    pub email: Email,
    pub age: i32,
    pub gender: Gender,
}

/// A partial update; `None` fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
}

impl CustomerUpdate {
    /// Returns `true` if the patch would not change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }
}
