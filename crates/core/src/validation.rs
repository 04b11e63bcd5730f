//! Field validation for the customer and login forms.
//!
//! These are pure functions: given raw field values they return a mapping of
//! field name to the message shown next to that field. An empty mapping means
//! the form may be submitted. The server remains the authority; these rules
//! only keep obviously bad input off the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Customer, CustomerDraft, CustomerUpdate, Email, Gender};

/// Maximum customer name length, in characters.
pub const NAME_MAX_CHARS: usize = 15;
/// Youngest accepted customer age.
pub const AGE_MIN: i32 = 16;
/// Oldest accepted customer age.
pub const AGE_MAX: i32 = 100;
/// Maximum password length on the login form.
pub const PASSWORD_MAX_CHARS: usize = 20;

/// Field name to error message, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Create an empty set of errors.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record an error for `field`, keeping the first message if one exists.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// The message for `field`, if it failed validation.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing failed, otherwise the errors themselves.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (field, message) in iter {
            errors.insert(field, message);
        }
        errors
    }
}

/// Raw values of the create/update customer form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    /// `None` when the age input is blank or not a number.
    pub age: Option<i32>,
}

impl CustomerForm {
    /// Prefill the form from an existing record.
    #[must_use]
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            email: customer.email.to_string(),
            age: Some(customer.age),
        }
    }

    /// Validate every field.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name", "Required");
        } else if name.chars().count() > NAME_MAX_CHARS {
            errors.insert("name", "Must be 15 characters or less");
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.insert("email", "Required");
        } else if Email::parse(email).is_err() {
            errors.insert("email", "Invalid email address");
        }

        match self.age {
            None => errors.insert("age", "Required"),
            Some(age) if age < AGE_MIN => errors.insert("age", "Must be at least 16 years of age"),
            Some(age) if age > AGE_MAX => errors.insert("age", "Must be at most 100 years of age"),
            Some(_) => {}
        }

        errors
    }

    /// Build a creation payload.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn to_draft(&self, gender: Gender) -> Result<CustomerDraft, FieldErrors> {
        let (name, email, age) = self.checked()?;
        Ok(CustomerDraft {
            name,
            email,
            age,
            gender,
        })
    }

    /// Build a patch holding only the fields that differ from `original`.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid, or a `form` error if
    /// nothing changed (the backend rejects empty updates).
    pub fn to_update(&self, original: &Customer) -> Result<CustomerUpdate, FieldErrors> {
        let (name, email, age) = self.checked()?;
        let update = CustomerUpdate {
            name: (name != original.name).then_some(name),
            email: (email != original.email).then_some(email),
            age: (age != original.age).then_some(age),
        };

        if update.is_empty() {
            let mut errors = FieldErrors::new();
            errors.insert("form", "No data changes found");
            return Err(errors);
        }
        Ok(update)
    }

    fn checked(&self) -> Result<(String, Email, i32), FieldErrors> {
        let errors = self.validate();
        match (Email::parse(self.email.trim()), self.age) {
            (Ok(email), Some(age)) if errors.is_empty() => {
                Ok((self.name.trim().to_owned(), email, age))
            }
            _ => Err(errors),
        }
    }
}

/// Values of the login form, borrowed for the duration of validation.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginForm<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl LoginForm<'_> {
    /// Validate both fields.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.insert("username", "Email is required");
        } else if Email::parse(username).is_err() {
            errors.insert("username", "Must be valid email");
        }

        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        } else if self.password.chars().count() > PASSWORD_MAX_CHARS {
            errors.insert("password", "Password cannot be more than 20 characters");
        }

        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CustomerId;

    fn form(name: &str, email: &str, age: Option<i32>) -> CustomerForm {
        CustomerForm {
            name: name.to_string(),
            email: email.to_string(),
            age,
        }
    }

    fn ana() -> Customer {
        Customer {
            id: CustomerId::new(1),
            name: "Ana".to_string(),
            email: Email::parse("ana@x.com").unwrap(),
            age: 30,
            gender: Gender::Female,
            username: None,
            roles: vec![],
            profile_image_id: None,
        }
    }

    #[test]
    fn test_valid_form_has_no_errors() {
        assert!(form("Ana", "ana@x.com", Some(30)).validate().is_empty());
        assert!(form("Ana", "ana@x.com", Some(16)).validate().is_empty());
        assert!(form("Ana", "ana@x.com", Some(100)).validate().is_empty());
    }

    #[test]
    fn test_required_fields() {
        let errors = form("  ", "", None).validate();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("name"), Some("Required"));
        assert_eq!(errors.get("email"), Some("Required"));
        assert_eq!(errors.get("age"), Some("Required"));
    }

    #[test]
    fn test_constraint_messages() {
        let errors = form("Maximilianusxxxx", "not-an-email", Some(15)).validate();
        assert_eq!(errors.get("name"), Some("Must be 15 characters or less"));
        assert_eq!(errors.get("email"), Some("Invalid email address"));
        assert_eq!(errors.get("age"), Some("Must be at least 16 years of age"));

        let errors = form("Ana", "ana@x.com", Some(101)).validate();
        assert_eq!(errors.get("age"), Some("Must be at most 100 years of age"));
    }

    #[test]
    fn test_name_length_counts_characters() {
        // 15 multi-byte characters are still within the limit.
        assert!(form(&"é".repeat(15), "ana@x.com", Some(30)).validate().is_empty());
    }

    #[test]
    fn test_to_draft() {
        let draft = form(" Ana ", "ana@x.com", Some(30))
            .to_draft(Gender::Female)
            .unwrap();
        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.gender, Gender::Female);

        assert!(form("", "ana@x.com", Some(30)).to_draft(Gender::Male).is_err());
    }

    #[test]
    fn test_to_update_keeps_only_changed_fields() {
        let original = ana();
        let mut edited = CustomerForm::from_customer(&original);
        edited.age = Some(31);

        let update = edited.to_update(&original).unwrap();
        assert_eq!(update.age, Some(31));
        assert!(update.name.is_none());
        assert!(update.email.is_none());
    }

    #[test]
    fn test_to_update_rejects_pristine_form() {
        let original = ana();
        let errors = CustomerForm::from_customer(&original)
            .to_update(&original)
            .unwrap_err();
        assert_eq!(errors.get("form"), Some("No data changes found"));
    }

    #[test]
    fn test_login_form() {
        let ok = LoginForm {
            username: "ana@x.com",
            password: "azerty.123..",
        };
        assert!(ok.validate().is_empty());

        let errors = LoginForm::default().validate();
        assert_eq!(errors.get("username"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let long = "x".repeat(21);
        let errors = LoginForm {
            username: "ana",
            password: &long,
        }
        .validate();
        assert_eq!(errors.get("username"), Some("Must be valid email"));
        assert_eq!(
            errors.get("password"),
            Some("Password cannot be more than 20 characters")
        );
    }

    #[test]
    fn test_login_form_debug_redacts_password() {
        let form = LoginForm {
            username: "ana@x.com",
            password: "hunter2",
        };
        let debug = format!("{form:?}");
        assert!(debug.contains("ana@x.com"));
        assert!(!debug.contains("hunter2"));
    }
}
