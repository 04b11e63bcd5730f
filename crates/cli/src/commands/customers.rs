//! Customer commands.
//!
//! Mutations go through the console's coordinator, which reports the outcome
//! through the tracing notifier and refreshes the customer list.

use std::path::Path;

use customer_console::{Console, MutationRequest, ProfilePicture};
use customer_console_core::{Customer, CustomerForm, CustomerId, Gender};
use secrecy::SecretString;

use super::{CliError, finish};

/// Print every customer.
///
/// # Errors
///
/// Returns `CliError::Console` if the list cannot be fetched.
pub async fn list(console: &Console) -> Result<(), CliError> {
    console.collection().refresh(console.repository()).await?;
    print_customers(console, &console.collection().snapshot());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_customers(console: &Console, customers: &[Customer]) {
    if customers.is_empty() {
        println!("No customers available");
        return;
    }

    println!("{:>5}  {:<15}  {:<30}  {:>3}  {:<6}  PICTURE", "ID", "NAME", "EMAIL", "AGE", "GENDER");
    for customer in customers {
        let picture = if customer.has_profile_image() {
            console
                .repository()
                .profile_picture_url(customer.id)
                .to_string()
        } else {
            "-".to_string()
        };
        println!(
            "{:>5}  {:<15}  {:<30}  {:>3}  {:<6}  {picture}",
            customer.id, customer.name, customer.email, customer.age, customer.gender
        );
    }
}

/// Register a customer.
///
/// # Errors
///
/// Returns `CliError::InvalidForm` without contacting the backend if the
/// values are invalid, or the submission error.
pub async fn create(
    console: &Console,
    name: String,
    email: String,
    age: i32,
    gender: Gender,
    password: String,
) -> Result<(), CliError> {
    let form = CustomerForm {
        name,
        email,
        age: Some(age),
    };
    let draft = form
        .to_draft(gender)
        .map_err(|errors| CliError::invalid_form("customer", &errors))?;

    let submission = console
        .coordinator()
        .submit(MutationRequest::Create {
            draft,
            password: SecretString::from(password),
        })
        .await;
    finish(submission)
}

/// Change some fields of a customer.
///
/// # Errors
///
/// Returns `CliError::InvalidForm` if the new values are invalid or change
/// nothing, or the submission error.
pub async fn update(
    console: &Console,
    id: CustomerId,
    name: Option<String>,
    email: Option<String>,
    age: Option<i32>,
) -> Result<(), CliError> {
    let original = console.repository().get(id).await?;

    let mut form = CustomerForm::from_customer(&original);
    if let Some(name) = name {
        form.name = name;
    }
    if let Some(email) = email {
        form.email = email;
    }
    if age.is_some() {
        form.age = age;
    }

    let patch = form
        .to_update(&original)
        .map_err(|errors| CliError::invalid_form("customer", &errors))?;

    let submission = console
        .coordinator()
        .submit(MutationRequest::Update {
            id,
            name: form.name.trim().to_string(),
            patch,
        })
        .await;
    finish(submission)
}

/// Delete a customer.
///
/// # Errors
///
/// Returns the submission error, e.g. `NOT_FOUND` for an unknown id.
pub async fn delete(console: &Console, id: CustomerId) -> Result<(), CliError> {
    // The name only feeds the success message; fall back to the id if the
    // record cannot be read.
    let name = match console.repository().get(id).await {
        Ok(customer) => customer.name,
        Err(err) if err.is_auth() => return Err(err.into()),
        Err(_) => format!("Customer #{id}"),
    };

    let submission = console
        .coordinator()
        .submit(MutationRequest::Delete { id, name })
        .await;
    finish(submission)
}

/// Upload a profile picture from disk.
///
/// # Errors
///
/// Returns `CliError::Io` if the file cannot be read, or the submission error.
pub async fn upload(console: &Console, id: CustomerId, path: &Path) -> Result<(), CliError> {
    let picture = ProfilePicture::from_path(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let submission = console
        .coordinator()
        .submit(MutationRequest::UploadPicture { id, picture })
        .await;
    finish(submission)
}

/// Print where a customer's profile picture is served.
#[allow(clippy::print_stdout)]
pub fn picture_url(console: &Console, id: CustomerId) {
    println!("{}", console.repository().profile_picture_url(id));
}
