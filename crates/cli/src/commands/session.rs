//! Sign-in and identity commands.

use customer_console::{Console, Navigation, Route};
use customer_console_core::LoginForm;
use secrecy::ExposeSecret;
use tracing::info;

use super::CliError;

/// Log in with the configured credentials and open the customers screen.
///
/// # Errors
///
/// Returns `CliError` if credentials are missing or invalid, the backend
/// rejects them, or the guard refuses the customers screen.
pub async fn sign_in(console: &Console, username: Option<&str>) -> Result<(), CliError> {
    let credentials = console.config().credentials(username)?;

    let form = LoginForm {
        username: credentials.username(),
        password: credentials.password().expose_secret(),
    };
    form.validate()
        .into_result()
        .map_err(|errors| CliError::invalid_form("login", &errors))?;

    let claims = console.session().login(&credentials).await?;
    info!(subject = %claims.sub, "Logged in");

    enter(console, Route::Customers)
}

/// Pass the route guard for `route`.
///
/// # Errors
///
/// Returns `CliError::Redirected` if the guard sends the user elsewhere.
pub fn enter(console: &Console, route: Route) -> Result<(), CliError> {
    match console.guard().check(route) {
        Navigation::Proceed => Ok(()),
        Navigation::Redirect(to) => Err(CliError::Redirected { from: route, to }),
    }
}

/// Print the signed-in identity.
#[allow(clippy::print_stdout)]
pub fn whoami(console: &Console) {
    let session = console.session();
    let Some(claims) = session.current_identity() else {
        println!("not signed in");
        return;
    };

    println!("subject:  {}", claims.sub);
    if let Some(profile) = session.current_profile() {
        println!("name:     {} (#{})", profile.name, profile.id);
    }
    if !claims.scopes.is_empty() {
        println!("roles:    {}", claims.scopes.join(", "));
    }
    if let Some(expires_at) = claims.expires_at() {
        println!("expires:  {}", expires_at.to_rfc3339());
    }
}
