//! Customer REST API.
//!
//! `CustomerRepository` holds no customer state. Each call reads the bearer
//! token from the session at call time, and a 401/403 answer ends the session
//! that sent the request.

use std::path::Path;

use customer_console_core::{Customer, CustomerDraft, CustomerId, CustomerUpdate};
use reqwest::{Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ConsoleError;
use crate::session::SessionStore;

/// Image file to attach to a customer.
#[derive(Clone)]
pub struct ProfilePicture {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl ProfilePicture {
    /// Wrap in-memory image bytes; the content type is guessed from the file name.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_image_type(&file_name).map(String::from);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Override the guessed content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read an image from disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ProfilePicture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilePicture")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn guess_image_type(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Registration body: the draft plus the new account's password.
#[derive(Serialize)]
struct RegistrationRequest<'a> {
    #[serde(flatten)]
    draft: &'a CustomerDraft,
    password: &'a str,
}

/// Client for the `/api/v1/customers` endpoints.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    session: SessionStore,
}

impl CustomerRepository {
    /// Create a repository that authenticates through `session`.
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// The session this repository reads its token from.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Fetch every customer.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError` on any failed request.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Customer>, ConsoleError> {
        let url = self.session.endpoints().customers();
        let customers: Vec<Customer> = self.send(Method::GET, url, |r| r).await?.json().await?;
        debug!(count = customers.len(), "Fetched customers");
        Ok(customers)
    }

    /// Fetch one customer.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::NotFound` if the id is unknown.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn get(&self, id: CustomerId) -> Result<Customer, ConsoleError> {
        let url = self.session.endpoints().customer(id);
        Ok(self.send(Method::GET, url, |r| r).await?.json().await?)
    }

    /// Register a new customer.
    ///
    /// The backend acknowledges registration without echoing the record; the
    /// created customer is returned only when the response body carries one.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Validation` if the server rejects the values
    /// (e.g. the email is taken).
    #[instrument(skip(self, draft, password), fields(email = %draft.email))]
    pub async fn create(
        &self,
        draft: &CustomerDraft,
        password: &SecretString,
    ) -> Result<Option<Customer>, ConsoleError> {
        let url = self.session.endpoints().customers();
        let body = RegistrationRequest {
            draft,
            password: password.expose_secret(),
        };
        let response = self.send(Method::POST, url, |r| r.json(&body)).await?;
        decode_optional(response).await
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::NotFound` if the customer no longer exists, or
    /// `ConsoleError::Validation` for rejected values.
    #[instrument(skip(self, patch), fields(customer_id = %id))]
    pub async fn update(&self, id: CustomerId, patch: &CustomerUpdate) -> Result<(), ConsoleError> {
        let url = self.session.endpoints().customer(id);
        self.send(Method::PUT, url, |r| r.json(patch)).await?;
        Ok(())
    }

    /// Delete a customer.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::NotFound` if the customer does not exist,
    /// including when it was already deleted.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn delete(&self, id: CustomerId) -> Result<(), ConsoleError> {
        let url = self.session.endpoints().customer(id);
        self.send(Method::DELETE, url, |r| r).await?;
        Ok(())
    }

    /// Upload a profile picture as a multipart `file` field.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Validation` for an empty file or content the
    /// server refuses, and `ConsoleError::NotFound` for an unknown id.
    #[instrument(skip(self, picture), fields(customer_id = %id, file = %picture.file_name, bytes = picture.len()))]
    pub async fn upload_profile_picture(
        &self,
        id: CustomerId,
        picture: &ProfilePicture,
    ) -> Result<(), ConsoleError> {
        if picture.is_empty() {
            let mut fields = customer_console_core::FieldErrors::new();
            fields.insert("file", "File is empty");
            return Err(ConsoleError::Validation {
                message: "Cannot upload an empty file".to_string(),
                fields,
            });
        }

        let part = reqwest::multipart::Part::bytes(picture.bytes.clone())
            .file_name(picture.file_name.clone());
        let part = match picture.content_type() {
            Some(mime) => part.mime_str(mime).map_err(|e| ConsoleError::Validation {
                message: format!("Invalid content type {mime:?}: {e}"),
                fields: customer_console_core::FieldErrors::new(),
            })?,
            None => part,
        };

        let url = self.session.endpoints().profile_image(id);
        self.send(Method::POST, url, move |r| {
            r.multipart(reqwest::multipart::Form::new().part("file", part))
        })
        .await?;
        Ok(())
    }

    /// Where a customer's profile picture is served from.
    ///
    /// Pure; the image is fetched by whatever renders it.
    #[must_use]
    pub fn profile_picture_url(&self, id: CustomerId) -> Url {
        self.session.endpoints().profile_image(id)
    }

    /// Send an authenticated request and map failures to `ConsoleError`.
    ///
    /// Nothing is sent without a live session. An authorization failure
    /// invalidates the session generation the request was sent with.
    async fn send<F>(&self, method: Method, url: Url, build: F) -> Result<Response, ConsoleError>
    where
        F: FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        let bearer = self.session.bearer_token()?;

        let request = self
            .session
            .http_client()
            .request(method, url)
            .bearer_auth(bearer.expose());
        let response = build(request).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = ConsoleError::from_response(status, &body);
        if err.is_auth() {
            self.session.invalidate(bearer.generation());
        }
        Err(err)
    }
}

async fn decode_optional(response: Response) -> Result<Option<Customer>, ConsoleError> {
    let body = response.bytes().await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| ConsoleError::Network(format!("unexpected response body: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Utc;
    use customer_console_core::{Email, Gender};
    use wiremock::matchers::{body_json, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiEndpoints;
    use crate::error::ErrorKind;

    fn jwt(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"ana@x.com","exp":{exp}}}"#));
        format!("{header}.{payload}.sig")
    }

    async fn signed_in(server: &MockServer) -> (CustomerRepository, String) {
        let endpoints = ApiEndpoints::new(Url::parse(&server.uri()).unwrap()).unwrap();
        let session = SessionStore::new(reqwest::Client::new(), endpoints);
        let token = jwt(Utc::now().timestamp() + 3600);
        session.restore(SecretString::from(token.clone())).unwrap();
        (CustomerRepository::new(session), token)
    }

    fn customer_json(id: i32, name: &str, email: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id, "name": name, "email": email, "gender": "FEMALE", "age": 30,
            "roles": ["ROLE_USER"], "username": email, "profileImageId": null
        })
    }

    #[tokio::test]
    async fn test_list_sends_bearer_token() {
        let server = MockServer::start().await;
        let (repo, token) = signed_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v1/customers"))
            .and(header("Authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                customer_json(1, "Ana", "ana@x.com"),
                customer_json(2, "Bo", "bo@x.com"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let customers = repo.list().await.unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[1].name, "Bo");
    }

    #[tokio::test]
    async fn test_empty_list_is_valid() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_posts_registration() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/customers"))
            .and(body_json(serde_json::json!({
                "name": "Ana", "email": "ana@x.com", "age": 30, "gender": "FEMALE",
                "password": "azerty.123.."
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let draft = CustomerDraft {
            name: "Ana".to_string(),
            email: Email::parse("ana@x.com").unwrap(),
            age: 30,
            gender: Gender::Female,
        };
        let created = repo
            .create(&draft, &SecretString::from("azerty.123.."))
            .await
            .unwrap();
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn test_create_returns_echoed_customer() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/customers"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(customer_json(7, "Ana", "ana@x.com")),
            )
            .mount(&server)
            .await;

        let draft = CustomerDraft {
            name: "Ana".to_string(),
            email: Email::parse("ana@x.com").unwrap(),
            age: 30,
            gender: Gender::Female,
        };
        let created = repo.create(&draft, &SecretString::from("pw")).await.unwrap();
        assert_eq!(created.map(|c| c.id), Some(CustomerId::new(7)));
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/customers/3"))
            .and(body_json(serde_json::json!({"age": 31})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let patch = CustomerUpdate {
            age: Some(31),
            ..CustomerUpdate::default()
        };
        repo.update(CustomerId::new(3), &patch).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/customers/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "path": "/api/v1/customers/9",
                "message": "customer with id [9] not found",
                "statusCode": 404
            })))
            .mount(&server)
            .await;

        let err = repo.delete(CustomerId::new(9)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.detail(), "customer with id [9] not found");
        assert!(repo.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_upload_is_multipart_file_field() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/customers/3/profile-image"))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let picture = ProfilePicture::new("me.png", vec![0x89, b'P', b'N', b'G']);
        assert_eq!(picture.content_type(), Some("image/png"));
        repo.upload_profile_picture(CustomerId::new(3), &picture)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains(r#"name="file""#));
        assert!(body.contains(r#"filename="me.png""#));
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_locally() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = repo
            .upload_profile_picture(CustomerId::new(3), &ProfilePicture::new("me.png", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_forbidden_tears_down_session() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = repo.list().await.unwrap_err();
        assert!(err.is_auth());
        assert!(!repo.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_no_request_without_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let endpoints = ApiEndpoints::new(Url::parse(&server.uri()).unwrap()).unwrap();
        let session = SessionStore::new(reqwest::Client::new(), endpoints);
        session.restore(SecretString::from(jwt(1_000))).unwrap();
        let repo = CustomerRepository::new(session);

        assert!(repo.list().await.unwrap_err().is_auth());
        assert_eq!(repo.session().generation(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_network_error() {
        let server = MockServer::start().await;
        let (repo, _) = signed_in(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert_eq!(repo.list().await.unwrap_err().kind(), ErrorKind::Network);
    }

    #[test]
    fn test_profile_picture_url_is_pure() {
        let endpoints = ApiEndpoints::new(Url::parse("http://localhost:8080/").unwrap()).unwrap();
        let repo = CustomerRepository::new(SessionStore::new(reqwest::Client::new(), endpoints));
        assert_eq!(
            repo.profile_picture_url(CustomerId::new(5)).as_str(),
            "http://localhost:8080/api/v1/customers/5/profile-image"
        );
    }

    #[test]
    fn test_guess_image_type() {
        assert_eq!(guess_image_type("a.JPG"), Some("image/jpeg"));
        assert_eq!(guess_image_type("a.txt"), None);
        assert_eq!(guess_image_type("noext"), None);
    }
}
