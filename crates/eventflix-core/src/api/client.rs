//! API client for communicating with the EventFlix REST API.
//!
//! Every request goes through `send`, which attaches the session token,
//! retries rate-limited requests and expires the session on a 401.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::models::{
    Event, EventForm, LoginRequest, LoginResponse, Profile, ProfileUpdate, RegisterRequest,
    Ticket, TicketPurchase,
};
use crate::session::SessionManager;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Whether a request carries the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// Never send the token (login, registration)
    None,
    /// Send it if there is one (public listings)
    Optional,
    /// Fail with `NotLoggedIn` if there is none
    Required,
}

/// API client for EventFlix.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionManager>,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionManager>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    // ===== Authentication =====

    /// Log in and store the returned token and role in the session
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = match self.send(Method::POST, "/auth/login", Some(&body), Auth::None).await {
            Ok(response) => response,
            Err(e) => {
                let rejected = matches!(
                    e.downcast_ref::<ApiError>(),
                    Some(ApiError::Unauthorized | ApiError::AccessDenied(_))
                );
                return Err(if rejected { ApiError::InvalidCredentials.into() } else { e });
            }
        };

        let login: LoginResponse = Self::parse_json(response, "/auth/login").await?;

        let token = login
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("Login response had no token".to_string()))?;

        self.session.save_token(token);
        if let Some(ref role) = login.role {
            self.session.save_user_role(role);
        }
        info!(role = ?login.role, "Login successful");
        Ok(login)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let response = self
            .send(Method::POST, "/auth/register", Some(request), Auth::None)
            .await?;
        Self::discard_body(response).await;
        info!("Registration accepted");
        Ok(())
    }

    /// End the session locally. The clear is committed before returning.
    pub async fn logout(&self) {
        self.session.clear_session_sync().await;
        info!("Logged out");
    }

    // ===== Events =====

    pub async fn fetch_events(&self) -> Result<Vec<Event>> {
        self.get_json("/events", Auth::Optional).await
    }

    pub async fn fetch_event(&self, event_id: i64) -> Result<Event> {
        self.get_json(&format!("/events/{}", event_id), Auth::Optional).await
    }

    pub async fn create_event(&self, form: &EventForm) -> Result<Event> {
        self.require_organizer()?;
        self.send_json(Method::POST, "/events", form).await
    }

    pub async fn update_event(&self, event_id: i64, form: &EventForm) -> Result<Event> {
        self.require_organizer()?;
        self.send_json(Method::PUT, &format!("/events/{}", event_id), form).await
    }

    // ===== Tickets =====

    pub async fn purchase_tickets(&self, event_id: i64, quantity: u32) -> Result<Ticket> {
        let body = TicketPurchase { event_id, quantity };
        let ticket: Ticket = self.send_json(Method::POST, "/tickets", &body).await?;
        info!(event_id, quantity, ticket_id = ticket.id, "Tickets purchased");
        Ok(ticket)
    }

    pub async fn fetch_my_tickets(&self) -> Result<Vec<Ticket>> {
        self.get_json("/tickets/me", Auth::Required).await
    }

    // ===== Profile =====

    pub async fn fetch_profile(&self) -> Result<Profile> {
        self.get_json("/users/me", Auth::Required).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        self.send_json(Method::PUT, "/users/me", update).await
    }

    /// Delete the account, then reset the local session
    pub async fn delete_account(&self) -> Result<()> {
        let response = self
            .send::<()>(Method::DELETE, "/users/me", None, Auth::Required)
            .await?;
        Self::discard_body(response).await;
        self.session.clear_session_sync().await;
        info!("Account deleted");
        Ok(())
    }

    // ===== Request plumbing =====

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn require_organizer(&self) -> Result<()> {
        if !self.session.is_logged_in() {
            return Err(ApiError::NotLoggedIn.into());
        }
        if !self.session.is_organizer() {
            return Err(ApiError::AccessDenied("organizer role required".to_string()).into());
        }
        Ok(())
    }

    /// Headers for the request, and whether they carry a token
    fn auth_headers(&self, auth: Auth) -> Result<(header::HeaderMap, bool)> {
        let mut headers = header::HeaderMap::new();
        if auth == Auth::None {
            return Ok((headers, false));
        }

        let token = self.session.get_token().filter(|t| !t.trim().is_empty());
        match (token, auth) {
            (Some(token), _) => {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", token))?,
                );
                Ok((headers, true))
            }
            (None, Auth::Required) => Err(ApiError::NotLoggedIn.into()),
            (None, _) => Ok((headers, false)),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, auth: Auth) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None, auth).await?;
        Self::parse_json(response, path).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(method, path, Some(body), Auth::Required).await?;
        Self::parse_json(response, path).await
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
        match response.json().await {
            Ok(value) => Ok(value),
            Err(e) if e.is_decode() => Err(ApiError::InvalidResponse(format!(
                "Unexpected response from {}: {}",
                path, e
            ))
            .into()),
            Err(e) => Err(ApiError::NetworkError(e).into()),
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> Result<Response> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let (headers, sent_token) = self.auth_headers(auth)?;
            let mut request = self.client.request(method.clone(), &url).headers(headers);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(%method, url = %url, error = %e, "Request failed");
                    return Err(ApiError::NetworkError(e).into());
                }
            };
            debug!(%method, url = %url, status = %response.status(), "Response received");

            match self.check_response_for_retry(response, sent_token).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(
                        url = %url,
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2; // Exponential backoff
                }
            }
        }
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors. A 401 on a request that carried the token
    /// ends the session.
    async fn check_response_for_retry(&self, response: Response, sent_token: bool) -> Result<Option<Response>> {
        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(None);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);
        if matches!(error, ApiError::Unauthorized) && sent_token {
            warn!("Token rejected, clearing session");
            self.session.clear_session_sync().await;
        }
        Err(error.into())
    }

    async fn discard_body(response: Response) {
        if let Err(e) = response.bytes().await {
            debug!(error = %e, "Failed to read response body");
        }
    }
}
