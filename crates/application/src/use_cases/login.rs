//! Login use case.

use std::sync::Arc;

use roster_domain::{ApiRequest, ApiResponse, Identity, IdentityFlags, Role};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::AuthenticatedClient;
use crate::error::{ApiError, LoginError};
use crate::ports::HttpTransport;

const DEFAULT_INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Input for signing in.
#[derive(Debug, Clone)]
pub struct LoginInput {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    user: LoginUser,
}

#[derive(Deserialize)]
struct LoginUser {
    id: i64,
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default = "active_default")]
    is_active: bool,
    #[serde(default)]
    is_manager: bool,
    #[serde(default)]
    access_token: Option<String>,
}

const fn active_default() -> bool {
    true
}

/// Use case for exchanging credentials for a session.
pub struct Login<T> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: HttpTransport + 'static> Login<T> {
    /// Creates a new `Login` use case.
    #[must_use]
    pub const fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    /// Signs in and stores the resulting session.
    ///
    /// The request carries no bearer token, and a 401 from the login
    /// endpoint never starts a refresh.
    ///
    /// # Errors
    /// - `MissingCredentials` if email or password is empty (nothing is sent)
    /// - `InvalidCredentials` if the server rejects them
    /// - `MissingToken` / `InvalidResponse` if the response is unusable
    pub async fn execute(&self, input: LoginInput) -> Result<Identity, LoginError> {
        let email = input.email.trim();
        if email.is_empty() || input.password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let request = ApiRequest::post_json(
            self.client.endpoints().login_url(),
            json!({ "email": email, "password": input.password }),
        );
        let response = match self.client.send_unsigned(request).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized(response)) => {
                return Err(LoginError::InvalidCredentials {
                    message: rejection_message(&response),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let body: LoginBody = response
            .json_body()
            .map_err(|e| LoginError::InvalidResponse(e.to_string()))?;
        let user = body.user;
        let token = user
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(LoginError::MissingToken)?;

        let identity = Identity {
            id: user.id,
            name: user.name,
            email: user.email,
            role: Role::from_manager_flag(user.is_manager),
            flags: IdentityFlags {
                active: user.is_active,
            },
        };
        self.client.store().set_session(identity.clone(), token).await;
        info!(user_id = identity.id, role = ?identity.role, "signed in");
        Ok(identity)
    }
}

/// Extracts the server's reason from `{"error": "..."}` or
/// `{"error": {"commonError": "..."}}`.
fn rejection_message(response: &ApiResponse) -> String {
    let Ok(body) = response.json_body::<Value>() else {
        return DEFAULT_INVALID_CREDENTIALS.to_string();
    };
    let error = &body["error"];
    error
        .as_str()
        .or_else(|| error["commonError"].as_str())
        .unwrap_or(DEFAULT_INVALID_CREDENTIALS)
        .to_string()
}
