//! Logout use case.

use std::sync::Arc;

use roster_domain::ApiRequest;
use tracing::{debug, info, warn};

use crate::auth::AuthenticatedClient;
use crate::ports::HttpTransport;

/// Use case for signing out on request of the user.
pub struct Logout<T> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: HttpTransport + 'static> Logout<T> {
    /// Creates a new `Logout` use case.
    #[must_use]
    pub const fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    /// Tells the server, clears the session and returns to the login route.
    ///
    /// The server call is best-effort; the local session is cleared whatever
    /// it answers. No notice is shown, not even for a 401 or 403.
    pub async fn execute(&self) {
        let request =
            ApiRequest::post_json(self.client.endpoints().logout_url(), serde_json::json!({}));
        match self.client.send_once(request).await {
            Ok(response) if response.is_success() => {
                debug!(status = response.status, "server logout completed");
            }
            Ok(response) => warn!(status = response.status, "server logout rejected"),
            Err(e) => warn!(error = %e, "server logout failed"),
        }

        self.client.store().clear().await;
        self.client.navigate_to_login();
        info!("signed out");
    }
}
