// Account endpoints
//
// Token login, user registration and password change. Login installs the
// returned access token on the client; every later request carries it as
// a bearer header.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{ApiClient, check_status, parse_json};
use crate::error::Error;
use crate::models::{Envelope, FieldErrors, LoginData};

const LOGIN_PATH: &str = "accounts/auth/login/";
const REGISTER_PATH: &str = "accounts/auth/register/";
const CHANGE_PASSWORD_PATH: &str = "accounts/auth/change-password/";

impl ApiClient {
    /// Authenticate with email + password.
    ///
    /// `POST accounts/auth/login/`. On success the access token is stored on
    /// the client and the `data` payload is returned so callers can build a
    /// session record. Rejected credentials surface as
    /// [`Error::Authentication`] regardless of whether the backend answered
    /// 400 or 401.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginData, Error> {
        let url = self.url(LOGIN_PATH)?;
        debug!(email, "logging in at {}", url);

        let body = json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: login_failure_message(&body),
            });
        }
        if status == StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: "account not verified or without permissions".into(),
            });
        }

        let resp = check_status(resp).await?;
        let envelope: Envelope<LoginData> = parse_json(resp).await?;
        self.set_token(Some(SecretString::from(envelope.data.access_token.clone())));

        debug!(role = %envelope.data.user.role, "login successful");
        Ok(envelope.data)
    }

    /// Register a new user account.
    ///
    /// `POST accounts/auth/register/` with the registration form payload.
    /// Returns the created user as echoed by the server.
    pub async fn register(&self, payload: &Value) -> Result<Value, Error> {
        debug!("registering user");
        let envelope: Envelope<Value> = self
            .send_json(Method::POST, REGISTER_PATH, payload)
            .await?;
        Ok(envelope.data)
    }

    /// Change the current user's password.
    ///
    /// `POST accounts/auth/change-password/` with `{"new_password": "..."}`.
    pub async fn change_password(&self, new_password: &SecretString) -> Result<(), Error> {
        debug!("changing password");
        let _: Value = self
            .send_json(
                Method::POST,
                CHANGE_PASSWORD_PATH,
                &json!({ "new_password": new_password.expose_secret() }),
            )
            .await?;
        Ok(())
    }
}

/// Pick the most specific message out of a rejected login body.
fn login_failure_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return "invalid credentials".into();
    };
    FieldErrors::from_body(&value)
        .map(|errors| errors.to_string())
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| "invalid credentials".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failure_prefers_server_detail() {
        assert_eq!(
            login_failure_message(r#"{"detail":"Invalid credentials, try again"}"#),
            "Invalid credentials, try again"
        );
    }

    #[test]
    fn login_failure_falls_back_on_garbage() {
        assert_eq!(login_failure_message("<html>"), "invalid credentials");
        assert_eq!(login_failure_message("{}"), "invalid credentials");
    }
}
