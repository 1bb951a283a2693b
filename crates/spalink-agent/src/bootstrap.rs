//! Credential bootstrap: the login check that runs before any polling or
//! command dispatch.

use crate::store::{CredentialStore, Credentials};
use anyhow::{bail, Context, Result};
use spalink_api::ApiClient;

/// Outcome of inspecting the credentials on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Device id and session token are both present; no network needed.
    Ready,
    /// Account credentials present but no usable session; drive a login.
    NeedsLogin,
    /// Neither a session nor account credentials; nothing we can do.
    Unconfigured,
}

/// Classify credentials without touching the network.
#[must_use]
pub fn assess(credentials: &Credentials) -> CredentialState {
    if credentials.has_session() {
        CredentialState::Ready
    } else if credentials.has_account() {
        CredentialState::NeedsLogin
    } else {
        CredentialState::Unconfigured
    }
}

/// Run the login check, refreshing and persisting the session if needed.
///
/// Returns the credentials all subsequent API calls use. With `force` set
/// and account credentials on hand, a fresh login is driven even when a
/// cached session exists.
///
/// # Errors
///
/// Fails on missing credentials and on a rejected login or binding
/// exchange; both are fatal at bootstrap. Retries happen on the next
/// manual invocation, never automatically.
pub async fn run(
    client: &ApiClient,
    store: &CredentialStore,
    credentials: Credentials,
    force: bool,
) -> Result<Credentials> {
    match assess(&credentials) {
        CredentialState::Ready => {
            if force && credentials.has_account() {
                refresh(client, store, credentials).await
            } else {
                tracing::info!("cached session is usable");
                Ok(credentials)
            }
        }
        CredentialState::NeedsLogin => refresh(client, store, credentials).await,
        CredentialState::Unconfigured => {
            bail!("missing credentials: set either device_id and token, or email and password")
        }
    }
}

/// Drive the login and binding lookup, then persist the result.
async fn refresh(
    client: &ApiClient,
    store: &CredentialStore,
    mut credentials: Credentials,
) -> Result<Credentials> {
    tracing::info!("refreshing session via account login");

    let session = client
        .login(&credentials.email, &credentials.password)
        .await
        .context("login failed")?;
    credentials.token = session.token;
    if let Some(uid) = session.uid {
        credentials.uid = uid;
    }

    credentials.device_id = client
        .first_binding(&credentials.token)
        .await
        .context("binding lookup failed")?;

    store
        .save(&credentials)
        .context("cannot persist refreshed credentials")?;

    tracing::info!(device_id = %credentials.device_id, "session refreshed and persisted");
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use spalink_api::ApiClientConfig;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(device_id: &str, token: &str, email: &str, password: &str) -> Credentials {
        Credentials {
            application_id: "app-id".to_string(),
            device_id: device_id.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            token: token.to_string(),
            uid: String::new(),
        }
    }

    #[test]
    fn assess_ready_with_complete_session() {
        let state = assess(&creds("D", "T", "", ""));
        assert_eq!(state, CredentialState::Ready);
    }

    #[test]
    fn assess_needs_login_without_session() {
        assert_eq!(
            assess(&creds("", "", "spa@example.com", "secret")),
            CredentialState::NeedsLogin
        );
        assert_eq!(
            assess(&creds("D", "", "spa@example.com", "secret")),
            CredentialState::NeedsLogin
        );
        assert_eq!(
            assess(&creds("", "T", "spa@example.com", "secret")),
            CredentialState::NeedsLogin
        );
    }

    #[test]
    fn assess_unconfigured_without_either_pair() {
        assert_eq!(assess(&creds("", "", "", "")), CredentialState::Unconfigured);
        assert_eq!(
            assess(&creds("D", "", "", "secret")),
            CredentialState::Unconfigured
        );
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiClientConfig {
            base_url: server.uri(),
            application_id: "app-id".to_string(),
            timeout: Duration::from_secs(3),
        })
        .unwrap()
    }

    fn config_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[spa]
api_url = "https://euapi.gizwits.com/app"
application_id = "app-id"
email = "spa@example.com"
password = "secret"

[mqtt]
host = "tcp://localhost:1883"
client_id = "spalink-1"
root_topic = "layzspa"
command_topic = "layzspa/cmd"
poll_interval_secs = 600
"#,
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn ready_session_makes_no_network_calls() {
        let server = MockServer::start().await;
        let file = config_file();
        let store = CredentialStore::new(file.path());

        let result = run(&client_for(&server), &store, creds("D", "T", "", ""), false)
            .await
            .unwrap();

        assert_eq!(result.device_id, "D");
        assert_eq!(result.token, "T");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_fails_without_network_calls() {
        let server = MockServer::start().await;
        let file = config_file();
        let store = CredentialStore::new(file.path());

        let err = run(&client_for(&server), &store, creds("", "", "", ""), false)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("missing credentials"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_and_binding_round_trip_is_persisted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "token": "T",
                    "uid": "U"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bindings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "devices": [{"did": "D"}]
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let file = config_file();
        let store = CredentialStore::new(file.path());

        let result = run(
            &client_for(&server),
            &store,
            creds("", "", "spa@example.com", "secret"),
            false,
        )
        .await
        .unwrap();

        assert_eq!(result.token, "T");
        assert_eq!(result.device_id, "D");
        assert_eq!(result.uid, "U");

        // The store now holds the refreshed session and the unrelated
        // keys are unchanged.
        let reloaded = AgentConfig::load(file.path()).unwrap();
        assert_eq!(reloaded.spa.token, "T");
        assert_eq!(reloaded.spa.device_id, "D");
        assert_eq!(reloaded.spa.email, "spa@example.com");
        assert_eq!(reloaded.mqtt.root_topic, "layzspa");
    }

    #[tokio::test]
    async fn rejected_login_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let file = config_file();
        let store = CredentialStore::new(file.path());

        let err = run(
            &client_for(&server),
            &store,
            creds("", "", "spa@example.com", "bad"),
            false,
        )
        .await
        .unwrap_err();

        assert!(format!("{err:#}").contains("login failed"));
    }

    #[tokio::test]
    async fn force_refreshes_a_cached_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"token": "T2", "uid": "U"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bindings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"devices": [{"did": "D2"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let file = config_file();
        let store = CredentialStore::new(file.path());

        let result = run(
            &client_for(&server),
            &store,
            creds("D", "T", "spa@example.com", "secret"),
            true,
        )
        .await
        .unwrap();

        assert_eq!(result.token, "T2");
        assert_eq!(result.device_id, "D2");
    }
}
