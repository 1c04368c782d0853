use crate::error::{Error, Result};
use crate::messages::{AuthResult, StagePair, StageResult, StageUpdate};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://my.tenko.ua/api/v1";

const AUTH_ENDPOINT: &str = "auth";
const STAGES_ENDPOINT: &str = "stages";

/// Per request, connect to last byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

// Bodies quoted in decode errors are cut to this many chars.
const MAX_QUOTED_BODY: usize = 200;

/// The two calls a run makes against the boiler controller.
#[async_trait]
pub trait StageApi: Send + Sync {
    async fn authenticate(&self, login: &str, password: &str) -> Result<AuthResult>;
    async fn set_stages(&self, token: &str, stages: StagePair) -> Result<StageResult>;
}

#[derive(Clone)]
pub struct TenkoClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TenkoClient {
    pub fn new(base_url: &str) -> TenkoClient {
        TenkoClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> TenkoClient {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}

impl Default for TenkoClient {
    fn default() -> Self {
        TenkoClient::new(DEFAULT_API_URL)
    }
}

async fn receive_json<T: DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Result<reqwest::Response>,
) -> Result<T> {
    let transport = |source| Error::Transport { endpoint, source };
    let body = response
        .and_then(|r| r.error_for_status())
        .map_err(transport)?
        .text()
        .await
        .map_err(transport)?;
    // The auth reply carries the bearer token.
    if endpoint == AUTH_ENDPOINT {
        debug!(endpoint, len = body.len(), "Response");
    } else {
        debug!(endpoint, body = %body, "Response");
    }
    serde_json::from_str(&body).map_err(|source| Error::Decode {
        endpoint,
        body: body.chars().take(MAX_QUOTED_BODY).collect(),
        source,
    })
}

#[async_trait]
impl StageApi for TenkoClient {
    async fn authenticate(&self, login: &str, password: &str) -> Result<AuthResult> {
        let response = self
            .http
            .post(self.url(AUTH_ENDPOINT))
            .timeout(self.timeout)
            .form(&[("login", login), ("password", password)])
            .send()
            .await;
        receive_json(AUTH_ENDPOINT, response).await
    }

    async fn set_stages(&self, token: &str, stages: StagePair) -> Result<StageResult> {
        let response = self
            .http
            .post(self.url(STAGES_ENDPOINT))
            .timeout(self.timeout)
            .bearer_auth(token)
            .json(&StageUpdate { stages })
            .send()
            .await;
        receive_json(STAGES_ENDPOINT, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct Recorded {
        auth_forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
        stage_calls: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn auth(
        State(rec): State<Recorded>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<Value> {
        let ok = form.get("password").map(String::as_str) == Some("secret");
        rec.auth_forms.lock().unwrap().push(form);
        if ok {
            Json(json!({"status": "ok", "token": "tkn-42"}))
        } else {
            Json(json!({"status": "error"}))
        }
    }

    async fn stages(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        rec.stage_calls.lock().unwrap().push((authorization, body));
        Json(json!({"message": "Stages updated"}))
    }

    async fn spawn(app: Router) -> anyhow::Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(format!("http://{}/api/v1", addr))
    }

    async fn mock_api() -> anyhow::Result<(Recorded, TenkoClient)> {
        let rec = Recorded::default();
        let app = Router::new()
            .route("/api/v1/auth", post(auth))
            .route("/api/v1/stages", post(stages))
            .with_state(rec.clone());
        let url = spawn(app).await?;
        Ok((rec, TenkoClient::new(&url)))
    }

    #[tokio::test]
    async fn authenticate_posts_form() -> anyhow::Result<()> {
        let (rec, client) = mock_api().await?;
        let auth = client.authenticate("boiler@example.com", "secret").await?;
        assert!(auth.is_ok());
        assert_eq!(auth.token, "tkn-42");

        let forms = rec.auth_forms.lock().unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["login"], "boiler@example.com");
        assert_eq!(forms[0]["password"], "secret");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_is_not_an_error() -> anyhow::Result<()> {
        let (_rec, client) = mock_api().await?;
        let auth = client.authenticate("boiler@example.com", "wrong").await?;
        assert!(!auth.is_ok());
        assert_eq!(auth.status, "error");
        Ok(())
    }

    #[tokio::test]
    async fn set_stages_sends_bearer_and_body() -> anyhow::Result<()> {
        let (rec, client) = mock_api().await?;
        let result = client.set_stages("tkn-42", StagePair::stage_2_on()).await?;
        assert_eq!(result.message, "Stages updated");

        let calls = rec.stage_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("Bearer tkn-42"));
        assert_eq!(calls[0].1, json!({"STG": {"stage_1": "Off", "stage_2": "On"}}));
        Ok(())
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url() -> anyhow::Result<()> {
        let (rec, client) = mock_api().await?;
        let client = TenkoClient::new(&format!("{}/", client.base_url()));
        client.authenticate("boiler@example.com", "secret").await?;
        assert_eq!(rec.auth_forms.lock().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() -> anyhow::Result<()> {
        let app = Router::new().route("/api/v1/auth", post(|| async { "<html>maintenance</html>" }));
        let client = TenkoClient::new(&spawn(app).await?);
        let err = client.authenticate("a", "b").await.unwrap_err();
        assert!(matches!(err, Error::Decode { ref body, .. } if body.contains("maintenance")));
        assert_eq!(err.endpoint(), "auth");
        Ok(())
    }

    #[tokio::test]
    async fn server_error_is_transport_error() -> anyhow::Result<()> {
        let app = Router::new().route(
            "/api/v1/stages",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = TenkoClient::new(&spawn(app).await?);
        let err = client.set_stages("t", StagePair::stage_1_on()).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(err.endpoint(), "stages");
        Ok(())
    }

    #[tokio::test]
    async fn missing_reply_fields_are_not_errors() -> anyhow::Result<()> {
        let app = Router::new()
            .route("/api/v1/auth", post(|| async { Json(json!({})) }))
            .route("/api/v1/stages", post(|| async { Json(json!({"status": "ok"})) }));
        let client = TenkoClient::new(&spawn(app).await?);

        let auth = client.authenticate("a", "b").await?;
        assert!(!auth.is_ok());
        assert_eq!(auth.status, "");

        let result = client.set_stages("t", StagePair::stage_1_on()).await?;
        assert_eq!(result.message, "");
        Ok(())
    }

    #[tokio::test]
    async fn silent_server_times_out() -> anyhow::Result<()> {
        // Accepts connections and holds them open without ever answering.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = TenkoClient::new(&format!("http://{}/api/v1", addr))
            .with_timeout(std::time::Duration::from_millis(300));
        let started = Instant::now();
        let err = tokio::time::timeout(std::time::Duration::from_secs(10), client.authenticate("a", "b"))
            .await?
            .unwrap_err();
        assert!(matches!(err, Error::Transport { ref source, .. } if source.is_timeout()), "{err}");
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn default_timeout() {
        assert_eq!(TenkoClient::default().timeout, DEFAULT_TIMEOUT);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn token_stays_out_of_debug_log() -> anyhow::Result<()> {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (_rec, client) = mock_api().await?;
        let auth = client.authenticate("boiler@example.com", "secret").await?;
        client.set_stages(&auth.token, StagePair::stage_1_on()).await?;

        let logs = String::from_utf8(captured.0.lock().unwrap().clone())?;
        assert!(logs.contains("endpoint=\"auth\"") || logs.contains("endpoint=auth"), "{logs}");
        assert!(logs.contains("Stages updated"), "{logs}");
        assert!(!logs.contains("tkn-42"), "{logs}");
        Ok(())
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        let client = TenkoClient::new(&format!("http://{}/api/v1", addr));
        let err = client.authenticate("a", "b").await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        Ok(())
    }
}
