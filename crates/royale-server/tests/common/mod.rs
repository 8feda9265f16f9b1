use std::net::SocketAddr;
use std::time::Duration;

use royale_arena::config::ArenaConfig;
use royale_server::build_app;
use royale_server::config::{AuthFileConfig, MatchLoopConfig, ServerConfig, SimWorldConfig};

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

/// Fast, deterministic settings: regions load instantly, readiness is
/// polled often, and the lobby stays open until an admin starts rounds.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        match_loop: MatchLoopConfig {
            seed: Some(42),
            ..MatchLoopConfig::default()
        },
        world: SimWorldConfig {
            region_load_secs: 0.0,
            ..SimWorldConfig::default()
        },
        arena: ArenaConfig {
            min_tick_rate: 0.0,
            readiness_poll_secs: 0.1,
            auto_start_delay_secs: 600.0,
            ..ArenaConfig::default()
        },
        ..ServerConfig::default()
    }
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(test_config()).await
    }

    /// Start a test server that accepts `token` for admin commands.
    pub async fn with_admin_token(token: &str) -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig {
                admin_token: Some(token.to_string()),
                admins: Vec::new(),
            },
            ..test_config()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config).unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn status(&self) -> serde_json::Value {
        reqwest::get(format!("{}/api/v1/status", self.base_url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Poll the status endpoint until `check` holds (3s timeout).
    pub async fn wait_for_status(&self, check: impl Fn(&serde_json::Value) -> bool) -> serde_json::Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            let status = self.status().await;
            if check(&status) {
                return status;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("Timed out waiting for status, last: {status}");
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    pub async fn wait_for_lobby(&self) {
        self.wait_for_status(|s| s["phase"] == "lobby").await;
    }

    /// POST a chat line, optionally with a bearer token.
    pub async fn chat(&self, sender: &str, text: &str, token: Option<&str>) -> reqwest::Response {
        let client = reqwest::Client::new();
        let mut req = client
            .post(format!("{}/api/v1/chat", self.base_url()))
            .json(&serde_json::json!({ "sender": sender, "text": text }));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }
}
