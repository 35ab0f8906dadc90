//! Shared fixtures: a mock release feed and a scripted Launch Monitor.

use launcher_update::{AvailableUpdate, Error, LaunchMonitor, UpdaterConfig};
use mockito::{Mock, Server, ServerGuard};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

/// Repository used by every test feed.
pub const REPO: &str = "aarubikarubi/DailyGameLauncher";

/// Mock release feed plus asset host.
pub struct FeedServer {
    server: ServerGuard,
}

impl FeedServer {
    /// Start a mock server.
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    /// Updater configuration pointed at this server, staging into `staging`.
    pub fn config(&self, staging: &Path) -> UpdaterConfig {
        let mut config = UpdaterConfig::default();
        config.feed.api_base = self.server.url();
        config.feed.asset_suffix = ".exe".to_string();
        config.download.staging_dir = staging.to_path_buf();
        config.download.staged_file_name = "DailyGameLauncher_update.exe".to_string();
        config.handoff.ready_timeout_secs = 5;
        config.handoff.exit_wait_secs = 1;
        config
    }

    /// Download URL for an asset name.
    pub fn asset_url(&self, name: &str) -> String {
        format!("{}/download/{name}", self.server.url())
    }

    /// Serve a latest-release response with the given tag and asset names.
    pub async fn release(&mut self, tag: &str, assets: &[&str], hits: usize) -> Mock {
        let body = serde_json::json!({
            "tag_name": tag,
            "name": format!("Release {tag}"),
            "assets": assets
                .iter()
                .map(|name| serde_json::json!({
                    "name": name,
                    "browser_download_url": self.asset_url(name),
                }))
                .collect::<Vec<_>>(),
        });
        self.raw_release(200, &body.to_string(), hits).await
    }

    /// Serve an arbitrary latest-release response.
    pub async fn raw_release(&mut self, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", format!("/repos/{REPO}/releases/latest").as_str())
            .match_header("user-agent", "DailyGameLauncher-Updater")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Serve a release whose only asset lives at `download_url`.
    pub async fn release_at(&mut self, tag: &str, download_url: &str, hits: usize) -> Mock {
        let body = serde_json::json!({
            "tag_name": tag,
            "assets": [{ "name": "App.exe", "browser_download_url": download_url }],
        });
        self.raw_release(200, &body.to_string(), hits).await
    }

    /// Serve an asset body.
    pub async fn asset(&mut self, name: &str, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", format!("/download/{name}").as_str())
            .with_status(200)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}

/// Accepts connections and never answers them.
pub struct StalledHost {
    url: String,
    task: tokio::task::JoinHandle<()>,
}

impl StalledHost {
    /// Bind to a local port.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/download/App.exe", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Self { url, task }
    }

    /// Asset URL that never responds.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for StalledHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Launch Monitor with scripted answers.
pub struct TestMonitor {
    accept: bool,
    safe_to_exit: bool,
    gate: Mutex<Option<mpsc::Receiver<bool>>>,
    offers: AtomicUsize,
    errors: Mutex<Vec<String>>,
}

impl TestMonitor {
    /// Always answer `accept`.
    pub fn answering(accept: bool) -> Self {
        Self {
            accept,
            safe_to_exit: true,
            gate: Mutex::new(None),
            offers: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Block each offer until an answer is sent on the returned channel.
    pub fn gated() -> (Self, mpsc::Sender<bool>) {
        let (tx, rx) = mpsc::channel();
        let monitor = Self {
            gate: Mutex::new(Some(rx)),
            ..Self::answering(false)
        };
        (monitor, tx)
    }

    /// Never allow exiting.
    pub fn never_safe(mut self) -> Self {
        self.safe_to_exit = false;
        self
    }

    /// Number of consent prompts shown.
    pub fn offers(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }

    /// Errors shown to the user.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl LaunchMonitor for TestMonitor {
    fn offer_update(&self, _update: &AvailableUpdate) -> bool {
        self.offers.fetch_add(1, Ordering::SeqCst);
        if let Some(rx) = self.gate.lock().as_ref() {
            return rx.recv().unwrap_or(false);
        }
        self.accept
    }

    fn safe_to_exit(&self) -> bool {
        self.safe_to_exit
    }

    fn report_error(&self, error: &Error) {
        self.errors.lock().push(error.to_string());
    }
}
