use anyhow::{Context, Result, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

use crate::config::SessionConfig;
use crate::utils::constants::CHROME_USER_AGENT;

/// A launched browser plus the task driving its CDP connection
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub handler: JoinHandle<()>,
    pub user_data_dir: PathBuf,
    /// Session-owned profile, removed when dropped
    pub temp_profile: Option<TempDir>,
}

/// Find Chrome/Chromium executable on the system with platform-specific search paths.
pub async fn find_browser_executable() -> Result<PathBuf> {
    // Environment variable overrides all other methods
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(
                "Using browser from CHROMIUM_PATH environment variable: {}",
                path.display()
            );
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH environment variable points to non-existent file: {}",
            path.display()
        );
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if cfg!(target_os = "windows") {
        for root in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(dir) = std::env::var(root) {
                candidates.push(PathBuf::from(&dir).join(r"Google\Chrome\Application\chrome.exe"));
                candidates.push(PathBuf::from(&dir).join(r"Chromium\Application\chrome.exe"));
            }
        }
    } else if cfg!(target_os = "macos") {
        for app in [
            "Google Chrome.app/Contents/MacOS/Google Chrome",
            "Chromium.app/Contents/MacOS/Chromium",
        ] {
            candidates.push(Path::new("/Applications").join(app));
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join("Applications").join(app));
            }
        }
        candidates.push(PathBuf::from("/opt/homebrew/bin/chromium"));
    } else {
        for path in [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ] {
            candidates.push(PathBuf::from(path));
        }
    }

    if let Some(path) = candidates.into_iter().find(|p| p.exists()) {
        info!("Found browser at: {}", path.display());
        return Ok(path);
    }

    // Use 'which' command to find Chromium on Unix systems
    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("Found browser using 'which' command: {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    warn!("No Chrome/Chromium executable found. Will download and use fetcher.");
    Err(anyhow!("Chrome/Chromium executable not found"))
}

/// Downloads a managed Chromium into the user cache directory.
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("Downloading managed Chromium browser...");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("feed_digest")
        .join("chromium");

    tokio::fs::create_dir_all(&cache_dir)
        .await
        .context("Failed to create cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );

    let revision_info = fetcher.fetch().await.context("Failed to fetch browser")?;

    info!(
        "Downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );

    Ok(revision_info.executable_path)
}

/// Resolve the executable for a session: the configured path if any,
/// otherwise a system browser, otherwise a downloaded one.
async fn resolve_executable(config: &SessionConfig) -> Result<PathBuf> {
    match config.browser_path() {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(anyhow!(
            "Browser executable not found at {}",
            path.display()
        )),
        None => match find_browser_executable().await {
            Ok(path) => Ok(path),
            Err(_) => download_managed_browser().await,
        },
    }
}

/// Build the launch arguments shared by every session browser
pub(crate) fn launch_args(config: &SessionConfig) -> Vec<String> {
    let mut args = vec![
        format!("--user-agent={CHROME_USER_AGENT}"),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-notifications".to_string(),
        "--disable-extensions".to_string(),
        "--disable-popup-blocking".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-breakpad".to_string(),
        "--disable-features=TranslateUI".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--password-store=basic".to_string(),
        "--use-mock-keychain".to_string(),
        "--hide-scrollbars".to_string(),
        "--mute-audio".to_string(),
    ];

    if let Some(proxy) = config.proxy_url() {
        args.push(format!("--proxy-server={proxy}"));
    }

    args
}

/// Launch one isolated browser for a scrape session.
///
/// # Profile Isolation
/// Each session gets its own user data directory (the configured one, or a
/// fresh temp directory) so concurrent sessions never contend for a profile
/// lock and auth cookies never leak between requests.
pub async fn launch_session_browser(config: &SessionConfig) -> Result<LaunchedBrowser> {
    let chrome_path = resolve_executable(config).await?;

    // The guard exists from creation on, so a launch cancelled mid-way still
    // removes the directory.
    let (user_data_dir, temp_profile) = session_profile(config).await?;

    let viewport = config.viewport();
    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(viewport.width, viewport.height)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);

    if config.headless() {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    for arg in launch_args(config) {
        config_builder = config_builder.arg(arg);
    }

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

    info!(target_url = config.target_url(), "Launching session browser");
    let (browser, mut handler) = match Browser::launch(browser_config).await {
        Ok(launched) => launched,
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to launch browser")),
    };

    let handler_task = task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let error_msg = e.to_string();

                // chromiumoxide cannot decode some newer CDP events; those are noise
                let is_benign_serialization_error = error_msg
                    .contains("data did not match any variant of untagged enum Message")
                    || error_msg.contains("Failed to deserialize WS response");

                if is_benign_serialization_error {
                    trace!("Suppressed benign CDP serialization error: {}", error_msg);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        info!("Browser handler task completed");
    });

    Ok(LaunchedBrowser {
        browser,
        handler: handler_task,
        user_data_dir,
        temp_profile,
    })
}

/// Profile directory for one session: the configured one, or a fresh
/// `feed_digest_chrome_*` temp directory owned by the returned guard.
pub async fn session_profile(config: &SessionConfig) -> Result<(PathBuf, Option<TempDir>)> {
    match config.chrome_data_dir() {
        Some(dir) => {
            tokio::fs::create_dir_all(dir)
                .await
                .context("Failed to create user data directory")?;
            Ok((dir.clone(), None))
        }
        None => {
            let profile = tempfile::Builder::new()
                .prefix(&format!("feed_digest_chrome_{}_", std::process::id()))
                .tempdir()
                .context("Failed to create user data directory")?;
            Ok((profile.path().to_path_buf(), Some(profile)))
        }
    }
}
