//! Opening decoded URLs in the system browser.
use async_trait::async_trait;

use crate::errors::{QrLensError, QrLensResult};
use crate::executor::safety::is_openable;

#[async_trait]
pub trait UrlLauncher: Send + Sync {
    async fn open(&self, url: &str) -> QrLensResult<()>;
}

/// Hands URLs to the platform opener (`xdg-open`, `open`, `url.dll`).
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

/// Program and argument vector that open `url` on `os`. The URL is always a
/// single argument and never passes through a shell, so `&`, `|` and `^`
/// in query strings reach the browser untouched.
pub(crate) fn opener_for(os: &str, url: &str) -> (&'static str, Vec<String>) {
    match os {
        "windows" => (
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        ),
        "macos" => ("open", vec![url.to_string()]),
        _ => ("xdg-open", vec![url.to_string()]),
    }
}

impl SystemLauncher {
    fn command(url: &str) -> tokio::process::Command {
        let (program, args) = opener_for(std::env::consts::OS, url);
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        cmd
    }
}

#[async_trait]
impl UrlLauncher for SystemLauncher {
    async fn open(&self, url: &str) -> QrLensResult<()> {
        if !is_openable(url) {
            return Err(QrLensError::Launch(format!("refusing to open '{url}'")));
        }
        tracing::info!(url = %url, "opening URL");
        Self::command(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| QrLensError::Launch(format!("spawn opener: {e}")))?;
        Ok(())
    }
}
