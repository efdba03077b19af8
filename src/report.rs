//! Failure Reporter
//!
//! Turns low-level failures into the two outcomes a test runner renders: a
//! recoverable step failure or a run-aborting failure. Both carry a readable
//! message and, when the browser can still produce one, a screenshot link.

use std::path::{Path, PathBuf};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Screenshot settings the reporter needs
#[derive(Debug, Clone)]
pub struct ScreenshotSettings {
    /// Directory below the store root holding every screenshot
    pub directory: PathBuf,
    /// Thumbnail height for inline images; plain links when `None`
    pub show_height: Option<u32>,
    /// Groups screenshots per fixture
    pub fixture_name: String,
}

/// Builds failure outcomes for the current page
pub struct FailureReporter<'a> {
    driver: &'a dyn Driver,
    storage: &'a dyn Storage,
    settings: ScreenshotSettings,
}

impl<'a> FailureReporter<'a> {
    pub fn new(
        driver: &'a dyn Driver,
        storage: &'a dyn Storage,
        settings: ScreenshotSettings,
    ) -> Self {
        Self {
            driver,
            storage,
            settings,
        }
    }

    // =========================================================================
    // Outcomes
    // =========================================================================

    /// Recoverable failure for an elapsed deadline
    pub async fn timeout_failure(&self, timeout: Error) -> Error {
        let message = self.failure_message("timeouts", "timeout", &timeout.to_string()).await;
        Error::step_failed_by(message, timeout)
    }

    /// Run-aborting failure; the browser is assumed unusable
    pub async fn stop_run(&self, cause: Error) -> Error {
        let message = self.failure_message("timeouts", "timeout", &cause.to_string()).await;
        tracing::info!("Stopping run: {}", cause);
        Error::run_aborted(message, Some(cause))
    }

    /// Pass classified failures through, wrap anything else as a step failure
    pub async fn classify(&self, err: Error) -> Error {
        if err.is_classified() {
            return err;
        }
        let message = self.failure_message("exceptions", "exception", &err.chain()).await;
        Error::step_failed_by(message, err)
    }

    // =========================================================================
    // Screenshots
    // =========================================================================

    /// Save a screenshot and return its report link
    pub async fn take_screenshot(&self, base_name: &str) -> Result<String> {
        let path = self.capture(base_name).await?;
        Ok(self.screenshot_link(&path))
    }

    /// Save a screenshot below the screenshot directory
    pub async fn capture(&self, base_name: &str) -> Result<PathBuf> {
        let png = self.driver.screenshot().await?;
        self.storage
            .save(&self.settings.directory.join(base_name), "png", &png)
    }

    /// Report markup pointing at a saved screenshot
    pub fn screenshot_link(&self, path: &Path) -> String {
        let file = path.display().to_string();
        match self.storage.link_for(path) {
            Some(url) => match self.settings.show_height {
                Some(height) => format!(
                    r#"<a href="{url}"><img src="{url}" title="{file}" height="{height}"/></a>"#
                ),
                None => format!(r#"<a href="{url}">{file}</a>"#),
            },
            None => file,
        }
    }

    /// Message with a screenshot of the current page when one can be taken
    ///
    /// Capture failures are logged and never replace the original failure.
    async fn failure_message(&self, folder: &str, file: &str, message: &str) -> String {
        let base_name = format!("{}/{}/{}", folder, self.settings.fixture_name, file);
        match self.capture(&base_name).await {
            Ok(path) => format_failure(message, Some(&self.screenshot_link(&path))),
            Err(e) => {
                tracing::warn!("Unable to take screenshot: {}", e);
                format_failure(message, None)
            }
        }
    }
}

/// Combine a failure message with an optional screenshot link
pub fn format_failure(message: &str, screenshot_link: Option<&str>) -> String {
    match screenshot_link {
        Some(link) => format!(
            "<div><div>{}.</div><div>Page content:{}</div></div>",
            escape_html(message),
            link
        ),
        None => message.to_string(),
    }
}

/// Escape text for inclusion in report markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
