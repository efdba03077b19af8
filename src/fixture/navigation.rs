//! Page-level operations: navigation, tabs, alerts, keyboard, window and settings

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;

use super::BrowserFixture;
use crate::driver::WindowSize;
use crate::error::{Error, Result};
use crate::keys;
use crate::locator::Locator;
use crate::value::cleanup_value;

/// Firefox may refuse an immediate back when the previous page was a POST
const BACK_SETTLE: Duration = Duration::from_millis(500);

impl BrowserFixture {
    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate to `address` and wait for the document to load
    ///
    /// Relative addresses are joined to the configured base URL. A page that
    /// does not load in time aborts the run.
    pub async fn open(&self, address: &str) -> Result<bool> {
        self.guarded(async {
            let url = self.url_for(address)?;
            tracing::info!("Opening {}", url);
            match self.driver.navigate(&url).await {
                Ok(()) => {}
                Err(e) if e.is_timeout() => return Err(self.reporter().stop_run(e).await),
                Err(e) => return Err(e),
            }
            self.wait_for_ready_state().await?;
            self.active_adapters().await?;
            Ok(true)
        })
        .await
    }

    async fn wait_for_ready_state(&self) -> Result<()> {
        self.wait_until(|| async {
            let state = self
                .driver
                .execute_script("return document.readyState;", Vec::new())
                .await?;
            Ok(match state.as_str() {
                Some("complete") | Some("loaded") => Some(()),
                Some(_) => None,
                None => {
                    tracing::warn!("Unexpected document.readyState: {}", state);
                    Some(())
                }
            })
        })
        .await
    }

    pub async fn back(&self) -> Result<bool> {
        self.guarded(async {
            self.driver.back().await?;
            tokio::time::sleep(BACK_SETTLE).await;
            let try_again = self
                .driver
                .find_element(&Locator::Id("errorTryAgain".into()), None)
                .await?;
            if let Some(button) = try_again {
                tracing::info!("Resubmitting after back");
                self.driver.click(&button).await?;
                self.driver.accept_alert().await?;
            }
            Ok(true)
        })
        .await
    }

    pub async fn forward(&self) -> Result<bool> {
        self.guarded(async {
            self.driver.forward().await?;
            Ok(true)
        })
        .await
    }

    pub async fn refresh(&self) -> Result<bool> {
        self.guarded(async {
            self.driver.refresh().await?;
            Ok(true)
        })
        .await
    }

    pub async fn page_title(&self) -> Result<String> {
        self.guarded(self.driver.title()).await
    }

    /// MIME type of the current document
    pub async fn page_content_type(&self) -> Result<Option<String>> {
        self.guarded(async {
            let content_type = self
                .driver
                .execute_script("return document.contentType;", Vec::new())
                .await?;
            Ok(content_type.as_str().map(str::to_string))
        })
        .await
    }

    /// Wait until the page title is `title`; aborts the run on timeout
    pub async fn wait_for_page(&self, title: &str) -> Result<bool> {
        self.guarded(async {
            self.wait_until_or_stop(|| async {
                Ok((self.driver.title().await? == title).then_some(true))
            })
            .await
        })
        .await
    }

    /// Open `address` in a new tab and switch to it
    pub async fn open_in_new_tab(&self, address: &str) -> Result<bool> {
        self.guarded(async {
            let url = self.url_for(address)?;
            let before = self.driver.window_handles().await?.len();
            self.driver
                .execute_script("window.open(arguments[0], '_blank');", vec![json!(url)])
                .await?;
            self.wait_until(|| async {
                Ok((self.driver.window_handles().await?.len() > before).then_some(()))
            })
            .await?;
            self.switch_to_next_tab().await
        })
        .await
    }

    pub async fn clear_local_storage(&self) -> Result<bool> {
        self.guarded(async {
            self.driver
                .execute_script("localStorage.clear();", Vec::new())
                .await?;
            Ok(true)
        })
        .await
    }

    pub async fn delete_all_cookies(&self) -> Result<bool> {
        self.guarded(async {
            self.driver.delete_all_cookies().await?;
            Ok(true)
        })
        .await
    }

    // =========================================================================
    // Tabs
    // =========================================================================

    pub async fn tab_count(&self) -> Result<usize> {
        self.guarded(async { Ok(self.driver.window_handles().await?.len()) })
            .await
    }

    /// 1-based index of the current tab, `None` when it was closed
    pub async fn current_tab_index(&self) -> Result<Option<usize>> {
        self.guarded(async {
            let (_, current) = self.tabs().await?;
            Ok(current.map(|i| i + 1))
        })
        .await
    }

    /// Handles of all tabs and the position of the current one
    async fn tabs(&self) -> Result<(Vec<String>, Option<usize>)> {
        let handles = self.driver.window_handles().await?;
        let current = self
            .driver
            .current_window()
            .await?
            .and_then(|handle| handles.iter().position(|h| *h == handle));
        Ok((handles, current))
    }

    pub async fn switch_to_next_tab(&self) -> Result<bool> {
        self.guarded(async {
            let (tabs, current) = self.tabs().await?;
            if tabs.len() <= 1 {
                return Ok(false);
            }
            let next = current.map_or(0, |i| (i + 1) % tabs.len());
            self.driver.switch_to_window(&tabs[next]).await?;
            Ok(true)
        })
        .await
    }

    pub async fn switch_to_previous_tab(&self) -> Result<bool> {
        self.guarded(async {
            let (tabs, current) = self.tabs().await?;
            if tabs.len() <= 1 {
                return Ok(false);
            }
            let previous = current.map_or(0, |i| (i + tabs.len() - 1) % tabs.len());
            self.driver.switch_to_window(&tabs[previous]).await?;
            Ok(true)
        })
        .await
    }

    /// Close the current tab and move to the one before it (or the next, for the first tab)
    ///
    /// The last remaining tab is never closed.
    pub async fn close_tab(&self) -> Result<bool> {
        self.guarded(async {
            let (tabs, current) = self.tabs().await?;
            let Some(current) = current else {
                return Ok(false);
            };
            if tabs.len() <= 1 {
                return Ok(false);
            }
            let destination = if current > 0 { current - 1 } else { 1 };
            self.driver.close_window().await?;
            self.driver.switch_to_window(&tabs[destination]).await?;
            Ok(true)
        })
        .await
    }

    /// Close tabs until a single one remains
    pub async fn ensure_only_one_tab(&self) -> Result<bool> {
        self.guarded(async {
            self.ensure_active_tab_is_not_closed().await?;
            let count = self.driver.window_handles().await?.len();
            for _ in 1..count {
                self.close_tab().await?;
            }
            Ok(self.driver.window_handles().await?.len() == 1)
        })
        .await
    }

    /// Switch to the first tab when the current one has been closed
    ///
    /// Returns whether a switch was needed.
    pub async fn ensure_active_tab_is_not_closed(&self) -> Result<bool> {
        self.guarded(async {
            let (tabs, current) = self.tabs().await?;
            if current.is_some() {
                return Ok(false);
            }
            match tabs.first() {
                Some(first) => {
                    self.driver.switch_to_window(first).await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    /// Text of the open alert, `None` when none appears
    pub async fn alert_text(&self) -> Result<Option<String>> {
        self.guarded(self.wait_until_or_none(|| self.driver.alert_text()))
            .await
    }

    pub async fn confirm_alert(&self) -> Result<bool> {
        self.guarded(self.driver.accept_alert()).await
    }

    pub async fn dismiss_alert(&self) -> Result<bool> {
        self.guarded(self.driver.dismiss_alert()).await
    }

    // =========================================================================
    // Keyboard
    // =========================================================================

    pub async fn press_tab(&self) -> Result<bool> {
        self.send_keys_to_active(&keys::TAB.to_string()).await
    }

    pub async fn press_enter(&self) -> Result<bool> {
        self.send_keys_to_active(&keys::ENTER.to_string()).await
    }

    pub async fn press_esc(&self) -> Result<bool> {
        self.send_keys_to_active(&keys::ESCAPE.to_string()).await
    }

    /// Type into the focused element
    pub async fn type_text(&self, text: &str) -> Result<bool> {
        self.send_keys_to_active(&cleanup_value(text)).await
    }

    /// Press a named key (`down`, `F5`), a literal, or a chord such as `Control + a`
    pub async fn press(&self, key: &str) -> Result<bool> {
        self.send_keys_to_active(&keys::parse_keys(key)).await
    }

    async fn send_keys_to_active(&self, keys: &str) -> Result<bool> {
        self.guarded(async {
            match self.driver.active_element().await? {
                Some(element) => {
                    self.driver.send_keys(&element, keys).await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    // =========================================================================
    // Window & Screenshots
    // =========================================================================

    pub async fn current_browser_width(&self) -> Result<u32> {
        self.guarded(async { Ok(self.driver.window_size().await?.width) })
            .await
    }

    pub async fn current_browser_height(&self) -> Result<u32> {
        self.guarded(async { Ok(self.driver.window_size().await?.height) })
            .await
    }

    pub async fn set_browser_width(&self, width: u32) -> Result<bool> {
        self.guarded(async {
            let height = self.driver.window_size().await?.height;
            self.resize(WindowSize::new(width, height)).await
        })
        .await
    }

    pub async fn set_browser_height(&self, height: u32) -> Result<bool> {
        self.guarded(async {
            let width = self.driver.window_size().await?.width;
            self.resize(WindowSize::new(width, height)).await
        })
        .await
    }

    pub async fn set_browser_size_to_by(&self, width: u32, height: u32) -> Result<bool> {
        self.guarded(self.resize(WindowSize::new(width, height)))
            .await
    }

    async fn resize(&self, size: WindowSize) -> Result<bool> {
        self.driver.set_window_size(size).await?;
        let actual = self.driver.window_size().await?;
        if actual != size {
            return Err(Error::step_failed(format!(
                "Unable to change size to: {} x {}; size is: {} x {}",
                size.width, size.height, actual.width, actual.height
            )));
        }
        Ok(true)
    }

    /// Save a screenshot and return report markup linking to it
    pub async fn take_screenshot(&self, base_name: &str) -> Result<String> {
        self.guarded(self.reporter().take_screenshot(base_name))
            .await
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn seconds_before_timeout(&self) -> u64 {
        self.config.timeout.as_secs()
    }

    /// Change the poll deadline and the driver's page-load and script timeouts
    pub async fn set_seconds_before_timeout(&mut self, seconds: u64) -> Result<()> {
        self.config.timeout = Duration::from_secs(seconds);
        let timeout = self.config.timeout;
        self.guarded(self.driver.set_timeouts(timeout, timeout))
            .await
    }

    pub fn wait_milliseconds_after_scroll(&mut self, millis: u64) {
        self.config.scroll_settle = Duration::from_millis(millis);
    }

    pub fn screenshot_base_directory(&mut self, directory: impl Into<PathBuf>) {
        self.config.screenshot_dir = directory.into();
    }

    /// Thumbnail height of screenshots in failure messages; `None` for plain links
    pub fn screenshot_show_height(&mut self, height: Option<u32>) {
        self.config.screenshot_height = height;
    }
}
