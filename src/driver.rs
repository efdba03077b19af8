//! Automation Driver Interface
//!
//! Everything the engine needs from a remote browser-automation backend.
//! Backends (WebDriver clients, CDP sessions, test doubles) implement
//! [`Driver`]; the engine never talks to a browser any other way.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::locator::Locator;

/// W3C WebDriver key used to pass elements into and out of scripts
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Reference to a live node in the current page
///
/// Carries no ownership and no cached state. It is only meaningful until the
/// next navigation or DOM mutation; any use may fail with
/// [`Error::StaleElement`](crate::Error::StaleElement).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Backend-specific element id
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Encode as a script argument
    pub fn to_script_arg(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }

    /// Decode the elements a script returned (single element or array)
    pub fn from_script_value(value: &Value) -> Vec<ElementRef> {
        match value {
            Value::Array(items) => items.iter().flat_map(Self::from_script_value).collect(),
            Value::Object(map) => map
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| vec![ElementRef::new(id)])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Browser cookie as reported by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Seconds since the Unix epoch; `None` for session cookies
    #[serde(default)]
    pub expiry: Option<i64>,
}

/// Browser window size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A remote browser-automation session
///
/// The engine assumes exclusive use of the session for the duration of one
/// operation. Implementations should report driver failures through
/// [`Error::from_driver_message`](crate::Error::from_driver_message) so stale
/// and click-intercepted races are recognised.
#[async_trait]
pub trait Driver: Send + Sync {
    // =========================================================================
    // Element Finding
    // =========================================================================

    /// All elements matching `locator`, in document order, optionally below `scope`
    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>>;

    /// First element matching `locator`
    async fn find_element(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Option<ElementRef>> {
        Ok(self.find_elements(locator, scope).await?.into_iter().next())
    }

    /// Element that currently has keyboard focus
    async fn active_element(&self) -> Result<Option<ElementRef>>;

    // =========================================================================
    // Element Inspection
    // =========================================================================

    async fn tag_name(&self, element: &ElementRef) -> Result<String>;

    /// Property-or-attribute lookup with WebDriver `getAttribute` semantics
    /// (boolean properties such as `checked` come back as `"true"` or `None`)
    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Rendered text
    async fn text(&self, element: &ElementRef) -> Result<String>;

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool>;

    /// Selected state of an option, checkbox or radio
    async fn is_selected(&self, element: &ElementRef) -> Result<bool>;

    /// Whether the backend considers the element within interactable bounds
    ///
    /// `None` when the backend cannot tell.
    async fn in_interactable_bounds(&self, _element: &ElementRef) -> Result<Option<bool>> {
        Ok(None)
    }

    /// Whether the element lies inside the current viewport
    ///
    /// `None` when this could not be determined.
    async fn is_on_screen(&self, element: &ElementRef) -> Result<Option<bool>> {
        let result = self
            .execute_script(
                r#"
                var r = arguments[0].getBoundingClientRect();
                var h = window.innerHeight || document.documentElement.clientHeight;
                var w = window.innerWidth || document.documentElement.clientWidth;
                return r.top >= 0 && r.left >= 0 && r.bottom <= h && r.right <= w;
                "#,
                vec![element.to_script_arg()],
            )
            .await?;
        Ok(result.as_bool())
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn clear(&self, element: &ElementRef) -> Result<()>;

    async fn send_keys(&self, element: &ElementRef, keys: &str) -> Result<()>;

    /// Scroll so the top of the element becomes visible
    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.execute_script(
            "arguments[0].scrollIntoView(true);",
            vec![element.to_script_arg()],
        )
        .await?;
        Ok(())
    }

    // =========================================================================
    // JavaScript
    // =========================================================================

    /// Run a synchronous script; `arguments[i]` are the supplied values
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Run a script whose last argument is a completion callback
    ///
    /// Must fail with [`Error::Timeout`](crate::Error::Timeout) when the
    /// callback is not invoked within the script timeout.
    async fn execute_async_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    // =========================================================================
    // Navigation
    // =========================================================================

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn back(&self) -> Result<()>;

    async fn forward(&self) -> Result<()>;

    async fn refresh(&self) -> Result<()>;

    async fn title(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    // =========================================================================
    // Windows
    // =========================================================================

    async fn window_handles(&self) -> Result<Vec<String>>;

    /// Handle of the window in focus, `None` once it has been closed
    async fn current_window(&self) -> Result<Option<String>>;

    async fn switch_to_window(&self, handle: &str) -> Result<()>;

    async fn close_window(&self) -> Result<()>;

    async fn window_size(&self) -> Result<WindowSize>;

    async fn set_window_size(&self, size: WindowSize) -> Result<()>;

    // =========================================================================
    // Alerts
    // =========================================================================

    /// Text of the open alert, `None` if there is none
    async fn alert_text(&self) -> Result<Option<String>>;

    /// Accept the open alert, false if there is none
    async fn accept_alert(&self) -> Result<bool>;

    /// Dismiss the open alert, false if there is none
    async fn dismiss_alert(&self) -> Result<bool>;

    // =========================================================================
    // Session
    // =========================================================================

    async fn cookies(&self) -> Result<Vec<Cookie>>;

    async fn delete_all_cookies(&self) -> Result<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn set_timeouts(&self, page_load: Duration, script: Duration) -> Result<()>;
}
