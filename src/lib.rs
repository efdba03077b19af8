//! # webfixture
//!
//! Phrase-driven browser acceptance testing.
//!
//! Test authors describe steps in plain words: "click Save", "enter Alice as
//! First name", "value of Age in row where Name is Ann". webfixture turns those
//! phrases into reliable actions against a live page, with no CSS selectors or
//! XPath in the test table.
//!
//! ## Features
//!
//! - **Place resolution** - A fixed cascade of lookups (link text, id, name,
//!   label, placeholder, onclick handlers, visible text) with exact matches
//!   always ahead of partial ones
//! - **Polling** - Every step retries until the page catches up, swallowing
//!   stale-element and click-intercepted races
//! - **Tables** - Cells addressed by header text and row values
//! - **Reactive pages** - Waits for AngularJS to settle and finds inputs by
//!   model expression
//! - **Readable failures** - Step failures carry a message and a screenshot
//!   link; unusable pages stop the run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webfixture::{BrowserFixture, Driver, FixtureConfig};
//!
//! # async fn run(driver: Arc<dyn Driver>) -> webfixture::Result<()> {
//! let fixture = BrowserFixture::connect(driver, FixtureConfig::default()).await?;
//!
//! fixture.open("http://localhost:8080/people").await?;
//! fixture.enter_as("Ann", "First name").await?;
//! fixture.select_as("Blue", "Favourite colour").await?;
//! fixture.click("Save").await?;
//!
//! let age = fixture.value_of_in_row_where_is("Age", "Name", "Ann").await?;
//! assert_eq!(age.as_deref(), Some("30"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use webfixture::FixtureConfig;
//!
//! let config = FixtureConfig {
//!     timeout: Duration::from_secs(30),
//!     screenshot_height: None,
//!     ..Default::default()
//! };
//! assert_eq!(config.poll_interval, Duration::from_millis(100));
//! ```

pub mod driver;
pub mod error;
pub mod fixture;
pub mod http;
pub mod keys;
pub mod locator;
pub mod poll;
pub mod reactive;
pub mod report;
pub mod resolve;
pub mod session;
pub mod storage;
pub mod table;
pub mod value;
pub mod visibility;

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

// Re-exports
pub use driver::{Cookie, Driver, ElementRef, WindowSize};
pub use error::{Error, Result};
pub use fixture::BrowserFixture;
pub use http::{HttpClient, HttpResponse};
#[cfg(feature = "http")]
pub use http::ReqwestClient;
pub use locator::{Locator, TextMatch, TextQuery, TextScope};
pub use poll::{Poller, TimeoutPolicy};
pub use reactive::{AngularAdapter, FrameworkAdapter};
pub use report::FailureReporter;
pub use resolve::{ClickStrategy, ElementResolver, Intent, ResolutionAttempt};
pub use session::{CookieJar, SessionCookie};
pub use storage::{FileStore, Storage};
pub use table::{CellFilter, ColumnSelector, RowSelector, TableQuery};
pub use visibility::VisibilityGate;

/// Configuration for a browser fixture
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// Poll deadline; also pushed to the driver as page-load and script timeout
    pub timeout: Duration,
    /// Pause between poll attempts
    pub poll_interval: Duration,
    /// Wait after scrolling an element into view
    pub scroll_settle: Duration,
    /// Screenshot directory, relative to the file store root
    pub screenshot_dir: PathBuf,
    /// Thumbnail height of screenshots in reports (None = plain link)
    pub screenshot_height: Option<u32>,
    /// Download directory, relative to the file store root
    pub download_dir: PathBuf,
    /// Base for relative addresses
    pub base_url: Option<Url>,
    /// Groups screenshots per fixture
    pub fixture_name: String,
    /// Root of the default file store
    pub files_dir: PathBuf,
    /// URL prefix stored files are published under (None = local paths)
    pub files_link_prefix: Option<String>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            scroll_settle: Duration::from_millis(150),
            screenshot_dir: PathBuf::from("screenshots"),
            screenshot_height: Some(200),
            download_dir: PathBuf::from("downloads"),
            base_url: None,
            fixture_name: "BrowserTest".to_string(),
            files_dir: PathBuf::from("files"),
            files_link_prefix: Some("files".to_string()),
        }
    }
}

impl FixtureConfig {
    /// Create a config resolving relative addresses against `base_url`
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
            ..Default::default()
        }
    }

    /// Create a config for local runs against a fast page: short deadline, no scroll settle
    pub fn fast() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(50),
            scroll_settle: Duration::ZERO,
            ..Default::default()
        }
    }
}
