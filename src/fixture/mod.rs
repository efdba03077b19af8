//! Browser Fixture
//!
//! The operations a test table calls. Every operation resolves its place
//! afresh, polls until the page cooperates and reports failures as one of the
//! two classified [`Error`] kinds.
//!
//! When nothing on the page ever matches a place, element operations return
//! `false` (or `None`) rather than failing, so the table can assert on it.

mod navigation;
mod rows;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use url::Url;

use crate::driver::{Driver, ElementRef};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpResponse};
use crate::locator::{Locator, TextMatch, TextQuery, TextScope};
use crate::poll::{Poller, TimeoutPolicy};
use crate::reactive::FrameworkAdapter;
use crate::report::{FailureReporter, ScreenshotSettings};
use crate::resolve::{ElementResolver, Intent};
use crate::session::CookieJar;
use crate::storage::{FileStore, Storage};
use crate::value::{cleanup_value, unwrap_link};
use crate::visibility::VisibilityGate;
use crate::FixtureConfig;

const SET_HIDDEN_VALUE: &str = r#"
var e = document.getElementById(arguments[0]) || document.getElementsByName(arguments[0])[0];
if (!e) { return false; }
e.value = arguments[1];
return true;
"#;

/// Outcome of one interaction attempt
pub(crate) enum Step<T> {
    /// Nothing on the page matched
    Missing,
    /// A match exists but cannot be acted on yet
    Pending,
    Done(T),
}

/// Phrase-driven operations against one browser session
pub struct BrowserFixture {
    driver: Arc<dyn Driver>,
    storage: Arc<dyn Storage>,
    http: Option<Arc<dyn HttpClient>>,
    adapters: Vec<Arc<dyn FrameworkAdapter>>,
    config: FixtureConfig,
}

impl BrowserFixture {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a fixture; files go to a [`FileStore`] at `config.files_dir`
    pub fn new(driver: Arc<dyn Driver>, config: FixtureConfig) -> Self {
        let mut store = FileStore::new(&config.files_dir);
        if let Some(prefix) = &config.files_link_prefix {
            store = store.with_link_prefix(prefix.clone());
        }
        Self {
            driver,
            storage: Arc::new(store),
            http: default_http_client(),
            adapters: Vec::new(),
            config,
        }
    }

    /// Create a fixture and push its timeouts to the driver
    pub async fn connect(driver: Arc<dyn Driver>, config: FixtureConfig) -> Result<Self> {
        let fixture = Self::new(driver, config);
        fixture
            .driver
            .set_timeouts(fixture.config.timeout, fixture.config.timeout)
            .await?;
        fixture.ensure_active_tab_is_not_closed().await?;
        Ok(fixture)
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Add a framework adapter; adapters are consulted in the order added
    pub fn with_adapter(mut self, adapter: Arc<dyn FrameworkAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    // =========================================================================
    // Polling & Failures
    // =========================================================================

    fn poller(&self) -> Poller {
        Poller::new(self.config.timeout, self.config.poll_interval)
    }

    pub(crate) fn gate(&self) -> VisibilityGate<'_> {
        VisibilityGate::new(self.driver.as_ref(), self.config.scroll_settle)
    }

    pub(crate) fn reporter(&self) -> FailureReporter<'_> {
        FailureReporter::new(
            self.driver.as_ref(),
            self.storage.as_ref(),
            ScreenshotSettings {
                directory: self.config.screenshot_dir.clone(),
                show_height: self.config.screenshot_height,
                fixture_name: self.config.fixture_name.clone(),
            },
        )
    }

    /// Run a public operation, classifying whatever error escapes it
    pub(crate) async fn guarded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        match operation.await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.reporter().classify(e).await),
        }
    }

    /// Poll; a deadline is a recoverable step failure
    pub(crate) async fn wait_until<T, F, Fut>(&self, condition: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.poller().until(condition).await {
            Err(e) if e.is_timeout() => Err(self.reporter().timeout_failure(e).await),
            other => other,
        }
    }

    /// Poll; a deadline aborts the run
    pub(crate) async fn wait_until_or_stop<T, F, Fut>(&self, condition: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.poller().until(condition).await {
            Err(e) if e.is_timeout() => Err(self.reporter().stop_run(e).await),
            other => other,
        }
    }

    /// Poll; a deadline yields `None`
    pub(crate) async fn wait_until_or_none<T, F, Fut>(&self, condition: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.poller()
            .poll(TimeoutPolicy::ReturnNull, &self.reporter(), condition)
            .await
    }

    /// Poll an interaction
    ///
    /// If the last attempt before the deadline matched nothing the result is
    /// `None`; if something matched but never became usable the deadline is a
    /// recoverable step failure.
    pub(crate) async fn interact<T, F, Fut>(&self, mut attempt: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Step<T>>>,
    {
        let missing = AtomicBool::new(true);
        let outcome = self
            .poller()
            .until(|| {
                let step = attempt();
                let missing = &missing;
                async move {
                    Ok(match step.await? {
                        Step::Done(value) => Some(value),
                        Step::Missing => {
                            missing.store(true, Ordering::Relaxed);
                            None
                        }
                        Step::Pending => {
                            missing.store(false, Ordering::Relaxed);
                            None
                        }
                    })
                }
            })
            .await;

        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_timeout() && missing.load(Ordering::Relaxed) => {
                tracing::debug!("nothing matched before the deadline");
                Ok(None)
            }
            Err(e) if e.is_timeout() => Err(self.reporter().timeout_failure(e).await),
            Err(e) => Err(e),
        }
    }

    /// Adapters active on the current page, each settled
    ///
    /// A framework that does not settle in time aborts the run.
    pub(crate) async fn active_adapters(&self) -> Result<Vec<Arc<dyn FrameworkAdapter>>> {
        let mut active = Vec::new();
        for adapter in &self.adapters {
            if !adapter.is_active(self.driver.as_ref()).await? {
                continue;
            }
            tracing::debug!("waiting for {} to settle", adapter.name());
            match adapter.wait_until_settled(self.driver.as_ref()).await {
                Ok(()) => active.push(Arc::clone(adapter)),
                Err(e) if e.is_timeout() => return Err(self.reporter().stop_run(e).await),
                Err(e) => return Err(e),
            }
        }
        Ok(active)
    }

    pub(crate) async fn resolve(
        &self,
        intent: Intent,
        place: &str,
        adapters: &[Arc<dyn FrameworkAdapter>],
    ) -> Result<Option<ElementRef>> {
        let gate = self.gate();
        let resolver = ElementResolver::new(self.driver.as_ref(), &gate, adapters);
        Ok(resolver.resolve(intent, place).await?.into_element())
    }

    // =========================================================================
    // Element Helpers
    // =========================================================================

    /// Scroll into view if needed, then click when interactable
    pub(crate) async fn click_element(&self, element: &ElementRef) -> Result<bool> {
        let gate = self.gate();
        gate.scroll_into_view_if_needed(element).await?;
        if !gate.is_interactable(element).await? {
            return Ok(false);
        }
        self.driver.click(element).await?;
        Ok(true)
    }

    async fn try_click(
        &self,
        place: &str,
        adapters: &[Arc<dyn FrameworkAdapter>],
    ) -> Result<Step<bool>> {
        let Some(element) = self.resolve(Intent::Click, place, adapters).await? else {
            return Ok(Step::Missing);
        };
        Ok(if self.click_element(&element).await? {
            Step::Done(true)
        } else {
            Step::Pending
        })
    }

    /// Rendered text, read once the element is on screen
    pub(crate) async fn element_text(&self, element: &ElementRef) -> Result<String> {
        self.gate().scroll_into_view_if_needed(element).await?;
        self.driver.text(element).await
    }

    /// Type a cleaned-up value; empty values send nothing
    pub(crate) async fn send_value(&self, element: &ElementRef, value: &str) -> Result<()> {
        let keys = cleanup_value(value);
        if !keys.is_empty() {
            self.driver.send_keys(element, &keys).await?;
        }
        Ok(())
    }

    /// Current value of a form control or text element
    pub(crate) async fn value_for_element(&self, element: &ElementRef) -> Result<Option<String>> {
        let tag = self.driver.tag_name(element).await?.to_ascii_lowercase();
        if tag == "select" {
            let options = self
                .driver
                .find_elements(&Locator::TagName("option".into()), Some(element))
                .await?;
            for option in options {
                if self.driver.is_selected(&option).await? {
                    return Ok(Some(self.driver.text(&option).await?));
                }
            }
            return Ok(None);
        }

        let input_type = self.driver.attribute(element, "type").await?;
        if tag == "input" && input_type.is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
            let checked = self.driver.attribute(element, "checked").await?;
            return Ok(Some(checked.is_some_and(|c| c == "true").to_string()));
        }

        match self.driver.attribute(element, "value").await? {
            Some(value) => Ok(Some(value)),
            None => Ok(Some(self.element_text(element).await?)),
        }
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    /// Click the element best matching `place`
    pub async fn click(&self, place: &str) -> Result<bool> {
        self.guarded(async {
            let adapters = self.active_adapters().await?;
            let clicked = self.interact(|| self.try_click(place, &adapters)).await?;
            Ok(clicked.unwrap_or(false))
        })
        .await
    }

    /// Replace the content of `place` with `value`
    pub async fn enter_as(&self, value: &str, place: &str) -> Result<bool> {
        self.enter(value, place, true).await
    }

    /// Append `value` to the content of `place`
    pub async fn enter_for(&self, value: &str, place: &str) -> Result<bool> {
        self.enter(value, place, false).await
    }

    async fn enter(&self, value: &str, place: &str, replace: bool) -> Result<bool> {
        self.guarded(async {
            let adapters = self.active_adapters().await?;
            let entered = self
                .interact(|| async {
                    let Some(element) = self.resolve(Intent::Enter, place, &adapters).await? else {
                        return Ok(Step::Missing);
                    };
                    if !self.gate().is_interactable(&element).await? {
                        return Ok(Step::Pending);
                    }
                    if replace {
                        self.driver.clear(&element).await?;
                    }
                    self.send_value(&element, value).await?;
                    Ok(Step::Done(true))
                })
                .await?;
            Ok(entered.unwrap_or(false))
        })
        .await
    }

    /// Empty the content of `place`
    pub async fn clear(&self, place: &str) -> Result<bool> {
        self.guarded(async {
            let adapters = self.active_adapters().await?;
            let cleared = self
                .interact(|| async {
                    match self.resolve(Intent::Clear, place, &adapters).await? {
                        Some(element) => {
                            self.driver.clear(&element).await?;
                            Ok(Step::Done(true))
                        }
                        None => Ok(Step::Missing),
                    }
                })
                .await?;
            Ok(cleared.unwrap_or(false))
        })
        .await
    }

    pub async fn select_as(&self, value: &str, place: &str) -> Result<bool> {
        self.select_for(value, place).await
    }

    /// Choose option `value` of the select at `place`
    ///
    /// Without a native select or matching option, `value` is clicked like any
    /// other place so custom dropdown widgets work too.
    pub async fn select_for(&self, value: &str, place: &str) -> Result<bool> {
        self.guarded(async {
            let adapters = self.active_adapters().await?;
            let selected = self
                .interact(|| async {
                    if let Some(select) = self.resolve(Intent::Select, place, &adapters).await? {
                        if self.click_select_option(&select, value).await? {
                            return Ok(Step::Done(true));
                        }
                    }
                    self.try_click(value, &adapters).await
                })
                .await?;
            Ok(selected.unwrap_or(false))
        })
        .await
    }

    async fn click_select_option(&self, select: &ElementRef, value: &str) -> Result<bool> {
        if !self.driver.tag_name(select).await?.eq_ignore_ascii_case("select") {
            return Ok(false);
        }
        for matching in [TextMatch::Exact, TextMatch::Contains] {
            let query = TextQuery::new(value, matching, TextScope::Own).with_tag("option");
            if let Some(option) = self
                .driver
                .find_element(&Locator::Text(query), Some(select))
                .await?
            {
                return self.click_element(&option).await;
            }
        }
        Ok(false)
    }

    /// Value of `place`: selected option, checkbox state, value or text
    pub async fn value_of(&self, place: &str) -> Result<Option<String>> {
        self.guarded(async {
            let adapters = self.active_adapters().await?;
            self.wait_until_or_none(|| async {
                match self.resolve(Intent::Read, place, &adapters).await? {
                    Some(element) => self.value_for_element(&element).await,
                    None => Ok(None),
                }
            })
            .await
        })
        .await
    }

    /// Set the value of a hidden input by id or name
    pub async fn enter_for_hidden(&self, value: &str, id_or_name: &str) -> Result<bool> {
        self.guarded(async {
            let value = cleanup_value(value);
            let entered = self
                .interact(|| async {
                    let found = self
                        .driver
                        .execute_script(SET_HIDDEN_VALUE, vec![json!(id_or_name), json!(value)])
                        .await?;
                    Ok(if found.as_bool() == Some(true) {
                        Step::Done(true)
                    } else {
                        Step::Missing
                    })
                })
                .await?;
            Ok(entered.unwrap_or(false))
        })
        .await
    }

    /// Whether `place` is displayed on screen before the deadline
    pub async fn is_visible(&self, place: &str) -> Result<bool> {
        self.guarded(async {
            let visible = self
                .wait_until_or_none(|| async {
                    match self.resolve(Intent::Visibility, place, &[]).await? {
                        Some(element) => Ok(self.gate().is_visible(&element).await?.then_some(true)),
                        None => Ok(None),
                    }
                })
                .await?;
            Ok(visible.unwrap_or(false))
        })
        .await
    }

    /// Scroll `place` into view
    pub async fn scroll_to(&self, place: &str) -> Result<bool> {
        self.guarded(async {
            let scrolled = self
                .interact(|| async {
                    match self.resolve(Intent::Visibility, place, &[]).await? {
                        Some(element) => {
                            self.gate().scroll_to(&element).await?;
                            Ok(Step::Done(true))
                        }
                        None => Ok(Step::Missing),
                    }
                })
                .await?;
            Ok(scrolled.unwrap_or(false))
        })
        .await
    }

    /// Pick a local file in the file input at `place`
    ///
    /// `file` may be a path or a link to a stored file; it must exist.
    pub async fn select_file_for(&self, file: &str, place: &str) -> Result<bool> {
        self.guarded(async {
            let path = self.storage.path_for(&unwrap_link(file));
            if !path.is_file() {
                return Err(Error::step_failed(format!(
                    "Unable to find file: {}",
                    path.display()
                )));
            }
            let path = path.canonicalize()?.display().to_string();

            let selected = self
                .interact(|| async {
                    let Some(element) = self.resolve(Intent::Enter, place, &[]).await? else {
                        return Ok(Step::Missing);
                    };
                    if !self.is_file_input(&element).await? {
                        return Ok(Step::Missing);
                    }
                    self.driver.send_keys(&element, &path).await?;
                    Ok(Step::Done(true))
                })
                .await?;
            Ok(selected.unwrap_or(false))
        })
        .await
    }

    async fn is_file_input(&self, element: &ElementRef) -> Result<bool> {
        if !self.driver.tag_name(element).await?.eq_ignore_ascii_case("input") {
            return Ok(false);
        }
        Ok(self
            .driver
            .attribute(element, "type")
            .await?
            .is_some_and(|t| t.eq_ignore_ascii_case("file")))
    }

    // =========================================================================
    // Downloads
    // =========================================================================

    /// Fetch the target of the link at `place` with the browser's cookies
    ///
    /// Binary content is saved and a link to it (or its path) returned; text
    /// content is returned as is.
    pub async fn download(&self, place: &str) -> Result<Option<String>> {
        self.guarded(async {
            self.interact(|| async {
                match self.resolve(Intent::Download, place, &[]).await? {
                    Some(link) => Ok(Step::Done(self.download_link_target(&link).await?)),
                    None => Ok(Step::Missing),
                }
            })
            .await
        })
        .await
    }

    /// Fetch `address` with the browser's cookies
    pub async fn download_content_from(&self, address: &str) -> Result<String> {
        self.guarded(self.fetch(address)).await
    }

    pub(crate) async fn download_link_target(&self, link: &ElementRef) -> Result<String> {
        match self.driver.attribute(link, "href").await? {
            Some(href) => self.fetch(&href).await,
            None => Err(Error::step_failed("Could not determine url to download from")),
        }
    }

    async fn fetch(&self, address: &str) -> Result<String> {
        let url = self.download_url(address).await?;
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| Error::step_failed("No HTTP client configured for downloads"))?;
        let cookies = CookieJar::new(self.driver.cookies().await?);

        tracing::info!("Downloading {}", url);
        match http.get(&url, &cookies).await? {
            HttpResponse::Text(text) => Ok(text),
            HttpResponse::Binary { content, file_name } => {
                let name = Path::new(&file_name)
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("download"));
                let stem = name
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "download".to_string());
                let extension = name
                    .extension()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let base = self.config.download_dir.join(stem);
                let path = self.storage.save(&base, &extension, &content)?;
                tracing::info!("Saved download to {}", path.display());

                Ok(match self.storage.link_for(&path) {
                    Some(link) => format!(r#"<a href="{}">{}</a>"#, link, name.display()),
                    None => path.display().to_string(),
                })
            }
        }
    }

    /// Address with wiki markup removed, joined to the base URL when relative
    pub(crate) fn url_for(&self, address: &str) -> Result<String> {
        let address = unwrap_link(address);
        if Url::parse(&address).is_ok() {
            return Ok(address);
        }
        match &self.config.base_url {
            Some(base) => Ok(base.join(&address)?.to_string()),
            None => Ok(address),
        }
    }

    async fn download_url(&self, address: &str) -> Result<Url> {
        let address = self.url_for(address)?;
        match Url::parse(&address) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let current = Url::parse(&self.driver.current_url().await?)?;
                Ok(current.join(&address)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Waits & Direct Lookups
    // =========================================================================

    /// Wait until an element with `tag` shows `expected`; aborts the run on timeout
    pub async fn wait_for_tag_with_text(&self, tag: &str, expected: &str) -> Result<bool> {
        self.wait_for_element_with_text(Locator::TagName(tag.to_string()), expected)
            .await
    }

    /// Wait until an element with `class` shows `expected`; aborts the run on timeout
    pub async fn wait_for_class_with_text(&self, class: &str, expected: &str) -> Result<bool> {
        self.wait_for_element_with_text(Locator::ClassName(class.to_string()), expected)
            .await
    }

    async fn wait_for_element_with_text(&self, locator: Locator, expected: &str) -> Result<bool> {
        self.guarded(async {
            let expected = cleanup_value(expected);
            self.wait_until_or_stop(|| async {
                for element in self.driver.find_elements(&locator, None).await? {
                    match self.has_text(&element, &expected).await {
                        Ok(true) => return Ok(Some(true)),
                        Ok(false) => {}
                        // the page changed under us, look again next attempt
                        Err(e) if e.is_stale() => return Ok(None),
                        Err(e) => return Err(e),
                    }
                }
                Ok(None)
            })
            .await
        })
        .await
    }

    async fn has_text(&self, element: &ElementRef, expected: &str) -> Result<bool> {
        let mut actual = self.element_text(element).await?;
        if actual.is_empty() {
            actual = self
                .driver
                .attribute(element, "value")
                .await?
                .unwrap_or_default();
        }
        Ok(actual == expected)
    }

    /// Wait until an element with `class` exists; aborts the run on timeout
    pub async fn wait_for_class(&self, class: &str) -> Result<bool> {
        self.guarded(async {
            let locator = Locator::ClassName(class.to_string());
            self.wait_until_or_stop(|| async {
                Ok(self
                    .driver
                    .find_element(&locator, None)
                    .await?
                    .map(|_| true))
            })
            .await
        })
        .await
    }

    /// Wait until the element at `xpath` is displayed; aborts the run on timeout
    pub async fn wait_for_xpath_visible(&self, xpath: &str) -> Result<bool> {
        self.guarded(async {
            let locator = Locator::XPath(xpath.to_string());
            self.wait_until_or_stop(|| async {
                let Some(element) = self.driver.find_element(&locator, None).await? else {
                    return Ok(None);
                };
                self.gate().scroll_into_view_if_needed(&element).await?;
                Ok(self.driver.is_displayed(&element).await?.then_some(true))
            })
            .await
        })
        .await
    }

    pub async fn click_by_xpath(&self, xpath: &str) -> Result<bool> {
        self.guarded(async {
            let locator = Locator::XPath(xpath.to_string());
            let clicked = self
                .interact(|| async {
                    let Some(element) = self.driver.find_element(&locator, None).await? else {
                        return Ok(Step::Missing);
                    };
                    Ok(if self.click_element(&element).await? {
                        Step::Done(true)
                    } else {
                        Step::Pending
                    })
                })
                .await?;
            Ok(clicked.unwrap_or(false))
        })
        .await
    }

    pub async fn text_by_xpath(&self, xpath: &str) -> Result<Option<String>> {
        self.text_of(Locator::XPath(xpath.to_string())).await
    }

    pub async fn text_by_class_name(&self, class: &str) -> Result<Option<String>> {
        self.text_of(Locator::ClassName(class.to_string())).await
    }

    /// Text of the first element matching `locator`, `None` if there is none
    pub(crate) async fn text_of(&self, locator: Locator) -> Result<Option<String>> {
        self.guarded(async {
            self.wait_until_or_none(|| async {
                match self.driver.find_element(&locator, None).await? {
                    Some(element) => Ok(Some(self.element_text(&element).await?)),
                    None => Ok(None),
                }
            })
            .await
        })
        .await
    }
}

#[cfg(feature = "http")]
fn default_http_client() -> Option<Arc<dyn HttpClient>> {
    Some(Arc::new(crate::http::ReqwestClient::new()))
}

#[cfg(not(feature = "http"))]
fn default_http_client() -> Option<Arc<dyn HttpClient>> {
    None
}
