//! Reactive Framework Adapter
//!
//! Pages built on a client-side reactive framework render asynchronously and
//! bind inputs to model expressions rather than labels. An adapter lets the
//! engine wait for the framework to go quiet before interacting and contributes
//! framework-aware lookups that run ahead of the generic resolution cascade.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::driver::{Driver, ElementRef};
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::resolve::Intent;

/// Framework integration hooks
#[async_trait]
pub trait FrameworkAdapter: Send + Sync {
    /// Short name used in logs and resolution traces
    fn name(&self) -> &str;

    /// Whether the framework is present on the current page
    async fn is_active(&self, driver: &dyn Driver) -> Result<bool>;

    /// Block until pending framework work has drained
    ///
    /// Fails with [`Error::Timeout`] when the framework does not settle within
    /// the driver's script timeout.
    async fn wait_until_settled(&self, driver: &dyn Driver) -> Result<()>;

    /// Framework-aware lookup of a place for the given intent
    async fn locate(
        &self,
        driver: &dyn Driver,
        intent: Intent,
        place: &str,
    ) -> Result<Option<ElementRef>>;
}

// =============================================================================
// AngularJS
// =============================================================================

const IS_ANGULAR_PAGE: &str = "return window.angular?1:0;";

const WAIT_FOR_ANGULAR: &str = r#"
var rootSelector = arguments[0];
var callback = arguments[arguments.length - 1];
var el = document.querySelector(rootSelector);
try {
    if (window.getAngularTestability) {
        window.getAngularTestability(el).whenStable(function() { callback(null); });
        return;
    }
    if (!window.angular) {
        throw new Error('angular could not be found on the window');
    }
    if (angular.getTestability) {
        angular.getTestability(el).whenStable(function() { callback(null); });
    } else {
        if (!angular.element(el).injector()) {
            throw new Error('root element (' + rootSelector + ') has no injector.' +
                ' this may mean it is not inside ng-app.');
        }
        angular.element(el).injector().get('$browser')
            .notifyWhenNoOutstandingRequests(function() { callback(null); });
    }
} catch (err) {
    callback(err.message);
}
"#;

const FIND_BINDINGS: &str = r#"
var binding = arguments[0];
var using = document.querySelector(arguments[1]) || document;
var bindings = using.getElementsByClassName('ng-binding');
var matches = [];
for (var i = 0; i < bindings.length; ++i) {
    var dataBinding = angular.element(bindings[i]).data('$binding');
    if (dataBinding) {
        var bindingName = dataBinding.exp || dataBinding[0].exp || dataBinding;
        if (bindingName.indexOf(binding) != -1) {
            matches.push(bindings[i]);
        }
    }
}
return matches;
"#;

const FIND_INPUTS: &str = r#"
var model = arguments[0];
var using = document.querySelector(arguments[1]) || document;
var prefixes = ['ng-', 'ng_', 'data-ng-', 'x-ng-', 'ng\\:'];
for (var p = 0; p < prefixes.length; ++p) {
    var selector = 'input[' + prefixes[p] + 'model="' + model + '"]';
    var inputs = using.querySelectorAll(selector);
    if (inputs.length) {
        return inputs;
    }
}
return [];
"#;

const FIND_SELECTS: &str = r#"
var model = arguments[0];
var using = document.querySelector(arguments[1]) || document;
var prefixes = ['ng-', 'ng_', 'data-ng-', 'x-ng-', 'ng\\:'];
for (var p = 0; p < prefixes.length; ++p) {
    var selector = 'select[' + prefixes[p] + 'model="' + model + '"]';
    var selects = using.querySelectorAll(selector);
    if (selects.length) {
        return selects;
    }
}
return [];
"#;

const FIND_TEXTAREA: &str = r#"
var model = arguments[0];
var using = document.querySelector(arguments[1]) || document;
var prefixes = ['ng-', 'ng_', 'data-ng-', 'x-ng-', 'ng\\:'];
for (var p = 0; p < prefixes.length; ++p) {
    var selector = 'textarea[' + prefixes[p] + 'model="' + model + '"]';
    var textareas = using.querySelectorAll(selector);
    if (textareas.length) {
        return textareas;
    }
}
return [];
"#;

/// AngularJS model and binding lookups
///
/// Lookups and waits are scoped below the root element, `body` by default.
#[derive(Debug, Clone, Default)]
pub struct AngularAdapter {
    root: Option<String>,
}

/// Which angular lookup to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NgLookup {
    Binding,
    Input,
    Select,
    TextArea,
}

impl NgLookup {
    fn script(self) -> &'static str {
        match self {
            NgLookup::Binding => FIND_BINDINGS,
            NgLookup::Input => FIND_INPUTS,
            NgLookup::Select => FIND_SELECTS,
            NgLookup::TextArea => FIND_TEXTAREA,
        }
    }
}

impl AngularAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope to the element matching a CSS selector
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn root(&self) -> &str {
        self.root.as_deref().unwrap_or("body")
    }

    /// Lookups tried, in order, for each intent
    fn lookups(intent: Intent) -> &'static [NgLookup] {
        match intent {
            Intent::Read => &[
                NgLookup::Binding,
                NgLookup::Input,
                NgLookup::Select,
                NgLookup::TextArea,
            ],
            Intent::Enter | Intent::Clear => &[NgLookup::Input, NgLookup::TextArea],
            Intent::Select => &[NgLookup::Select],
            Intent::Click | Intent::Visibility | Intent::Download => &[],
        }
    }

    fn locator(&self, lookup: NgLookup, place: &str) -> Locator {
        Locator::script(lookup.script(), vec![json!(place), json!(self.root())])
    }
}

#[async_trait]
impl FrameworkAdapter for AngularAdapter {
    fn name(&self) -> &str {
        "angular"
    }

    async fn is_active(&self, driver: &dyn Driver) -> Result<bool> {
        let result = driver.execute_script(IS_ANGULAR_PAGE, Vec::new()).await?;
        Ok(result.as_i64() == Some(1))
    }

    async fn wait_until_settled(&self, driver: &dyn Driver) -> Result<()> {
        let result = driver
            .execute_async_script(WAIT_FOR_ANGULAR, vec![json!(self.root())])
            .await?;
        match result {
            Value::Null => Ok(()),
            Value::String(message) => Err(Error::Script(message)),
            other => Err(Error::Script(other.to_string())),
        }
    }

    async fn locate(
        &self,
        driver: &dyn Driver,
        intent: Intent,
        place: &str,
    ) -> Result<Option<ElementRef>> {
        for lookup in Self::lookups(intent) {
            let locator = self.locator(*lookup, place);
            if let Some(element) = driver.find_element(&locator, None).await? {
                tracing::debug!("angular {:?} lookup matched '{}'", lookup, place);
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}
