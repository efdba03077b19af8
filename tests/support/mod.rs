//! In-memory browser for behavioral tests
//!
//! A tiny DOM tree with just enough rendering state (displayed, enabled,
//! on-screen) to exercise resolution, polling and reporting. Locators are
//! evaluated structurally rather than through an XPath engine.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use webfixture::driver::ELEMENT_KEY;
use webfixture::locator::{Locator, TextMatch, TextQuery, TextScope};
use webfixture::table::{CellFilter, ColumnSelector, RowSelector, TableQuery};
use webfixture::{
    BrowserFixture, Cookie, CookieJar, Driver, ElementRef, Error, FixtureConfig, HttpClient,
    HttpResponse, Result, WindowSize,
};

pub const BODY: usize = 0;

const STALE: &str = "stale element reference: element is not attached to the page document";

// =============================================================================
// DOM
// =============================================================================

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Own text; children carry their own
    pub text: String,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub displayed: bool,
    pub enabled: bool,
    /// Inside the viewport and interactable bounds; scrolling sets it
    pub on_screen: bool,
    /// Form value of inputs and textareas
    pub value: Option<String>,
    pub checked: bool,
    pub selected: bool,
    pub detached: bool,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            displayed: true,
            enabled: true,
            on_screen: true,
            value: None,
            checked: false,
            selected: false,
            detached: false,
        }
    }
}

/// Node builder
pub struct Spec(Node);

pub fn el(tag: &str) -> Spec {
    Spec(Node::new(tag))
}

impl Spec {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if name == "value" {
            self.0.value = Some(value.to_string());
        }
        self.0.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.0.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.0.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.0.enabled = false;
        self
    }

    pub fn off_screen(mut self) -> Self {
        self.0.on_screen = false;
        self
    }

    pub fn selected(mut self) -> Self {
        self.0.selected = true;
        self
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn el_ref(id: usize) -> ElementRef {
    ElementRef::new(format!("n{id}"))
}

/// Script value for an element, as a driver would return it
pub fn element_value(id: usize) -> Value {
    json!({ ELEMENT_KEY: format!("n{id}") })
}

type ScriptHandler = Box<dyn Fn(&mut State, &[Value]) -> Result<Value> + Send + Sync>;
type ClickHook = Box<dyn Fn(&mut State) + Send + Sync>;

pub struct State {
    pub nodes: Vec<Node>,
    pub focus: Option<usize>,
    pub clicks: Vec<usize>,
    pub scrolls: Vec<usize>,
    pub keys: Vec<(usize, String)>,
    pub navigations: Vec<String>,
    pub history: Vec<&'static str>,
    pub title: String,
    pub url: String,
    pub windows: Vec<String>,
    pub current_window: Option<String>,
    next_window: usize,
    pub window_size: WindowSize,
    /// Largest size the screen allows
    pub max_window: Option<WindowSize>,
    pub alert: Option<String>,
    pub cookies: Vec<Cookie>,
    pub screenshot_fails: bool,
    pub screenshots: usize,
    pub timeouts: Vec<(Duration, Duration)>,
    pub executed: Vec<String>,
    pub async_executed: Vec<(String, Vec<Value>)>,
    /// Remaining find calls that fail as stale
    pub stale_finds: usize,
    /// Error every click fails with
    pub click_error: Option<String>,
    /// Error setting timeouts fails with
    pub timeouts_error: Option<String>,
    intercepts: HashMap<usize, usize>,
    click_hooks: Vec<(usize, ClickHook)>,
    scripts: Vec<(String, ScriptHandler)>,
    async_scripts: Vec<(String, ScriptHandler)>,
}

impl State {
    fn new() -> Self {
        Self {
            nodes: vec![Node::new("body")],
            focus: None,
            clicks: Vec::new(),
            scrolls: Vec::new(),
            keys: Vec::new(),
            navigations: Vec::new(),
            history: Vec::new(),
            title: String::new(),
            url: "about:blank".to_string(),
            windows: vec!["w0".to_string()],
            current_window: Some("w0".to_string()),
            next_window: 1,
            window_size: WindowSize::new(1280, 1024),
            max_window: None,
            alert: None,
            cookies: Vec::new(),
            screenshot_fails: false,
            screenshots: 0,
            timeouts: Vec::new(),
            executed: Vec::new(),
            async_executed: Vec::new(),
            stale_finds: 0,
            click_error: None,
            timeouts_error: None,
            intercepts: HashMap::new(),
            click_hooks: Vec::new(),
            scripts: Vec::new(),
            async_scripts: Vec::new(),
        }
    }

    pub fn add(&mut self, parent: usize, spec: Spec) -> usize {
        let id = self.nodes.len();
        let mut node = spec.0;
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    pub fn open_window(&mut self) -> String {
        let handle = format!("w{}", self.next_window);
        self.next_window += 1;
        self.windows.push(handle.clone());
        handle
    }

    /// First node with `tag` whose `attr` is `value`
    pub fn find_by_attr(&self, tag: &str, attr: &str, value: &str) -> Option<usize> {
        self.document().into_iter().find(|&n| {
            self.tag(n) == tag && self.nodes[n].attrs.get(attr).map(String::as_str) == Some(value)
        })
    }

    fn node(&self, element: &ElementRef) -> Result<usize> {
        let id = element
            .id()
            .strip_prefix('n')
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| Error::Driver(format!("unknown element {}", element.id())))?;
        match self.nodes.get(id) {
            Some(node) if !node.detached => Ok(id),
            _ => Err(Error::from_driver_message(STALE)),
        }
    }

    /// Pre-order descendants, excluding `id`
    fn descendants(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            if self.nodes[n].detached {
                continue;
            }
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev());
        }
        out
    }

    fn document(&self) -> Vec<usize> {
        let mut all = vec![BODY];
        all.extend(self.descendants(BODY));
        all
    }

    fn tag(&self, id: usize) -> &str {
        &self.nodes[id].tag
    }

    /// Text nodes at or below `id`, normalized
    fn text_nodes(&self, id: usize) -> Vec<String> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .map(|n| normalize(&self.nodes[n].text))
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn deep_text(&self, id: usize) -> String {
        self.text_nodes(id).join(" ")
    }

    fn first_text(&self, id: usize) -> String {
        self.text_nodes(id).into_iter().next().unwrap_or_default()
    }

    fn displayed(&self, id: usize) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if !self.nodes[n].displayed {
                return false;
            }
            current = self.nodes[n].parent;
        }
        true
    }

    fn ancestor(&self, id: usize, tag: &str) -> Option<usize> {
        let mut current = self.nodes[id].parent;
        while let Some(n) = current {
            if self.tag(n) == tag {
                return Some(n);
            }
            current = self.nodes[n].parent;
        }
        None
    }

    fn children_tagged(&self, id: usize, tag: &str) -> Vec<usize> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|&c| !self.nodes[c].detached && self.tag(c) == tag)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Locator evaluation
    // -------------------------------------------------------------------------

    fn find(&self, locator: &Locator, scope: Option<usize>) -> Result<Vec<usize>> {
        let candidates = match scope {
            Some(s) => self.descendants(s),
            None => self.document(),
        };
        let matches = |f: &dyn Fn(usize) -> bool| -> Vec<usize> {
            candidates.iter().copied().filter(|&n| f(n)).collect()
        };
        Ok(match locator {
            Locator::Id(id) => matches(&|n| self.nodes[n].attrs.get("id") == Some(id)),
            Locator::Name(name) => matches(&|n| self.nodes[n].attrs.get("name") == Some(name)),
            Locator::TagName(tag) => matches(&|n| self.tag(n).eq_ignore_ascii_case(tag)),
            Locator::ClassName(class) => matches(&|n| self.has_class(n, class)),
            Locator::Css(css) => {
                if let Some(id) = css.strip_prefix('#') {
                    matches(&|n| self.nodes[n].attrs.get("id").map(String::as_str) == Some(id))
                } else if let Some(class) = css.strip_prefix('.') {
                    matches(&|n| self.has_class(n, class))
                } else {
                    matches(&|n| self.tag(n) == css)
                }
            }
            Locator::XPath(xpath) => {
                let (tag, attr) = parse_simple_xpath(xpath)?;
                matches(&|n| {
                    (tag == "*" || self.tag(n) == tag)
                        && attr.as_ref().map_or(true, |(name, value)| {
                            self.nodes[n].attrs.get(name) == Some(value)
                        })
                })
            }
            Locator::LinkText(text) => {
                matches(&|n| self.tag(n) == "a" && self.deep_text(n) == *text)
            }
            Locator::PartialLinkText(text) => {
                matches(&|n| self.tag(n) == "a" && self.deep_text(n).contains(text.as_str()))
            }
            Locator::Place { place, exact } => matches(&|n| self.matches_place(n, place, *exact)),
            // the document root would match every descendant-text query
            Locator::Text(query) => matches(&|n| n != BODY && self.matches_text(n, query)),
            Locator::Table(query) => {
                let found = self.eval_table(query);
                match scope {
                    Some(_) => found.into_iter().filter(|n| candidates.contains(n)).collect(),
                    None => found,
                }
            }
            Locator::Script { .. } => {
                return Err(Error::Driver("script locators are evaluated by the driver".into()))
            }
        })
    }

    fn has_class(&self, id: usize, class: &str) -> bool {
        self.nodes[id]
            .attrs
            .get("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    fn matches_place(&self, id: usize, place: &str, exact: bool) -> bool {
        let m = |v: &str| if exact { v == place } else { v.contains(place) };
        let node = &self.nodes[id];
        if ["id", "name", "placeholder", "aria-label"]
            .iter()
            .any(|a| node.attrs.get(*a).is_some_and(|v| m(v)))
        {
            return true;
        }
        if let Some(own_id) = node.attrs.get("id") {
            let labelled = self.document().into_iter().any(|l| {
                self.tag(l) == "label"
                    && self.nodes[l].attrs.get("for") == Some(own_id)
                    && m(&self.deep_text(l))
            });
            if labelled {
                return true;
            }
        }
        if matches!(node.tag.as_str(), "input" | "select" | "textarea") {
            if let Some(label) = self.ancestor(id, "label") {
                return m(&self.deep_text(label));
            }
        }
        false
    }

    fn matches_text(&self, id: usize, query: &TextQuery) -> bool {
        let node = &self.nodes[id];
        if let Some(tag) = &query.tag {
            if !node.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if query.with_onclick && !node.attrs.contains_key("onclick") {
            return false;
        }
        let text = match query.scope {
            TextScope::Own => normalize(&node.text),
            TextScope::Descendant => self.first_text(id),
        };
        match query.matching {
            TextMatch::Exact => text == query.text,
            TextMatch::Contains => text.contains(query.text.as_str()),
        }
    }

    /// 1-based position of the column headed `header` in the table holding `id`
    fn column_index(&self, id: usize, header: &str) -> usize {
        let Some(table) = self.ancestor(id, "table") else {
            return 1;
        };
        let heading = self.descendants(table).into_iter().find(|&n| {
            self.tag(n) == "th"
                && self.nodes[n].parent.is_some_and(|p| self.tag(p) == "tr")
                && self.text_nodes(n).iter().any(|t| t == header)
        });
        match heading {
            Some(th) => {
                let parent = self.nodes[th].parent.unwrap_or(BODY);
                let siblings = self.children_tagged(parent, "th");
                siblings.iter().position(|&s| s == th).unwrap_or(0) + 1
            }
            None => 1,
        }
    }

    fn eval_table(&self, query: &TableQuery) -> Vec<usize> {
        let data_rows: Vec<usize> = self
            .document()
            .into_iter()
            .filter(|&n| self.tag(n) == "tr" && !self.children_tagged(n, "td").is_empty())
            .collect();

        let rows: Vec<usize> = match &query.row {
            RowSelector::Number(n) => data_rows.get(n.wrapping_sub(1)).copied().into_iter().collect(),
            RowSelector::WhereIs { column, value } => data_rows
                .into_iter()
                .filter(|&row| {
                    let cells = self.children_tagged(row, "td");
                    let index = self.column_index(row, column);
                    cells
                        .get(index - 1)
                        .is_some_and(|&cell| self.text_nodes(cell).iter().any(|t| t == value))
                })
                .collect(),
        };

        let mut cells = Vec::new();
        for row in rows {
            let tds = self.children_tagged(row, "td");
            match &query.column {
                None => cells.extend(tds),
                Some(ColumnSelector::Number(n)) => cells.extend(tds.get(n.wrapping_sub(1)).copied()),
                Some(ColumnSelector::Header(header)) => {
                    let index = self.column_index(row, header);
                    cells.extend(tds.get(index - 1).copied());
                }
            }
        }

        let Some(within) = &query.within else {
            return cells;
        };
        let mut found = Vec::new();
        for cell in cells {
            for n in self.descendants(cell) {
                let tag_ok = within.tag.as_deref().map_or(true, |t| self.tag(n) == t);
                let filter_ok = match &within.filter {
                    None => true,
                    Some(CellFilter::TextContains(text)) => {
                        normalize(&self.nodes[n].text).contains(text.as_str())
                    }
                    Some(CellFilter::AttributeContains { name, value }) => self.nodes[n]
                        .attrs
                        .get(name)
                        .is_some_and(|v| v.contains(value.as_str())),
                };
                if tag_ok && filter_ok && !found.contains(&n) {
                    found.push(n);
                }
            }
        }
        found
    }

    fn run_script(
        handlers: &[(String, ScriptHandler)],
        state: &mut State,
        script: &str,
        args: &[Value],
    ) -> Option<Result<Value>> {
        handlers
            .iter()
            .find(|(key, _)| script.contains(key.as_str()))
            .map(|(_, handler)| handler(state, args))
    }
}

/// `//tag` or `//tag[@attr='value']`
fn parse_simple_xpath(xpath: &str) -> Result<(String, Option<(String, String)>)> {
    let unsupported = || Error::Driver(format!("unsupported xpath: {xpath}"));
    let rest = xpath.strip_prefix("//").ok_or_else(unsupported)?;
    match rest.split_once("[@") {
        None => Ok((rest.to_string(), None)),
        Some((tag, predicate)) => {
            let predicate = predicate.strip_suffix(']').ok_or_else(unsupported)?;
            let (name, value) = predicate.split_once('=').ok_or_else(unsupported)?;
            let value = value.trim_matches(|c| c == '\'' || c == '"');
            Ok((tag.to_string(), Some((name.to_string(), value.to_string()))))
        }
    }
}

// =============================================================================
// Driver
// =============================================================================

pub struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::new()),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add(&self, parent: usize, spec: Spec) -> usize {
        self.state().add(parent, spec)
    }

    /// Handle scripts containing `key`
    pub fn on_script(
        &self,
        key: &str,
        handler: impl Fn(&mut State, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.state().scripts.push((key.to_string(), Box::new(handler)));
    }

    /// Handle async scripts containing `key`
    pub fn on_async_script(
        &self,
        key: &str,
        handler: impl Fn(&mut State, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.state()
            .async_scripts
            .push((key.to_string(), Box::new(handler)));
    }

    pub fn on_click(&self, node: usize, hook: impl Fn(&mut State) + Send + Sync + 'static) {
        self.state().click_hooks.push((node, Box::new(hook)));
    }

    /// The next `times` clicks on `node` land on an overlay instead
    pub fn intercept(&self, node: usize, times: usize) {
        self.state().intercepts.insert(node, times);
    }

    pub fn clicks(&self) -> Vec<usize> {
        self.state().clicks.clone()
    }

    pub fn value(&self, node: usize) -> Option<String> {
        self.state().nodes[node].value.clone()
    }

    /// A table with a header row and data rows; returns the data cells per row
    pub fn add_table(&self, parent: usize, headers: &[&str], rows: &[&[&str]]) -> Vec<Vec<usize>> {
        let mut state = self.state();
        let table = state.add(parent, el("table"));
        let head = state.add(table, el("tr"));
        for header in headers {
            state.add(head, el("th").text(header));
        }
        let mut cells = Vec::new();
        for row in rows {
            let tr = state.add(table, el("tr"));
            let mut row_cells = Vec::new();
            for cell in row.iter() {
                row_cells.push(state.add(tr, el("td").text(cell)));
            }
            cells.push(row_cells);
        }
        cells
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>> {
        let mut state = self.state();
        if state.stale_finds > 0 {
            state.stale_finds -= 1;
            return Err(Error::from_driver_message(STALE));
        }
        let scope = scope.map(|s| state.node(s)).transpose()?;

        if let Locator::Script { source, args } = locator {
            let scripts = std::mem::take(&mut state.scripts);
            let result = State::run_script(&scripts, &mut *state, source, args);
            state.scripts = scripts;
            let value = result.unwrap_or(Ok(Value::Null))?;
            return Ok(ElementRef::from_script_value(&value));
        }

        Ok(state
            .find(locator, scope)?
            .into_iter()
            .map(el_ref)
            .collect())
    }

    async fn active_element(&self) -> Result<Option<ElementRef>> {
        Ok(self.state().focus.map(el_ref))
    }

    async fn tag_name(&self, element: &ElementRef) -> Result<String> {
        let state = self.state();
        let id = state.node(element)?;
        Ok(state.nodes[id].tag.clone())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let state = self.state();
        let node = &state.nodes[state.node(element)?];
        Ok(match name {
            "value" => node.value.clone(),
            "checked" => node.checked.then(|| "true".to_string()),
            "selected" => node.selected.then(|| "true".to_string()),
            _ => node.attrs.get(name).cloned(),
        })
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let state = self.state();
        let id = state.node(element)?;
        if !state.displayed(id) {
            return Ok(String::new());
        }
        Ok(state.deep_text(id))
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let state = self.state();
        let id = state.node(element)?;
        Ok(state.displayed(id))
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let state = self.state();
        let id = state.node(element)?;
        Ok(state.nodes[id].enabled)
    }

    async fn is_selected(&self, element: &ElementRef) -> Result<bool> {
        let state = self.state();
        let node = &state.nodes[state.node(element)?];
        Ok(node.selected || node.checked)
    }

    async fn in_interactable_bounds(&self, element: &ElementRef) -> Result<Option<bool>> {
        let state = self.state();
        let id = state.node(element)?;
        Ok(Some(state.nodes[id].on_screen))
    }

    async fn is_on_screen(&self, element: &ElementRef) -> Result<Option<bool>> {
        let state = self.state();
        let id = state.node(element)?;
        Ok(Some(state.nodes[id].on_screen))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let mut state = self.state();
        let id = state.node(element)?;
        if let Some(message) = &state.click_error {
            return Err(Error::from_driver_message(message.clone()));
        }
        if let Some(remaining) = state.intercepts.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::from_driver_message(
                    "element click intercepted: Other element would receive the click: <div class=\"overlay\">",
                ));
            }
        }
        if !state.displayed(id) {
            return Err(Error::Driver("element not interactable".into()));
        }

        state.clicks.push(id);
        state.focus = Some(id);
        let tag = state.nodes[id].tag.clone();
        if tag == "option" {
            if let Some(select) = state.ancestor(id, "select") {
                for option in state.descendants(select) {
                    state.nodes[option].selected = false;
                }
            }
            state.nodes[id].selected = true;
        } else if tag == "input"
            && matches!(
                state.nodes[id].attrs.get("type").map(String::as_str),
                Some("checkbox") | Some("radio")
            )
        {
            let checked = state.nodes[id].checked;
            state.nodes[id].checked = !checked;
        }

        let hooks = std::mem::take(&mut state.click_hooks);
        for (node, hook) in &hooks {
            if *node == id {
                hook(&mut *state);
            }
        }
        state.click_hooks = hooks;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        let mut state = self.state();
        let id = state.node(element)?;
        state.nodes[id].value = Some(String::new());
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, keys: &str) -> Result<()> {
        let mut state = self.state();
        let id = state.node(element)?;
        state.keys.push((id, keys.to_string()));
        let node = &mut state.nodes[id];
        if node.attrs.get("type").map(String::as_str) == Some("file") {
            node.value = Some(keys.to_string());
        } else {
            node.value.get_or_insert_with(String::new).push_str(keys);
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        let mut state = self.state();
        let id = state.node(element)?;
        state.scrolls.push(id);
        state.nodes[id].on_screen = true;
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.state();
        state.executed.push(script.to_string());

        let scripts = std::mem::take(&mut state.scripts);
        let handled = State::run_script(&scripts, &mut *state, script, &args);
        state.scripts = scripts;
        if let Some(result) = handled {
            return result;
        }

        if script.contains("document.readyState") {
            Ok(json!("complete"))
        } else if script.contains("window.angular") {
            Ok(json!(0))
        } else if script.contains("document.contentType") {
            Ok(json!("text/html"))
        } else if script.contains("window.open") {
            state.open_window();
            Ok(Value::Null)
        } else if script.contains("getElementById(arguments[0])") {
            let key = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
            let value = args.get(1).and_then(Value::as_str).unwrap_or_default().to_string();
            let target = state.document().into_iter().find(|&n| {
                let attrs = &state.nodes[n].attrs;
                attrs.get("id") == Some(&key) || attrs.get("name") == Some(&key)
            });
            match target {
                Some(n) => {
                    state.nodes[n].value = Some(value);
                    Ok(json!(true))
                }
                None => Ok(json!(false)),
            }
        } else {
            Ok(Value::Null)
        }
    }

    async fn execute_async_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.state();
        state.async_executed.push((script.to_string(), args.clone()));
        let scripts = std::mem::take(&mut state.async_scripts);
        let handled = State::run_script(&scripts, &mut *state, script, &args);
        state.async_scripts = scripts;
        handled.unwrap_or(Ok(Value::Null))
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn back(&self) -> Result<()> {
        self.state().history.push("back");
        Ok(())
    }

    async fn forward(&self) -> Result<()> {
        self.state().history.push("forward");
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.state().history.push("refresh");
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        Ok(self.state().windows.clone())
    }

    async fn current_window(&self) -> Result<Option<String>> {
        Ok(self.state().current_window.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        let mut state = self.state();
        if !state.windows.iter().any(|w| w == handle) {
            return Err(Error::Driver(format!("no such window: {handle}")));
        }
        state.current_window = Some(handle.to_string());
        Ok(())
    }

    async fn close_window(&self) -> Result<()> {
        let mut state = self.state();
        if let Some(current) = state.current_window.take() {
            state.windows.retain(|w| *w != current);
        }
        Ok(())
    }

    async fn window_size(&self) -> Result<WindowSize> {
        Ok(self.state().window_size)
    }

    async fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let mut state = self.state();
        state.window_size = match state.max_window {
            Some(max) => WindowSize::new(size.width.min(max.width), size.height.min(max.height)),
            None => size,
        };
        Ok(())
    }

    async fn alert_text(&self) -> Result<Option<String>> {
        Ok(self.state().alert.clone())
    }

    async fn accept_alert(&self) -> Result<bool> {
        Ok(self.state().alert.take().is_some())
    }

    async fn dismiss_alert(&self) -> Result<bool> {
        Ok(self.state().alert.take().is_some())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.state().cookies.clone())
    }

    async fn delete_all_cookies(&self) -> Result<()> {
        self.state().cookies.clear();
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let mut state = self.state();
        if state.screenshot_fails {
            return Err(Error::Driver("screenshot unavailable".into()));
        }
        state.screenshots += 1;
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn set_timeouts(&self, page_load: Duration, script: Duration) -> Result<()> {
        let mut state = self.state();
        if let Some(message) = &state.timeouts_error {
            return Err(Error::Driver(message.clone()));
        }
        state.timeouts.push((page_load, script));
        Ok(())
    }
}

// =============================================================================
// HTTP
// =============================================================================

#[derive(Default)]
pub struct FakeHttp {
    responses: Mutex<HashMap<String, HttpResponse>>,
    /// URL and Cookie header of every request
    pub requests: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &Url, cookies: &CookieJar) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), cookies.cookie_header(url)));
        self.responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::Http(format!("GET {url} returned 404 Not Found")))
    }
}

// =============================================================================
// Fixture
// =============================================================================

/// Short deadline, files below `files`
pub fn config(files: &Path) -> FixtureConfig {
    FixtureConfig {
        timeout: Duration::from_secs(1),
        files_dir: files.to_path_buf(),
        ..Default::default()
    }
}

pub fn fixture(driver: &Arc<FakeDriver>, files: &Path) -> BrowserFixture {
    BrowserFixture::new(driver.clone(), config(files))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
