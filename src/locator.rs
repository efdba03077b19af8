//! Locators
//!
//! Selector kinds the engine hands to the [`Driver`](crate::Driver). Text and
//! table lookups are structured values rather than pre-baked strings so any
//! backend can evaluate them natively; [`Locator::to_xpath`] renders the
//! equivalent XPath 1.0 for backends that only speak XPath.

use std::fmt;

use serde_json::Value;

use crate::table::TableQuery;

/// Text matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMatch {
    /// Whitespace-normalized text equals the needle
    #[default]
    Exact,
    /// Whitespace-normalized text contains the needle
    Contains,
}

/// Which text of an element is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextScope {
    /// The element's own text nodes
    #[default]
    Own,
    /// Text anywhere below the element
    Descendant,
}

/// Find elements by their text
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub text: String,
    pub matching: TextMatch,
    pub scope: TextScope,
    /// Restrict to one tag name; any element when `None`
    pub tag: Option<String>,
    /// Only elements carrying an `onclick` attribute
    pub with_onclick: bool,
}

impl TextQuery {
    pub fn new(text: impl Into<String>, matching: TextMatch, scope: TextScope) -> Self {
        Self {
            text: text.into(),
            matching,
            scope,
            tag: None,
            with_onclick: false,
        }
    }

    /// Restrict to a tag name
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Require an explicit click handler
    pub fn with_onclick(mut self) -> Self {
        self.with_onclick = true;
        self
    }

    /// Render as XPath; `relative` starts the path at the scope element
    pub fn to_xpath(&self, relative: bool) -> String {
        let axis = if relative { ".//" } else { "//" };
        let tag = self.tag.as_deref().unwrap_or("*");
        let text = match self.scope {
            TextScope::Own => "text()",
            TextScope::Descendant => "descendant::text()",
        };
        let literal = xpath_literal(&self.text);
        let predicate = match self.matching {
            TextMatch::Exact => format!("normalize-space({text})={literal}"),
            TextMatch::Contains => format!("contains(normalize-space({text}),{literal})"),
        };
        if self.with_onclick {
            format!("{axis}{tag}[@onclick and {predicate}]")
        } else {
            format!("{axis}{tag}[{predicate}]")
        }
    }
}

/// How to find an element
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    Id(String),
    Name(String),
    TagName(String),
    ClassName(String),
    Css(String),
    XPath(String),
    /// Anchor whose text equals the value
    LinkText(String),
    /// Anchor whose text contains the value
    PartialLinkText(String),
    /// Semantic lookup of a human place name: id, name, placeholder,
    /// aria-label or associated label text
    Place { place: String, exact: bool },
    Text(TextQuery),
    Table(TableQuery),
    /// Script returning an element or array of elements
    Script { source: String, args: Vec<Value> },
}

impl Locator {
    /// Exact semantic lookup of a place
    pub fn place(place: impl Into<String>) -> Self {
        Self::Place {
            place: place.into(),
            exact: true,
        }
    }

    /// Partial semantic lookup of a place
    pub fn partial_place(place: impl Into<String>) -> Self {
        Self::Place {
            place: place.into(),
            exact: false,
        }
    }

    /// Script lookup
    pub fn script(source: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Script {
            source: source.into(),
            args,
        }
    }

    /// XPath equivalent, `None` for CSS and script locators
    ///
    /// Scoped lookups should prefix the result with `.`.
    pub fn to_xpath(&self) -> Option<String> {
        let xpath = match self {
            Locator::Id(id) => format!("//*[@id={}]", xpath_literal(id)),
            Locator::Name(name) => format!("//*[@name={}]", xpath_literal(name)),
            Locator::TagName(tag) => format!("//{tag}"),
            Locator::ClassName(class) => format!(
                "//*[contains(concat(' ', normalize-space(@class), ' '), {})]",
                xpath_literal(&format!(" {class} "))
            ),
            Locator::XPath(xpath) => xpath.clone(),
            Locator::LinkText(text) => {
                format!("//a[normalize-space(.)={}]", xpath_literal(text))
            }
            Locator::PartialLinkText(text) => {
                format!("//a[contains(normalize-space(.),{})]", xpath_literal(text))
            }
            Locator::Place { place, exact } => place_xpath(place, *exact),
            Locator::Text(query) => query.to_xpath(false),
            Locator::Table(query) => query.to_xpath(),
            Locator::Css(_) | Locator::Script { .. } => return None,
        };
        Some(xpath)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id '{v}'"),
            Locator::Name(v) => write!(f, "name '{v}'"),
            Locator::TagName(v) => write!(f, "tag '{v}'"),
            Locator::ClassName(v) => write!(f, "class '{v}'"),
            Locator::Css(v) => write!(f, "css '{v}'"),
            Locator::XPath(v) => write!(f, "xpath '{v}'"),
            Locator::LinkText(v) => write!(f, "link text '{v}'"),
            Locator::PartialLinkText(v) => write!(f, "partial link text '{v}'"),
            Locator::Place { place, exact: true } => write!(f, "place '{place}'"),
            Locator::Place { place, exact: false } => write!(f, "partial place '{place}'"),
            Locator::Text(q) => write!(f, "text {}", q.to_xpath(false)),
            Locator::Table(q) => write!(f, "table {}", q.to_xpath()),
            Locator::Script { .. } => write!(f, "script"),
        }
    }
}

fn place_xpath(place: &str, exact: bool) -> String {
    let lit = xpath_literal(place);
    let eq = |expr: &str| {
        if exact {
            format!("{expr}={lit}")
        } else {
            format!("contains({expr},{lit})")
        }
    };
    format!(
        "//*[{id} or {name} or {placeholder} or {aria} or @id=//label[{label}]/@for] \
         | //label[{label}]//*[self::input or self::select or self::textarea]",
        id = eq("@id"),
        name = eq("@name"),
        placeholder = eq("@placeholder"),
        aria = eq("@aria-label"),
        label = eq("normalize-space(.)"),
    )
}

/// Quote a string as an XPath 1.0 literal
///
/// XPath has no escape syntax, so values holding both quote kinds are
/// assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
