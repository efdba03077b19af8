//! Table Addressing
//!
//! Positional lookups of cells by header text or by the value in another
//! column. Nothing is materialized: a [`TableQuery`] is a structural query the
//! driver evaluates against the live page each time it is polled, so header
//! renames or reordering between polls are picked up.

use crate::locator::xpath_literal;

/// Which column of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    /// 1-based position
    Number(usize),
    /// Column whose header (`th`) text equals the value
    Header(String),
}

/// Which row of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelector {
    /// 1-based position among rows that have at least one `td`
    Number(usize),
    /// Row whose cell under `column` has normalized text equal to `value`
    WhereIs { column: String, value: String },
}

/// Filter applied to elements inside a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellFilter {
    /// Own normalized text contains the value
    TextContains(String),
    /// Attribute value contains the value
    AttributeContains { name: String, value: String },
}

/// Element searched for inside the selected cell(s)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Within {
    /// Tag name; any element when `None`
    pub tag: Option<String>,
    pub filter: Option<CellFilter>,
}

/// A cell, or an element inside one, addressed structurally
///
/// Without a column the query covers every cell of the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub row: RowSelector,
    pub column: Option<ColumnSelector>,
    pub within: Option<Within>,
}

impl TableQuery {
    /// The cells of a row
    pub fn row(row: RowSelector) -> Self {
        Self {
            row,
            column: None,
            within: None,
        }
    }

    /// One cell
    pub fn cell(row: RowSelector, column: ColumnSelector) -> Self {
        Self {
            row,
            column: Some(column),
            within: None,
        }
    }

    /// Descend into the addressed cell(s)
    pub fn within(mut self, tag: Option<&str>, filter: Option<CellFilter>) -> Self {
        self.within = Some(Within {
            tag: tag.map(str::to_string),
            filter,
        });
        self
    }

    /// Render as XPath 1.0
    pub fn to_xpath(&self) -> String {
        let mut xpath = match &self.row {
            RowSelector::Number(n) => format!("(//tr[boolean(td)])[{n}]/td"),
            RowSelector::WhereIs { column, value } => row_selector(column, value),
        };
        match &self.column {
            Some(ColumnSelector::Number(n)) => xpath.push_str(&format!("[{n}]")),
            Some(ColumnSelector::Header(header)) => {
                xpath.push_str(&format!("[{}]", column_index_expression(header)))
            }
            None => {}
        }
        if let Some(within) = &self.within {
            xpath.push_str("//");
            xpath.push_str(within.tag.as_deref().unwrap_or("*"));
            match &within.filter {
                Some(CellFilter::TextContains(text)) => xpath.push_str(&format!(
                    "[contains(normalize-space(text()),{})]",
                    xpath_literal(text)
                )),
                Some(CellFilter::AttributeContains { name, value }) => {
                    xpath.push_str(&format!("[contains(@{name}, {})]", xpath_literal(value)))
                }
                None => {}
            }
        }
        xpath
    }
}

/// Expression evaluating, for a cell, to the 1-based index of the column headed `header`
///
/// Counts the header cells preceding the first `th` whose normalized text equals
/// `header` within the nearest enclosing table, plus one. A missing header
/// counts zero, addressing the first column.
pub fn column_index_expression(header: &str) -> String {
    format!(
        "count(ancestor::table[1]//tr/th/descendant-or-self::text()[normalize-space(.)={}]/ancestor-or-self::th[1]/preceding-sibling::th)+1",
        xpath_literal(header)
    )
}

/// Expression selecting the cells of the row whose `column` cell equals `value`
pub fn row_selector(column: &str, value: &str) -> String {
    format!(
        "//tr[td[{}]/descendant-or-self::text()[normalize-space(.)={}]]/td",
        column_index_expression(column),
        xpath_literal(value)
    )
}
