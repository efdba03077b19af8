//! Table row operations
//!
//! Rows are numbered from 1 among rows that have data cells, or picked by the
//! value in another column.

use super::{BrowserFixture, Step};
use crate::driver::ElementRef;
use crate::error::Result;
use crate::locator::Locator;
use crate::table::{CellFilter, ColumnSelector, RowSelector, TableQuery};

fn where_is(column: &str, value: &str) -> RowSelector {
    RowSelector::WhereIs {
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Clickable things in a row: input by value, element by text, element by title
fn click_targets(row: &RowSelector, place: &str) -> Vec<TableQuery> {
    let cells = || TableQuery::row(row.clone());
    vec![
        cells().within(
            Some("input"),
            Some(CellFilter::AttributeContains {
                name: "value".into(),
                value: place.into(),
            }),
        ),
        cells().within(None, Some(CellFilter::TextContains(place.into()))),
        cells().within(
            None,
            Some(CellFilter::AttributeContains {
                name: "title".into(),
                value: place.into(),
            }),
        ),
    ]
}

/// Links in a row: by text, in the column headed `place`, by title
fn download_links(row: &RowSelector, place: &str) -> Vec<TableQuery> {
    vec![
        TableQuery::row(row.clone()).within(Some("a"), Some(CellFilter::TextContains(place.into()))),
        TableQuery::cell(row.clone(), ColumnSelector::Header(place.into())).within(Some("a"), None),
        TableQuery::row(row.clone()).within(
            Some("a"),
            Some(CellFilter::AttributeContains {
                name: "title".into(),
                value: place.into(),
            }),
        ),
    ]
}

impl BrowserFixture {
    // =========================================================================
    // Reading
    // =========================================================================

    pub async fn value_of_column_number_in_row_number(
        &self,
        column: usize,
        row: usize,
    ) -> Result<Option<String>> {
        let cell = TableQuery::cell(RowSelector::Number(row), ColumnSelector::Number(column));
        self.text_of(Locator::Table(cell)).await
    }

    /// Text of the cell under header `column` in data row `row`
    pub async fn value_of_in_row_number(&self, column: &str, row: usize) -> Result<Option<String>> {
        let cell = TableQuery::cell(RowSelector::Number(row), ColumnSelector::Header(column.into()));
        self.text_of(Locator::Table(cell)).await
    }

    /// Text of the cell under `column` in the row whose `selector_column` is `selector_value`
    pub async fn value_of_in_row_where_is(
        &self,
        column: &str,
        selector_column: &str,
        selector_value: &str,
    ) -> Result<Option<String>> {
        let cell = TableQuery::cell(
            where_is(selector_column, selector_value),
            ColumnSelector::Header(column.into()),
        );
        self.text_of(Locator::Table(cell)).await
    }

    pub async fn row_exists_where_is(&self, column: &str, value: &str) -> Result<bool> {
        self.guarded(async {
            let row = Locator::Table(TableQuery::row(where_is(column, value)));
            let found = self
                .wait_until_or_none(|| async {
                    Ok(self.driver.find_element(&row, None).await?.map(|_| true))
                })
                .await?;
            Ok(found.unwrap_or(false))
        })
        .await
    }

    // =========================================================================
    // Acting
    // =========================================================================

    /// Replace the input (or textarea) under `column` in the row whose `selector_column` is `selector_value`
    pub async fn enter_as_in_row_where_is(
        &self,
        value: &str,
        column: &str,
        selector_column: &str,
        selector_value: &str,
    ) -> Result<bool> {
        self.guarded(async {
            let cell = TableQuery::cell(
                where_is(selector_column, selector_value),
                ColumnSelector::Header(column.into()),
            );
            let targets = [
                cell.clone().within(Some("input"), None),
                cell.within(Some("textarea"), None),
            ];
            let entered = self
                .interact(|| async {
                    let Some(element) = self.first_in_table(&targets).await? else {
                        return Ok(Step::Missing);
                    };
                    if !self.gate().is_interactable(&element).await? {
                        return Ok(Step::Pending);
                    }
                    self.driver.clear(&element).await?;
                    self.send_value(&element, value).await?;
                    Ok(Step::Done(true))
                })
                .await?;
            Ok(entered.unwrap_or(false))
        })
        .await
    }

    pub async fn click_in_row_number(&self, place: &str, row: usize) -> Result<bool> {
        self.click_in_row(RowSelector::Number(row), place).await
    }

    pub async fn click_in_row_where_is(&self, place: &str, column: &str, value: &str) -> Result<bool> {
        self.click_in_row(where_is(column, value), place).await
    }

    async fn click_in_row(&self, row: RowSelector, place: &str) -> Result<bool> {
        self.guarded(async {
            let targets = click_targets(&row, place);
            let clicked = self
                .interact(|| async {
                    let Some(element) = self.first_in_table(&targets).await? else {
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

    pub async fn download_from_row_number(&self, place: &str, row: usize) -> Result<Option<String>> {
        self.download_from_row(RowSelector::Number(row), place).await
    }

    pub async fn download_from_row_where_is(
        &self,
        place: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<String>> {
        self.download_from_row(where_is(column, value), place).await
    }

    async fn download_from_row(&self, row: RowSelector, place: &str) -> Result<Option<String>> {
        self.guarded(async {
            let links = download_links(&row, place);
            self.interact(|| async {
                match self.first_in_table(&links).await? {
                    Some(link) => Ok(Step::Done(self.download_link_target(&link).await?)),
                    None => Ok(Step::Missing),
                }
            })
            .await
        })
        .await
    }

    /// First element matched by any of `queries`, tried in order
    async fn first_in_table(&self, queries: &[TableQuery]) -> Result<Option<ElementRef>> {
        for query in queries {
            let locator = Locator::Table(query.clone());
            if let Some(element) = self.driver.find_element(&locator, None).await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}
