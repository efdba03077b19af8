//! Visibility Gate
//!
//! Decides whether a resolved element can be acted on, and brings it into the
//! viewport when it cannot yet be seen.

use std::time::Duration;

use crate::driver::{Driver, ElementRef};
use crate::error::Result;

pub struct VisibilityGate<'a> {
    driver: &'a dyn Driver,
    settle: Duration,
}

impl<'a> VisibilityGate<'a> {
    /// `settle` is waited after every scroll so smooth scrolling can finish
    pub fn new(driver: &'a dyn Driver, settle: Duration) -> Self {
        Self { driver, settle }
    }

    /// Displayed, enabled and within interactable bounds
    ///
    /// Backends that cannot judge bounds are trusted.
    pub async fn is_interactable(&self, element: &ElementRef) -> Result<bool> {
        if !self.driver.is_displayed(element).await? {
            return Ok(false);
        }
        if !self.driver.is_enabled(element).await? {
            return Ok(false);
        }
        Ok(self
            .driver
            .in_interactable_bounds(element)
            .await?
            .unwrap_or(true))
    }

    /// Displayed and inside the viewport
    pub async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.driver.is_displayed(element).await? && self.is_on_screen(element).await?)
    }

    /// Inside the viewport; undeterminable counts as on screen
    pub async fn is_on_screen(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.driver.is_on_screen(element).await?.unwrap_or(true))
    }

    /// Scroll to the element unless it is already displayed on screen
    pub async fn scroll_into_view_if_needed(&self, element: &ElementRef) -> Result<()> {
        if !self.driver.is_displayed(element).await? || !self.is_on_screen(element).await? {
            self.scroll_to(element).await?;
        }
        Ok(())
    }

    /// Scroll to the element and wait for the page to settle
    pub async fn scroll_to(&self, element: &ElementRef) -> Result<()> {
        self.driver.scroll_into_view(element).await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        Ok(())
    }
}
