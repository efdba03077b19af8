//! Element Resolver
//!
//! Maps a human-readable place ("Save", "First name") to a concrete element by
//! trying a fixed cascade of lookup strategies. Active framework adapters get
//! the first say. For click-like intents a candidate is only accepted once it
//! passes the [`VisibilityGate`]; when none does, the first candidate found at
//! all is used, so an element that merely needs scrolling still gets clicked.

use std::sync::Arc;

use crate::driver::{Driver, ElementRef};
use crate::error::Result;
use crate::locator::{Locator, TextMatch, TextQuery, TextScope};
use crate::reactive::FrameworkAdapter;
use crate::visibility::VisibilityGate;

/// What the caller is about to do with the element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Click,
    Enter,
    Select,
    Read,
    Clear,
    /// Visibility checks and scrolling; resolved like a click target
    Visibility,
    /// Link whose target will be fetched
    Download,
}

impl Intent {
    /// Candidates must pass the visibility gate to be accepted outright
    fn requires_interactable(self) -> bool {
        matches!(self, Intent::Click | Intent::Visibility)
    }
}

/// One step of the click cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    LinkText,
    Place,
    PartialLinkText,
    PartialPlace,
    OnClickOwnText,
    OnClickOwnTextPartial,
    OnClickDescendantText,
    OnClickDescendantTextPartial,
    OwnText,
    OwnTextPartial,
    DescendantText,
    DescendantTextPartial,
}

/// Click strategies in the order they are tried
pub const CLICK_CASCADE: [ClickStrategy; 12] = [
    ClickStrategy::LinkText,
    ClickStrategy::Place,
    ClickStrategy::PartialLinkText,
    ClickStrategy::PartialPlace,
    ClickStrategy::OnClickOwnText,
    ClickStrategy::OnClickOwnTextPartial,
    ClickStrategy::OnClickDescendantText,
    ClickStrategy::OnClickDescendantTextPartial,
    ClickStrategy::OwnText,
    ClickStrategy::OwnTextPartial,
    ClickStrategy::DescendantText,
    ClickStrategy::DescendantTextPartial,
];

impl ClickStrategy {
    pub fn locator(self, place: &str) -> Locator {
        use ClickStrategy::*;
        let text = |matching, scope| TextQuery::new(place, matching, scope);
        match self {
            LinkText => Locator::LinkText(place.to_string()),
            Place => Locator::place(place),
            PartialLinkText => Locator::PartialLinkText(place.to_string()),
            PartialPlace => Locator::partial_place(place),
            OnClickOwnText => Locator::Text(text(TextMatch::Exact, TextScope::Own).with_onclick()),
            OnClickOwnTextPartial => {
                Locator::Text(text(TextMatch::Contains, TextScope::Own).with_onclick())
            }
            OnClickDescendantText => {
                Locator::Text(text(TextMatch::Exact, TextScope::Descendant).with_onclick())
            }
            OnClickDescendantTextPartial => {
                Locator::Text(text(TextMatch::Contains, TextScope::Descendant).with_onclick())
            }
            OwnText => Locator::Text(text(TextMatch::Exact, TextScope::Own)),
            OwnTextPartial => Locator::Text(text(TextMatch::Contains, TextScope::Own)),
            DescendantText => Locator::Text(text(TextMatch::Exact, TextScope::Descendant)),
            DescendantTextPartial => Locator::Text(text(TextMatch::Contains, TextScope::Descendant)),
        }
    }
}

/// One strategy tried while resolving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionStep {
    pub strategy: String,
    pub candidate: Option<ElementRef>,
}

/// Trace of one resolution, kept for diagnostics
#[derive(Debug, Clone, Default)]
pub struct ResolutionAttempt {
    steps: Vec<ResolutionStep>,
    first_found: Option<ElementRef>,
    accepted: Option<ElementRef>,
}

impl ResolutionAttempt {
    fn record(&mut self, strategy: String, candidate: Option<ElementRef>) {
        if self.first_found.is_none() {
            self.first_found.clone_from(&candidate);
        }
        self.steps.push(ResolutionStep {
            strategy,
            candidate,
        });
    }

    /// Strategies tried, in order
    pub fn steps(&self) -> &[ResolutionStep] {
        &self.steps
    }

    /// First non-empty candidate of any strategy
    pub fn first_found(&self) -> Option<&ElementRef> {
        self.first_found.as_ref()
    }

    /// The element to act on: the accepted candidate, else the first found
    pub fn element(&self) -> Option<&ElementRef> {
        self.accepted.as_ref().or(self.first_found.as_ref())
    }

    pub fn into_element(self) -> Option<ElementRef> {
        self.accepted.or(self.first_found)
    }
}

pub struct ElementResolver<'a> {
    driver: &'a dyn Driver,
    gate: &'a VisibilityGate<'a>,
    adapters: &'a [Arc<dyn FrameworkAdapter>],
}

impl<'a> ElementResolver<'a> {
    /// `adapters` should hold only the adapters active on the current page
    pub fn new(
        driver: &'a dyn Driver,
        gate: &'a VisibilityGate<'a>,
        adapters: &'a [Arc<dyn FrameworkAdapter>],
    ) -> Self {
        Self {
            driver,
            gate,
            adapters,
        }
    }

    /// Run the cascade for `intent` and stop at the first accepted candidate
    pub async fn resolve(&self, intent: Intent, place: &str) -> Result<ResolutionAttempt> {
        let mut attempt = ResolutionAttempt::default();
        let gated = intent.requires_interactable();

        for adapter in self.adapters {
            let candidate = adapter.locate(self.driver, intent, place).await?;
            if self
                .accept(&mut attempt, adapter.name().to_string(), candidate, gated)
                .await?
            {
                return Ok(attempt);
            }
        }

        for locator in generic_strategies(intent, place) {
            let candidate = self.driver.find_element(&locator, None).await?;
            if self
                .accept(&mut attempt, locator.to_string(), candidate, gated)
                .await?
            {
                return Ok(attempt);
            }
        }

        if attempt.first_found.is_some() {
            tracing::debug!(
                "no interactable match for '{}', using first found",
                place
            );
        }
        Ok(attempt)
    }

    async fn accept(
        &self,
        attempt: &mut ResolutionAttempt,
        strategy: String,
        candidate: Option<ElementRef>,
        gated: bool,
    ) -> Result<bool> {
        tracing::debug!(
            "{} -> {}",
            strategy,
            candidate.as_ref().map_or("nothing", |el| el.id())
        );
        attempt.record(strategy, candidate.clone());
        let Some(element) = candidate else {
            return Ok(false);
        };
        if gated && !self.gate.is_interactable(&element).await? {
            return Ok(false);
        }
        attempt.accepted = Some(element);
        Ok(true)
    }
}

fn generic_strategies(intent: Intent, place: &str) -> Vec<Locator> {
    match intent {
        Intent::Click | Intent::Visibility => CLICK_CASCADE
            .iter()
            .map(|strategy| strategy.locator(place))
            .collect(),
        Intent::Download => vec![
            Locator::LinkText(place.to_string()),
            Locator::PartialLinkText(place.to_string()),
            Locator::Id(place.to_string()),
            Locator::Name(place.to_string()),
        ],
        Intent::Enter | Intent::Select | Intent::Read | Intent::Clear => {
            vec![Locator::place(place)]
        }
    }
}
