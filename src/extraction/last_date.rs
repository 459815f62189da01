//! Application deadline detection.
//!
//! A fixed cascade of strategies runs over the notice text; the first one that
//! yields a normalized date wins.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::dates::{DeadlineWindow, NormalizedDate};
use super::organization::{Organization, OrganizationDirectory};

/// Date token with a 2 or 4 digit year.
const DATE_TOKEN: &str = r"[0-9]{1,2}[-./][0-9]{1,2}[-./][0-9]{2,4}";

/// Phrases that precede a deadline, in priority order.
///
/// Each pattern may match several times; the last match is used because
/// notices usually restate a provisional date before the final one.
static ANCHORED_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let anchored = |prefix: &str| {
        Regex::new(&format!(r"(?i){}.*?({})", prefix, DATE_TOKEN))
            .expect("valid deadline pattern")
    };
    vec![
        ("last date keyword", anchored(r"last\s+date")),
        ("closing date", anchored(r"closing\s+date")),
        ("submit by", anchored(r"submit.*?by")),
        ("application till", anchored(r"application.*?till")),
        ("deadline", anchored("deadline")),
        ("before date", anchored("before")),
        ("within date", anchored("within")),
        (
            "reverse last",
            Regex::new(r"(?i)([0-9]{1,2}[-./][0-9]{1,2}[-./][0-9]{4}).*?last")
                .expect("valid deadline pattern"),
        ),
        ("online application", anchored(r"online\s+application")),
    ]
});

static ANY_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(DATE_TOKEN).expect("valid date pattern"));

static FOUR_DIGIT_YEAR_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{1,2}[-./][0-9]{1,2}[-./][0-9]{4}").expect("valid date pattern")
});

/// Lowercase markers that make a line worth scanning for a date.
const SECTION_MARKERS: &[&str] = &["last date", "closing", "deadline", "till"];

/// Which strategy produced a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineSource {
    /// One of the keyword-anchored patterns, by label.
    Keyword(&'static str),
    SectionScan,
    KnownFallback,
    HeuristicScan,
    NotFound,
}

impl DeadlineSource {
    pub fn label(&self) -> &'static str {
        match self {
            DeadlineSource::Keyword(label) => *label,
            DeadlineSource::SectionScan => "section scan",
            DeadlineSource::KnownFallback => "known fallback",
            DeadlineSource::HeuristicScan => "heuristic scan",
            DeadlineSource::NotFound => "not found",
        }
    }
}

impl fmt::Display for DeadlineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DeadlineSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Inputs shared by every strategy.
pub struct DeadlineContext<'a> {
    pub text: &'a str,
    pub organization: &'a Organization,
    pub today: NaiveDate,
}

/// One step of the deadline cascade.
pub trait DeadlineStrategy: Send + Sync {
    fn source(&self) -> DeadlineSource;

    fn attempt(&self, ctx: &DeadlineContext<'_>) -> Option<NormalizedDate>;
}

/// Keyword-anchored regex; the last match in document order is normalized.
pub struct AnchoredPattern {
    label: &'static str,
    regex: &'static Regex,
    window: DeadlineWindow,
}

impl DeadlineStrategy for AnchoredPattern {
    fn source(&self) -> DeadlineSource {
        DeadlineSource::Keyword(self.label)
    }

    fn attempt(&self, ctx: &DeadlineContext<'_>) -> Option<NormalizedDate> {
        let last = self
            .regex
            .captures_iter(ctx.text)
            .filter_map(|caps| caps.get(1))
            .last()?;
        self.window.normalize(last.as_str())
    }
}

/// Line scan: first date on any line mentioning a deadline marker.
pub struct SectionScan {
    window: DeadlineWindow,
}

impl SectionScan {
    pub fn new(window: DeadlineWindow) -> Self {
        Self { window }
    }
}

impl DeadlineStrategy for SectionScan {
    fn source(&self) -> DeadlineSource {
        DeadlineSource::SectionScan
    }

    fn attempt(&self, ctx: &DeadlineContext<'_>) -> Option<NormalizedDate> {
        ctx.text
            .lines()
            .filter(|line| {
                let lower = line.to_lowercase();
                SECTION_MARKERS.iter().any(|marker| lower.contains(marker))
            })
            .filter_map(|line| ANY_DATE.find(line))
            .find_map(|token| self.window.normalize(token.as_str()))
    }
}

/// Statically configured deadline for the resolved organization.
pub struct KnownDeadline {
    directory: Arc<OrganizationDirectory>,
}

impl KnownDeadline {
    pub fn new(directory: Arc<OrganizationDirectory>) -> Self {
        Self { directory }
    }
}

impl DeadlineStrategy for KnownDeadline {
    fn source(&self) -> DeadlineSource {
        DeadlineSource::KnownFallback
    }

    fn attempt(&self, ctx: &DeadlineContext<'_>) -> Option<NormalizedDate> {
        self.directory.known_deadline(ctx.organization)
    }
}

/// Any date in the text that looks like an upcoming deadline.
pub struct FutureDateScan {
    window: DeadlineWindow,
}

impl FutureDateScan {
    pub fn new(window: DeadlineWindow) -> Self {
        Self { window }
    }
}

impl DeadlineStrategy for FutureDateScan {
    fn source(&self) -> DeadlineSource {
        DeadlineSource::HeuristicScan
    }

    fn attempt(&self, ctx: &DeadlineContext<'_>) -> Option<NormalizedDate> {
        FOUR_DIGIT_YEAR_DATE
            .find_iter(ctx.text)
            .filter_map(|token| self.window.normalize(token.as_str()))
            .find(|date| self.window.is_plausible_deadline(date, ctx.today))
    }
}

/// Detected deadline plus the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineOutcome {
    pub date: Option<NormalizedDate>,
    pub source: DeadlineSource,
}

impl DeadlineOutcome {
    pub fn not_found() -> Self {
        Self {
            date: None,
            source: DeadlineSource::NotFound,
        }
    }

    /// Canonical date string, empty when nothing was found.
    pub fn date_string(&self) -> String {
        self.date.map(|d| d.to_string()).unwrap_or_default()
    }
}

pub struct LastDateExtractor {
    strategies: Vec<Box<dyn DeadlineStrategy>>,
}

impl LastDateExtractor {
    /// The standard cascade: anchored patterns, line scan, known deadline, future-date scan.
    pub fn new(directory: Arc<OrganizationDirectory>, window: DeadlineWindow) -> Self {
        let mut strategies: Vec<Box<dyn DeadlineStrategy>> = ANCHORED_PATTERNS
            .iter()
            .map(|(label, regex)| {
                Box::new(AnchoredPattern {
                    label: *label,
                    regex,
                    window: window.clone(),
                }) as Box<dyn DeadlineStrategy>
            })
            .collect();
        strategies.push(Box::new(SectionScan::new(window.clone())));
        strategies.push(Box::new(KnownDeadline::new(directory)));
        strategies.push(Box::new(FutureDateScan::new(window)));
        Self::with_strategies(strategies)
    }

    /// A cascade of arbitrary strategies, tried in order.
    pub fn with_strategies(strategies: Vec<Box<dyn DeadlineStrategy>>) -> Self {
        Self { strategies }
    }

    #[cfg(test)]
    pub fn sources(&self) -> Vec<DeadlineSource> {
        self.strategies.iter().map(|s| s.source()).collect()
    }

    pub fn extract(&self, text: &str, organization: &Organization) -> DeadlineOutcome {
        self.extract_on(text, organization, Local::now().date_naive())
    }

    /// Runs the cascade as if the current day were `today`.
    pub fn extract_on(
        &self,
        text: &str,
        organization: &Organization,
        today: NaiveDate,
    ) -> DeadlineOutcome {
        let ctx = DeadlineContext {
            text,
            organization,
            today,
        };

        for strategy in &self.strategies {
            if let Some(date) = strategy.attempt(&ctx) {
                debug!(source = %strategy.source(), %date, "deadline strategy matched");
                return DeadlineOutcome {
                    date: Some(date),
                    source: strategy.source(),
                };
            }
        }

        DeadlineOutcome::not_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::organization::OrganizationId;

    fn extractor() -> LastDateExtractor {
        LastDateExtractor::new(
            Arc::new(OrganizationDirectory::default()),
            DeadlineWindow::default(),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    fn run(text: &str, organization: Organization) -> DeadlineOutcome {
        extractor().extract_on(text, &organization, today())
    }

    #[test]
    fn cascade_order_is_fixed() {
        let sources = extractor().sources();
        assert_eq!(sources.first(), Some(&DeadlineSource::Keyword("last date keyword")));
        assert_eq!(
            &sources[sources.len() - 3..],
            &[
                DeadlineSource::SectionScan,
                DeadlineSource::KnownFallback,
                DeadlineSource::HeuristicScan
            ]
        );
    }

    #[test]
    fn keyword_beats_earlier_unrelated_date() {
        let text = "Notice dated 20-01-2025 regarding recruitment.\nLast date: 01-05-2025";
        let outcome = run(text, Organization::Unknown);
        assert_eq!(outcome.date_string(), "01-05-2025");
        assert_eq!(outcome.source, DeadlineSource::Keyword("last date keyword"));
    }

    #[test]
    fn last_occurrence_of_a_pattern_wins() {
        let text = "Last date 10-02-2025 (provisional)\nRevised last date 28/02/2025";
        let outcome = run(text, Organization::Unknown);
        assert_eq!(outcome.date_string(), "28-02-2025");
    }

    #[test]
    fn invalid_keyword_match_falls_to_next_pattern() {
        let text = "Last date 01-05-2019\nClosing date 15.03.2025";
        let outcome = run(text, Organization::Unknown);
        assert_eq!(outcome.date_string(), "15-03-2025");
        assert_eq!(outcome.source, DeadlineSource::Keyword("closing date"));
    }

    #[test]
    fn reverse_form_reads_date_before_keyword() {
        let text = "Applications received up to 12-03-2025 will be the last considered";
        let outcome = run(text, Organization::Unknown);
        assert_eq!(outcome.date_string(), "12-03-2025");
        assert_eq!(outcome.source, DeadlineSource::Keyword("reverse last"));
    }

    #[test]
    fn section_scan_catches_split_phrases() {
        let strategy = SectionScan::new(DeadlineWindow::default());
        let organization = Organization::Unknown;
        let ctx = DeadlineContext {
            text: "Header\nApplications open till 5/4/25 only\n",
            organization: &organization,
            today: today(),
        };
        assert_eq!(strategy.attempt(&ctx).map(|d| d.to_string()), Some("05-04-2025".into()));
    }

    #[test]
    fn known_fallback_when_text_has_no_deadline() {
        let outcome = run(
            "Recruitment of trainees. Details on the website.",
            Organization::Known(OrganizationId::Tanuvas),
        );
        assert_eq!(outcome.date_string(), "15-02-2025");
        assert_eq!(outcome.source, DeadlineSource::KnownFallback);
    }

    #[test]
    fn heuristic_scan_picks_first_future_date() {
        let text = "Published 02-01-2025. Interview on 20-02-2025 and joining 01-03-2025.";
        let outcome = run(text, Organization::Unknown);
        assert_eq!(outcome.date_string(), "20-02-2025");
        assert_eq!(outcome.source, DeadlineSource::HeuristicScan);
    }

    #[test]
    fn nothing_found() {
        let outcome = run("Plain text without any dates.", Organization::Unknown);
        assert_eq!(outcome, DeadlineOutcome::not_found());
        assert_eq!(outcome.date_string(), "");
        assert_eq!(outcome.source.label(), "not found");
    }

    #[test]
    fn custom_cascade_is_honoured() {
        let extractor = LastDateExtractor::with_strategies(vec![Box::new(FutureDateScan::new(
            DeadlineWindow::default(),
        ))]);
        let outcome = extractor.extract_on(
            "Last date: 01-05-2025",
            &Organization::Unknown,
            today(),
        );
        assert_eq!(outcome.source, DeadlineSource::HeuristicScan);
    }
}
