//! Grouping of per-document results into the fixed five-organization report.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::organization::{Organization, OrganizationDirectory, OrganizationId};
use super::record::{OrganizationResult, PlaceholderReason};

/// One entry per required organization, in canonical order, followed by
/// results attributed to any other organization.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSet {
    entries: Vec<OrganizationResult>,
    additional: Vec<OrganizationResult>,
}

impl ReportSet {
    /// The required organizations, always `OrganizationId::REQUIRED.len()` long.
    pub fn entries(&self) -> &[OrganizationResult] {
        &self.entries
    }

    pub fn additional(&self) -> &[OrganizationResult] {
        &self.additional
    }

    /// Every result in sheet order.
    pub fn sheets(&self) -> impl Iterator<Item = &OrganizationResult> {
        self.entries.iter().chain(self.additional.iter())
    }

    pub fn total_positions(&self) -> usize {
        self.sheets().map(|r| r.total_positions).sum()
    }
}

pub struct ReportAssembler {
    directory: Arc<OrganizationDirectory>,
}

impl ReportAssembler {
    pub fn new(directory: Arc<OrganizationDirectory>) -> Self {
        Self { directory }
    }

    pub fn assemble(&self, results: Vec<OrganizationResult>) -> ReportSet {
        let mut buckets: Vec<Vec<OrganizationResult>> = vec![Vec::new(); OrganizationId::REQUIRED.len()];
        let mut additional: Vec<OrganizationResult> = Vec::new();

        for result in results {
            let slot = result
                .organization
                .known_id()
                .and_then(|id| OrganizationId::REQUIRED.iter().position(|r| *r == id));
            match slot {
                Some(index) => buckets[index].push(result),
                None => match additional
                    .iter_mut()
                    .find(|existing| existing.organization == result.organization)
                {
                    Some(existing) => merge_into(existing, result),
                    None => additional.push(result),
                },
            }
        }

        let reason = if additional.is_empty() {
            PlaceholderReason::NotUploaded
        } else {
            PlaceholderReason::Unattributed
        };

        let entries = OrganizationId::REQUIRED
            .into_iter()
            .zip(buckets)
            .map(|(id, bucket)| {
                let mut bucket = bucket.into_iter();
                match bucket.next() {
                    Some(mut first) => {
                        for other in bucket {
                            merge_into(&mut first, other);
                        }
                        first
                    }
                    None => {
                        warn!(organization = %id, ?reason, "Adding missing organization");
                        let last_date = self
                            .directory
                            .known_deadline(&Organization::Known(id))
                            .map(|d| d.to_string())
                            .unwrap_or_default();
                        OrganizationResult::missing(id, last_date, reason)
                    }
                }
            })
            .collect();

        let report = ReportSet {
            entries,
            additional,
        };
        info!(
            sheets = report.sheets().count(),
            total_positions = report.total_positions(),
            "Report assembled"
        );
        report
    }
}

/// Appends `other`'s positions to `target` and recomputes coverage.
///
/// The detected deadline and its source stay those of the first document.
fn merge_into(target: &mut OrganizationResult, other: OrganizationResult) {
    let auto_last_date = std::mem::take(&mut target.extraction_quality.auto_last_date);
    let date_source = std::mem::take(&mut target.extraction_quality.date_source);
    let mut positions = std::mem::take(&mut target.positions);
    positions.extend(other.positions);

    *target = OrganizationResult::new(
        target.organization.clone(),
        positions,
        &auto_last_date,
        &date_source,
    );
}
