use serde::Serialize;
use serde_json::{Map, Value};

use super::organization::{Organization, OrganizationId};

/// Output keys every extracted posting carries, in column order.
pub const FIELD_NAMES: [&str; 14] = [
    "advertisement_number",
    "advertisement_date",
    "post_name",
    "vacancies",
    "last_date",
    "salary",
    "location",
    "age_limit",
    "category",
    "qualification",
    "mandatory",
    "specialization",
    "experience_years",
    "remarks",
];

/// Value written into every field of a document that needs a human to read it.
pub const MANUAL_REVIEW_MARKER: &str = "CHECK PDF MANUALLY";

/// One job posting. All fields are always present; unknown values are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionRecord {
    pub advertisement_number: String,
    pub advertisement_date: String,
    pub post_name: String,
    pub vacancies: String,
    pub last_date: String,
    pub salary: String,
    pub location: String,
    pub age_limit: String,
    pub category: String,
    pub qualification: String,
    pub mandatory: String,
    pub specialization: String,
    pub experience_years: String,
    pub remarks: String,
}

impl ExtractionRecord {
    /// Builds a record from a model-produced JSON object.
    ///
    /// Missing keys and nulls become empty strings, numbers and booleans are
    /// stringified, and keys outside [`FIELD_NAMES`] are dropped.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut record = Self::default();
        for name in FIELD_NAMES {
            if let (Some(slot), Some(value)) = (record.field_mut(name), object.get(name)) {
                *slot = json_to_text(value);
            }
        }
        record
    }

    /// A record whose every field holds `value`.
    pub fn filled(value: &str) -> Self {
        let mut record = Self::default();
        for name in FIELD_NAMES {
            if let Some(slot) = record.field_mut(name) {
                *slot = value.to_string();
            }
        }
        record
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "advertisement_number" => &self.advertisement_number,
            "advertisement_date" => &self.advertisement_date,
            "post_name" => &self.post_name,
            "vacancies" => &self.vacancies,
            "last_date" => &self.last_date,
            "salary" => &self.salary,
            "location" => &self.location,
            "age_limit" => &self.age_limit,
            "category" => &self.category,
            "qualification" => &self.qualification,
            "mandatory" => &self.mandatory,
            "specialization" => &self.specialization,
            "experience_years" => &self.experience_years,
            "remarks" => &self.remarks,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        let value = match name {
            "advertisement_number" => &mut self.advertisement_number,
            "advertisement_date" => &mut self.advertisement_date,
            "post_name" => &mut self.post_name,
            "vacancies" => &mut self.vacancies,
            "last_date" => &mut self.last_date,
            "salary" => &mut self.salary,
            "location" => &mut self.location,
            "age_limit" => &mut self.age_limit,
            "category" => &mut self.category,
            "qualification" => &mut self.qualification,
            "mandatory" => &mut self.mandatory,
            "specialization" => &mut self.specialization,
            "experience_years" => &mut self.experience_years,
            "remarks" => &mut self.remarks,
            _ => return None,
        };
        Some(value)
    }

    /// Field values in [`FIELD_NAMES`] order.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        FIELD_NAMES
            .into_iter()
            .map(move |name| self.field(name).unwrap_or_default())
    }
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// True when a mandatory cell is empty or still asks for a manual check.
pub fn needs_review(value: &str) -> bool {
    value.trim().is_empty() || value.to_lowercase().contains("check")
}

/// Share of records with a non-empty value, rendered as `"NN%"`.
pub fn coverage<F>(records: &[ExtractionRecord], field: F) -> String
where
    F: Fn(&ExtractionRecord) -> &str,
{
    if records.is_empty() {
        return "0%".to_string();
    }
    let filled = records.iter().filter(|r| !field(r).is_empty()).count();
    format!("{:.0}%", filled as f64 / records.len() as f64 * 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionQuality {
    pub last_date_coverage: String,
    pub salary_coverage: String,
    pub auto_last_date: String,
    pub date_source: String,
}

impl ExtractionQuality {
    pub fn measure(records: &[ExtractionRecord], auto_last_date: &str, date_source: &str) -> Self {
        Self {
            last_date_coverage: coverage(records, |r| r.last_date.as_str()),
            salary_coverage: coverage(records, |r| r.salary.as_str()),
            auto_last_date: auto_last_date.to_string(),
            date_source: date_source.to_string(),
        }
    }

    fn unmeasured(date_source: &str) -> Self {
        Self {
            last_date_coverage: "0%".to_string(),
            salary_coverage: "0%".to_string(),
            auto_last_date: String::new(),
            date_source: date_source.to_string(),
        }
    }
}

/// Why a required organization got a stand-in entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderReason {
    /// No document in the batch belonged to the organization.
    NotUploaded,
    /// Some documents resolved to organizations outside the required set, so
    /// this one may have been uploaded and misdetected.
    Unattributed,
}

/// All postings extracted for one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationResult {
    pub organization: Organization,
    pub positions: Vec<ExtractionRecord>,
    pub total_positions: usize,
    pub extraction_quality: ExtractionQuality,
}

impl OrganizationResult {
    pub fn new(
        organization: Organization,
        positions: Vec<ExtractionRecord>,
        auto_last_date: &str,
        date_source: &str,
    ) -> Self {
        let extraction_quality = ExtractionQuality::measure(&positions, auto_last_date, date_source);
        Self {
            organization,
            total_positions: positions.len(),
            positions,
            extraction_quality,
        }
    }

    /// Stand-in for a document too short to analyze.
    pub fn manual_review(organization: Organization) -> Self {
        let mut record = ExtractionRecord::filled(MANUAL_REVIEW_MARKER);
        record.remarks = "Document was empty or unreadable. Please verify all details from the original PDF.".to_string();
        Self::single(organization, record, "empty PDF")
    }

    /// Stand-in for a document whose reading or analysis failed.
    pub fn extraction_failed(organization: Organization, error: &str) -> Self {
        let record = ExtractionRecord {
            advertisement_number: "EXTRACTION FAILED".to_string(),
            post_name: "EXTRACTION FAILED - See error".to_string(),
            remarks: format!("Error during extraction: {}", error),
            ..Default::default()
        };
        Self::single(organization, record, "error")
    }

    /// Stand-in for a required organization with no processed document.
    pub fn missing(id: OrganizationId, last_date: String, reason: PlaceholderReason) -> Self {
        let (remarks, date_source) = match reason {
            PlaceholderReason::NotUploaded => (
                format!(
                    "PDF for {} was not uploaded or failed to process. Please fill manually from original PDF.",
                    id
                ),
                "not uploaded",
            ),
            PlaceholderReason::Unattributed => (
                format!(
                    "No document was attributed to {}. Some documents in this batch resolved to other organizations; check whether one of them belongs here.",
                    id
                ),
                "unattributed",
            ),
        };
        let record = ExtractionRecord {
            advertisement_number: format!("{} - NOT PROCESSED", id),
            post_name: format!("{} - PDF not uploaded or failed", id),
            last_date,
            remarks,
            ..Default::default()
        };
        Self::single(Organization::Known(id), record, date_source)
    }

    fn single(organization: Organization, record: ExtractionRecord, date_source: &str) -> Self {
        Self {
            organization,
            positions: vec![record],
            total_positions: 1,
            extraction_quality: ExtractionQuality::unmeasured(date_source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_object_is_completed_to_fourteen_fields() {
        let value = json!({
            "post_name": "Engineer (Civil)",
            "age_limit": 30,
            "mandatory": true,
            "salary": null,
            "unexpected": "dropped"
        });
        let record = ExtractionRecord::from_json_object(value.as_object().unwrap());

        assert_eq!(record.post_name, "Engineer (Civil)");
        assert_eq!(record.age_limit, "30");
        assert_eq!(record.mandatory, "true");
        assert_eq!(record.salary, "");

        let serialized = serde_json::to_value(&record).unwrap();
        let keys: Vec<&String> = serialized.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), FIELD_NAMES.len());
        for name in FIELD_NAMES {
            assert!(serialized.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn values_follow_column_order() {
        let record = ExtractionRecord {
            advertisement_number: "A".into(),
            remarks: "Z".into(),
            ..Default::default()
        };
        let values: Vec<&str> = record.values().collect();
        assert_eq!(values.len(), 14);
        assert_eq!(values[0], "A");
        assert_eq!(values[13], "Z");
    }

    #[test]
    fn coverage_rounds_and_handles_empty() {
        let filled = ExtractionRecord {
            last_date: "01-05-2025".into(),
            ..Default::default()
        };
        let records = vec![filled.clone(), filled, ExtractionRecord::default()];
        assert_eq!(coverage(&records, |r| r.last_date.as_str()), "67%");
        assert_eq!(coverage(&records, |r| r.salary.as_str()), "0%");
        assert_eq!(coverage(&[], |r| r.salary.as_str()), "0%");
    }

    #[test]
    fn review_detection() {
        assert!(needs_review(""));
        assert!(needs_review("  "));
        assert!(needs_review("Check notification"));
        assert!(!needs_review("Rs 50,000/- per month"));
    }

    #[test]
    fn manual_review_placeholder_shape() {
        let result = OrganizationResult::manual_review(Organization::Unknown);
        assert_eq!(result.total_positions, 1);
        assert_eq!(result.positions[0].last_date, MANUAL_REVIEW_MARKER);
        assert!(result.positions[0].remarks.contains("empty or unreadable"));
        assert_eq!(result.extraction_quality.last_date_coverage, "0%");
        assert_eq!(result.extraction_quality.salary_coverage, "0%");
        assert_eq!(result.extraction_quality.date_source, "empty PDF");
    }

    #[test]
    fn missing_placeholder_reasons_differ() {
        let uploaded = OrganizationResult::missing(
            OrganizationId::Nhm,
            "31-01-2025".into(),
            PlaceholderReason::NotUploaded,
        );
        let unattributed = OrganizationResult::missing(
            OrganizationId::Nhm,
            String::new(),
            PlaceholderReason::Unattributed,
        );
        assert_eq!(uploaded.positions[0].advertisement_number, "NHM - NOT PROCESSED");
        assert_eq!(uploaded.positions[0].last_date, "31-01-2025");
        assert_eq!(uploaded.extraction_quality.date_source, "not uploaded");
        assert_eq!(unattributed.extraction_quality.date_source, "unattributed");
        assert_ne!(uploaded.positions[0].remarks, unattributed.positions[0].remarks);
    }

    #[test]
    fn organization_serializes_as_display_string() {
        let result = OrganizationResult::new(
            Organization::Known(OrganizationId::Csir),
            vec![],
            "",
            "not found",
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["organization"], "CSIR");
        assert_eq!(value["total_positions"], 0);
    }
}
