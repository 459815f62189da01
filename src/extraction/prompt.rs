//! Instruction text sent to the completion service.

use super::dates::NormalizedDate;
use super::organization::Organization;

/// Characters of notice text embedded in the prompt.
pub const PROMPT_TEXT_BUDGET: usize = 14_000;

pub const SYSTEM_INSTRUCTION: &str = "You are a meticulous data extraction engine for government recruitment notices. \
You never leave a field empty, you extract every position the notice describes, \
you follow the requested output format exactly, and you check your output before returning it.";

/// Field name and the example value shown to the model, in output order.
const FIELD_EXAMPLES: [(&str, &str); 14] = [
    ("advertisement_number", "Advt. No. 05/2025 or the notice reference"),
    ("advertisement_date", "DD-MM-YYYY publication date"),
    ("post_name", "Full position title with level, e.g. 'Engineer (RE-Civil)'"),
    ("vacancies", "Count with category split, e.g. '40 (UR-21, SC-4, ST-2, OBC-8, EWS-5)'"),
    ("last_date", "DD-MM-YYYY application deadline, never empty"),
    ("salary", "Exact pay as written, e.g. 'Rs 11,00,000/- per annum', never empty"),
    ("location", "Every posting location (states/cities)"),
    ("age_limit", "Upper age limit as a number, e.g. '30'"),
    ("category", "Engineering/Executive/Management/Science/Diploma"),
    ("qualification", "Minimum qualification with percentage, e.g. 'BE/B.Tech with 60%'"),
    ("mandatory", "Mandatory requirement, e.g. 'NET/GATE', 'YES', 'NO'"),
    ("specialization", "Exact discipline, e.g. 'Civil Engineering'"),
    ("experience_years", "Years of experience as a number, e.g. '3', '0'"),
    ("remarks", "Preferences, relaxations and special conditions"),
];

/// Leading `budget` characters of `text`.
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds the user instruction for one notice.
///
/// The only branch is whether a deadline was already detected; when it was,
/// the model is told to use it unless the notice contradicts it.
pub fn build_extraction_prompt(
    text: &str,
    organization: &Organization,
    detected_deadline: Option<&NormalizedDate>,
) -> String {
    let deadline_rule = match detected_deadline {
        Some(date) => format!(
            "   - A deadline of {} was detected in the notice. Use it unless the text clearly states another.",
            date
        ),
        None => "   - No deadline was detected automatically. Read the notice carefully for it.".to_string(),
    };
    let deadline_reminder = match detected_deadline {
        Some(date) => date.to_string(),
        None => "the deadline stated in the notice".to_string(),
    };

    let mut fields = String::new();
    for (i, (name, example)) in FIELD_EXAMPLES.iter().enumerate() {
        let separator = if i + 1 == FIELD_EXAMPLES.len() { "" } else { "," };
        fields.push_str(&format!("    \"{}\": \"{}\"{}\n", name, example, separator));
    }

    format!(
        r#"Extract every job position from the government recruitment notice below.

ORGANIZATION: {organization}

RULES:
1. One entry per position. Different levels of the same post (Engineer, Sr. Engineer, Manager) are separate entries.
2. The application deadline is mandatory.
   - Look for "last date", "closing date", "deadline", "submit by", "till", "before".
{deadline_rule}
   - Format it as DD-MM-YYYY.
3. Salary is mandatory. Look for "salary", "CTC", "remuneration", "fellowship", "stipend", "pay" and copy the amount as written.
4. Vacancies include the category breakdown (UR, SC, ST, OBC, EWS) when the notice gives one.
5. No field may be left empty.

NOTICE TEXT:
{text}

OUTPUT:
Return a JSON array in which every object has exactly these {count} fields:

[
  {{
{fields}  }}
]

Before answering, check that every position is present and that last_date, salary and vacancies are filled for each.
Use {deadline_reminder} for last_date when needed.
Return only the JSON array: no markdown, no commentary."#,
        organization = organization,
        deadline_rule = deadline_rule,
        text = truncate_chars(text, PROMPT_TEXT_BUDGET),
        count = FIELD_EXAMPLES.len(),
        fields = fields,
        deadline_reminder = deadline_reminder,
    )
}
