use serde_json::{json, Value};

/// Error codes attached to tool failures.
pub const ERR_INPUT: &str = "ERR_INPUT";
pub const ERR_SERVICE_UNAVAILABLE: &str = "ERR_SERVICE_UNAVAILABLE";
pub const ERR_RESPONSE_PARSE: &str = "ERR_RESPONSE_PARSE";
pub const ERR_REPORT_WRITE: &str = "ERR_REPORT_WRITE";

/// Safely truncates a UTF-8 string without breaking character boundaries.
/// If `s` is longer than `max` bytes, the result is cut at a char boundary and
/// `suffix` is appended, staying within `max` bytes whenever the suffix fits.
pub fn safe_truncate_utf8(s: &str, max: usize, suffix: &str) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let budget = if max > suffix.len() { max - suffix.len() } else { max };
    let mut end = budget;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    let mut result = String::with_capacity(end + suffix.len());
    result.push_str(&s[..end]);
    if max > suffix.len() {
        result.push_str(suffix);
    }
    result
}

/// Builds the text body of a failed tool call.
/// First line: short human-readable message, then a JSON object with
/// `code`, `message` and `details`.
pub fn build_error_payload(code: &str, message: &str, details: Value) -> String {
    let obj = json!({
        "code": code,
        "message": message,
        "details": details,
    });
    format!("{}\n{}", message, obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_untouched() {
        assert_eq!(safe_truncate_utf8("abc", 10, "..."), "abc");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "ééééé"; // 10 bytes
        let out = safe_truncate_utf8(s, 8, "..");
        assert_eq!(out, "ééé..");
        assert!(out.len() <= 8);
    }

    #[test]
    fn suffix_dropped_when_it_does_not_fit() {
        assert_eq!(safe_truncate_utf8("abcdef", 2, "..."), "ab");
        assert_eq!(safe_truncate_utf8("abcdef", 0, "..."), "");
    }

    #[test]
    fn error_payload_has_message_line_and_json() {
        let body = build_error_payload(ERR_INPUT, "No files", json!({"files": 0}));
        let (first, rest) = body.split_once('\n').unwrap();
        assert_eq!(first, "No files");
        let value: Value = serde_json::from_str(rest).unwrap();
        assert_eq!(value["code"], ERR_INPUT);
        assert_eq!(value["details"]["files"], 0);
    }
}
