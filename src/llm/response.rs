//! Post-processing of raw model output.

use super::types::StructuredField;

/// Strip a surrounding Markdown code fence (```lang ... ```), if any.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string ("json", "text", ...) on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// Parse "key : value" lines.
///
/// Each line is split at its first ':'. Lines without one and lines with an
/// empty key are skipped. A repeated key replaces the earlier value but keeps
/// the earlier position.
pub fn parse_structured_fields(raw: &str) -> Vec<StructuredField> {
    let mut fields: Vec<StructuredField> = Vec::new();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();

        match fields.iter_mut().find(|f| f.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => fields.push(StructuredField::new(key, value)),
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_and_without_language() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fences("  no fences  "), "no fences");
    }

    #[test]
    fn parses_key_value_lines_in_order() {
        let fields = parse_structured_fields(
            "Document type : Invoice\nCompany: Acme Corp\nnot a field\nDate : 2024-01-02",
        );
        assert_eq!(
            fields,
            vec![
                StructuredField::new("Document type", "Invoice"),
                StructuredField::new("Company", "Acme Corp"),
                StructuredField::new("Date", "2024-01-02"),
            ]
        );
    }

    #[test]
    fn splits_on_first_colon_only() {
        let fields = parse_structured_fields("Time : 10:30");
        assert_eq!(fields, vec![StructuredField::new("Time", "10:30")]);
    }

    #[test]
    fn skips_empty_keys_and_overwrites_duplicates_in_place() {
        let fields = parse_structured_fields(": orphan\nA : 1\nB : 2\nA : 3");
        assert_eq!(
            fields,
            vec![StructuredField::new("A", "3"), StructuredField::new("B", "2")]
        );
    }

    #[test]
    fn empty_value_is_kept() {
        let fields = parse_structured_fields("Phone :");
        assert_eq!(fields, vec![StructuredField::new("Phone", "")]);
    }
}
