//! Textual parsing of Jest snapshot files.
//!
//! A snapshot file is a JS module of the shape
//! ``exports[`name`] = `serialized value`;`` repeated per entry. The file is
//! never evaluated as code; entries are lifted out with a small scanner so
//! untrusted pull-request content stays inert.

const EXPORT_OPEN: &str = "exports[`";

/// Lift every (name, raw serialized value) pair out of a snapshot file.
///
/// Scanning stops at the first structurally broken export; everything parsed
/// up to that point is still returned.
pub fn parse_exports(text: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut rest = text;

    while let Some(at) = rest.find(EXPORT_OPEN) {
        rest = &rest[at + EXPORT_OPEN.len()..];
        let Some((name, after_name)) = read_template_literal(rest) else {
            break;
        };
        let Some(after_assign) = consume_assignment(after_name) else {
            // Not an `] = ` assignment; resume scanning after the name.
            rest = after_name;
            continue;
        };
        let Some((value, after_value)) = read_template_literal(after_assign) else {
            break;
        };
        rest = after_value;
        entries.push((name, value));
    }

    entries
}

/// Strip the serializer artifacts Jest leaves in a snapshot value so the
/// remainder parses as a relaxed object literal: constructor-name prefixes
/// (`Object `, `Array `) and the newlines inserted for readability.
pub fn clean_serialized(raw: &str) -> String {
    raw.replace("Object ", "")
        .replace("Array ", "")
        .replace('\n', "")
}

/// Read a template-literal body up to the next unescaped backtick.
/// Returns the unescaped content and the text following the closing backtick.
fn read_template_literal(s: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = s.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                // Jest escapes backticks, backslashes and `$` inside the
                // template literal; anything else keeps its backslash.
                if !matches!(escaped, '`' | '\\' | '$') {
                    out.push('\\');
                }
                out.push(escaped);
            }
            '`' => return Some((out, &s[i + 1..])),
            _ => out.push(c),
        }
    }

    None
}

/// Consume `] = ` (whitespace-tolerant) plus the opening backtick of the
/// value literal.
fn consume_assignment(s: &str) -> Option<&str> {
    let s = s.strip_prefix(']')?;
    let s = s.trim_start();
    let s = s.strip_prefix('=')?;
    let s = s.trim_start();
    s.strip_prefix('`')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_entry() {
        let text = "// Jest Snapshot v1, https://goo.gl/fbAQLP\n\nexports[`renders correctly`] = `\nObject {\"text\": \"hi\"}\n`;\n";
        let entries = parse_exports(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "renders correctly");
        assert_eq!(entries[0].1, "\nObject {\"text\": \"hi\"}\n");
    }

    #[test]
    fn test_parse_multiple_entries() {
        let text = "exports[`first 1`] = `{a: 1}`;\nexports[`second 1`] = `{b: 2}`;\n";
        let entries = parse_exports(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("first 1".to_string(), "{a: 1}".to_string()));
        assert_eq!(entries[1], ("second 1".to_string(), "{b: 2}".to_string()));
    }

    #[test]
    fn test_parse_unescapes_backticks_and_dollars() {
        let text = "exports[`has \\` tick`] = `{text: \"a \\` b \\${c}\"}`;";
        let entries = parse_exports(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "has ` tick");
        assert_eq!(entries[0].1, "{text: \"a ` b ${c}\"}");
    }

    #[test]
    fn test_parse_keeps_other_escapes_intact() {
        let text = "exports[`e`] = `{text: \"line\\nbreak\"}`;";
        let entries = parse_exports(text);
        assert_eq!(entries[0].1, "{text: \"line\\nbreak\"}");
    }

    #[test]
    fn test_parse_truncated_file_returns_complete_entries() {
        let text = "exports[`ok`] = `{a: 1}`;\nexports[`broken`] = `never closed";
        let entries = parse_exports(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "ok");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_exports("").is_empty());
        assert!(parse_exports("module.exports = {};").is_empty());
    }

    #[test]
    fn test_clean_strips_constructor_prefixes_and_newlines() {
        let raw = "\nObject {\n  \"attachments\": Array [\n    Object {\"text\": \"hi\"},\n  ],\n}\n";
        assert_eq!(
            clean_serialized(raw),
            "{  \"attachments\": [    {\"text\": \"hi\"},  ],}"
        );
    }

    #[test]
    fn test_clean_plain_value_unchanged() {
        assert_eq!(clean_serialized("{\"text\": \"hi\"}"), "{\"text\": \"hi\"}");
    }
}
