// Instruction-line option parsing
//
// A line such as "mail.example.com must run imaps with port 993 and tls insecure"
// yields {"port": "993", "tls": "insecure"}. Only the keywords below are
// recognized; everything else on the line is skipped.

use std::collections::HashMap;

/// Option keywords the parser extracts from an instruction line.
pub const KNOWN_OPTIONS: &[&str] = &["port", "tls"];

const CONNECTORS: &[&str] = &["with", "and"];

/// Parse an instruction line into a map of lower-cased option name to raw value.
///
/// Never fails: unknown clauses are ignored and a keyword without a value is
/// dropped. When a keyword appears twice the later value wins.
pub fn parse_arguments(line: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    let mut tokens = line.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        let lowered = token.to_lowercase();
        if CONNECTORS.contains(&lowered.as_str()) {
            continue;
        }

        // "port=25"
        if let Some((key, raw)) = token.split_once('=') {
            let key = key.to_lowercase();
            if is_known(&key) {
                if let Some(value) = clean_value(raw) {
                    options.insert(key, value);
                }
            }
            continue;
        }

        // "port 25"
        if is_known(&lowered) {
            let next = match tokens.peek() {
                Some(next) if !CONNECTORS.contains(&next.to_lowercase().as_str()) => *next,
                _ => continue,
            };
            if let Some(value) = clean_value(next) {
                options.insert(lowered, value);
            }
            tokens.next();
        }
    }

    options
}

fn is_known(keyword: &str) -> bool {
    KNOWN_OPTIONS.contains(&keyword)
}

fn clean_value(raw: &str) -> Option<String> {
    let value = raw
        .trim_end_matches(',')
        .trim_matches(|c| c == '"' || c == '\'');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
