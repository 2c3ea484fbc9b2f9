use regex::Regex;
use std::sync::OnceLock;

/// Map the no-break space family to an ordinary space; zero-width joiners and
/// byte-order marks vanish.
fn unify_space(c: char) -> Option<char> {
    match c {
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => Some(' '),
        '\u{2060}' | '\u{FEFF}' | '\u{200B}' => None,
        other => Some(other),
    }
}

/// Collapse every whitespace run (line breaks included) to a single space.
pub fn normalize_line(s: &str) -> String {
    s.chars()
        .filter_map(unify_space)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`normalize_line`] but line structure survives: each line is collapsed
/// on its own and `\r\n` becomes `\n`.
pub fn normalize_body(s: &str) -> String {
    s.lines().map(normalize_line).collect::<Vec<_>>().join("\n")
}

pub fn strip_html_tags(s: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("invalid regex"))
        .replace_all(s, "")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(normalize_line("  INR   999.00 \t debited  "), "INR 999.00 debited");
    }

    #[test]
    fn replaces_no_break_spaces() {
        assert_eq!(normalize_line("Rs.\u{00A0}500\u{202F}spent"), "Rs. 500 spent");
        assert_eq!(normalize_line("a\u{2007}\u{00A0}b"), "a b");
    }

    #[test]
    fn drops_zero_width_characters() {
        assert_eq!(normalize_line("Net\u{200B}flix\u{FEFF}"), "Netflix");
    }

    #[test]
    fn body_keeps_line_breaks() {
        let body = "Dear   Customer,\r\nMerchant Name:\u{00A0} Acme  Store\n\nThanks";
        assert_eq!(normalize_body(body), "Dear Customer,\nMerchant Name: Acme Store\n\nThanks");
    }

    #[test]
    fn strips_tags() {
        assert_eq!(strip_html_tags("<b>UPI/P2M/1/Shop</b>"), "UPI/P2M/1/Shop");
        assert_eq!(strip_html_tags("no tags"), "no tags");
    }
}
