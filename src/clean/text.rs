use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Removed from descriptions, applied in this order.
static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)this\s+is\s+an?\s+tender\s+notice",
        r"(?i)please\s+read\s+carefully",
        r"(?i)important\s+notice:?\s*",
        r"(?i)disclaimer:?\s*",
        r"(?i)terms\s+and\s+conditions:?\s*",
        r"(?i)for\s+more\s+information\s+visit",
        r"(?i)copyright\s+©?\s*\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Collapse whitespace runs to one space and trim. Blank becomes `None`.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let collapsed = collapse(raw?);
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Strip boilerplate, collapse whitespace inside each paragraph and keep
/// paragraphs separated by exactly one blank line.
pub fn clean_description(raw: Option<&str>) -> Option<String> {
    let stripped = strip_boilerplate(raw?);
    let paragraphs: Vec<String> = PARAGRAPH_BREAK_RE
        .split(&stripped)
        .map(collapse)
        .filter(|p| !p.is_empty())
        .collect();
    (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
}

fn collapse(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

// Repeats until stable: removing one phrase can join the halves of another.
fn strip_boilerplate(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = BOILERPLATE_RES
            .iter()
            .fold(current.clone(), |acc, re| re.replace_all(&acc, "").into_owned());
        if next == current {
            return current;
        }
        current = next;
    }
}
