use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node, Selector};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4",
    "h5", "h6", "dd", "dt", "blockquote", "pre",
];

/// One location rule. Rules are tried in order and the first hit wins.
#[derive(Debug, Clone, Copy)]
pub enum Probe {
    /// First element matching the selector.
    Css(&'static str),
    /// First element matching the selector whose text contains the needle.
    Containing(&'static str, &'static str),
    /// Element matching `label` whose text contains the needle, when its next
    /// element sibling is a `value` tag (`dt` "Organization" + `dd`).
    Following {
        label: &'static str,
        needle: &'static str,
        value: &'static str,
    },
}

/// `<dt>Label</dt><dd>value</dd>`
pub const fn term(needle: &'static str) -> Probe {
    Probe::Following {
        label: "dt",
        needle,
        value: "dd",
    }
}

/// `<label>Label</label><span>value</span>`
pub const fn label(needle: &'static str) -> Probe {
    Probe::Following {
        label: "label",
        needle,
        value: "span",
    }
}

impl Probe {
    pub fn find<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match *self {
            Probe::Css(sel) => {
                let selector = Selector::parse(sel).ok()?;
                scope.select(&selector).next()
            }
            Probe::Containing(sel, needle) => {
                let selector = Selector::parse(sel).ok()?;
                scope
                    .select(&selector)
                    .find(|el| el.text().collect::<String>().contains(needle))
            }
            Probe::Following {
                label,
                needle,
                value,
            } => {
                let selector = Selector::parse(label).ok()?;
                scope
                    .select(&selector)
                    .filter(|el| el.text().collect::<String>().contains(needle))
                    .find_map(|el| next_element(el).filter(|next| next.value().name() == value))
            }
        }
    }
}

fn next_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Whitespace-collapsed text of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    WHITESPACE_RE
        .replace_all(&el.text().collect::<String>(), " ")
        .trim()
        .to_string()
}

/// Text with a blank line at every block boundary, so paragraphs survive.
pub fn block_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            Node::Element(e) if BLOCK_TAGS.contains(&e.name()) => out.push_str("\n\n"),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Text of the first probe that finds a non-blank element.
pub fn first_text(scope: ElementRef<'_>, probes: &[Probe]) -> Option<String> {
    probes
        .iter()
        .filter_map(|p| p.find(scope))
        .map(text_of)
        .find(|t| !t.is_empty())
}

/// Like [`first_text`] but keeps paragraph structure.
pub fn first_block_text(scope: ElementRef<'_>, probes: &[Probe]) -> Option<String> {
    probes
        .iter()
        .filter_map(|p| p.find(scope))
        .map(block_text)
        .find(|t| !t.trim().is_empty())
}

/// Attribute of the first probe that finds an element carrying it.
pub fn first_attr(scope: ElementRef<'_>, probes: &[Probe], attr: &str) -> Option<String> {
    probes
        .iter()
        .filter_map(|p| p.find(scope))
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
          <div class="meta">
            <dl>
              <dt>Organization</dt><dd>  Water   Board </dd>
              <dt>Type</dt>
              <dd>Works</dd>
            </dl>
            <label>Organization</label><em>not a span</em>
          </div>
          <h2 class="empty"> </h2>
          <h2 class="title">Pump  <b>station</b> upgrade</h2>
          <div class="pager"><a href="/p/1">1</a><a href="/p/2">Next &raquo;</a></div>
          <div id="body"><p>First   para.</p><p>Second<br>line.</p></div>
        </body></html>
    "#;

    #[test]
    fn css_probe_collapses_text() {
        let doc = Html::parse_document(PAGE);
        let text = first_text(doc.root_element(), &[Probe::Css("h2.title")]);
        assert_eq!(text.as_deref(), Some("Pump station upgrade"));
    }

    #[test]
    fn blank_hit_falls_through_to_next_probe() {
        let doc = Html::parse_document(PAGE);
        let probes = [Probe::Css("h2.empty"), Probe::Css(".missing"), Probe::Css("h2.title")];
        assert_eq!(
            first_text(doc.root_element(), &probes).as_deref(),
            Some("Pump station upgrade")
        );
    }

    #[test]
    fn definition_terms_resolve_to_their_value() {
        let doc = Html::parse_document(PAGE);
        let root = doc.root_element();
        assert_eq!(first_text(root, &[term("Organization")]).as_deref(), Some("Water Board"));
        assert_eq!(first_text(root, &[term("Type")]).as_deref(), Some("Works"));
        assert_eq!(first_text(root, &[label("Organization")]), None);
    }

    #[test]
    fn containing_probe_reads_attribute() {
        let doc = Html::parse_document(PAGE);
        let href = first_attr(doc.root_element(), &[Probe::Containing(".pager a", "Next")], "href");
        assert_eq!(href.as_deref(), Some("/p/2"));
    }

    #[test]
    fn block_text_separates_paragraphs() {
        let doc = Html::parse_document(PAGE);
        let text = first_block_text(doc.root_element(), &[Probe::Css("#body")]).unwrap();
        assert_eq!(text, "First   para.\n\nSecond\nline.");
    }

    #[test]
    fn bad_selector_is_a_miss() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(first_text(doc.root_element(), &[Probe::Css("h2[")]), None);
    }
}
