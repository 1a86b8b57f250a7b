use crate::error::RenderError;
use crate::parsers::text::clean_text;
use crate::renderer::PageScript;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Elements whose text never reaches extracted content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements rendered on their own lines
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Captured page source that [`PageScript`]s can be evaluated against.
///
/// Element removals requested by [`PageScript::StripElements`] are remembered
/// and replayed on every later evaluation, so the snapshot behaves like a
/// live document that was mutated in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    source: String,
    stripped: Vec<String>,
}

impl Snapshot {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stripped: Vec::new(),
        }
    }

    /// Evaluate `script` with the same result shape as the in-browser version
    pub fn evaluate(&mut self, script: &PageScript) -> Result<Value, RenderError> {
        let mut doc = self.document();

        match script {
            PageScript::StripElements { selectors } => {
                let mut removed = 0;
                for selector in parse_selectors(selectors) {
                    if detach_first(&mut doc, &selector) {
                        removed += 1;
                    }
                }
                self.stripped.extend(selectors.iter().cloned());
                Ok(Value::from(removed))
            }
            PageScript::SelectorText { selectors } => {
                for selector in parse_selectors(selectors) {
                    if let Some(element) = doc.select(&selector).next() {
                        let text = element_text(element);
                        if !text.is_empty() {
                            return Ok(Value::String(text));
                        }
                    }
                }
                Ok(Value::Null)
            }
            PageScript::DocumentText => Ok(Value::String(document_text(&doc))),
            PageScript::AnchorHrefs => Ok(Value::from(anchor_hrefs(&doc))),
        }
    }

    fn document(&self) -> Html {
        let mut doc = Html::parse_document(&self.source);
        for selector in parse_selectors(&self.stripped) {
            detach_first(&mut doc, &selector);
        }
        doc
    }
}

/// Parses selectors, skipping the ones a browser would reject
fn parse_selectors(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(_) => {
                ::log::debug!("Skipping invalid selector {:?}", raw);
                None
            }
        })
        .collect()
}

fn detach_first(doc: &mut Html, selector: &Selector) -> bool {
    let Some(id) = doc.select(selector).next().map(|element| element.id()) else {
        return false;
    };
    match doc.tree.get_mut(id) {
        Some(mut node) => {
            node.detach();
            true
        }
        None => false,
    }
}

/// Text of the body, or of the whole document when there is no body
pub fn document_text(doc: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| doc.select(&selector).next());
    element_text(body.unwrap_or_else(|| doc.root_element()))
}

/// Visible text of an element with block boundaries turned into line breaks
pub fn element_text(element: ElementRef) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    clean_text(&raw)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_element, out);
            if block {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            push_collapsed(text, out);
        }
    }
}

/// Appends `text` with whitespace runs folded into one space, as browsers lay out inline text
fn push_collapsed(text: &str, out: &mut String) {
    let mut last_space = out.ends_with(' ');
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(c);
            last_space = false;
        }
    }
}

/// Raw `href` attributes of every anchor, in document order
pub fn anchor_hrefs(doc: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}
