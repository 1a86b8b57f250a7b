/// Normalizes text read from a rendered page.
///
/// - Collapses runs of whitespace inside each line to one space
/// - Drops leading and trailing whitespace on each line
/// - Keeps paragraph structure with exactly one empty line between paragraphs
/// - Trims the result
pub fn clean_text(raw: &str) -> String {
    split_into_paragraphs(raw)
        .iter()
        .map(|paragraph| paragraph.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Splits text into paragraphs of normalized, non-empty lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<String>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        let normalized = normalize_whitespace_in_segment(line);
        if normalized.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(normalized);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

/// Normalizes whitespace within a single line, including non-breaking spaces
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment
        .split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
