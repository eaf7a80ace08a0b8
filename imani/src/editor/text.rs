//! Whitespace normalisation shared by OCR and PDF text extraction.

/// Collapse runs of whitespace to a single space, runs of newlines to a single newline, and trim.
///
/// Newlines count as whitespace, so a single line of text comes back. Callers that need line
/// structure (one line per PDF page) normalise each piece and join them afterwards.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join already-normalised pieces with single newlines, skipping empty pieces so that the result
/// never holds a blank line.
pub fn join_lines<I, S>(pieces: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lines: Vec<S> = pieces.into_iter().filter(|p| !p.as_ref().is_empty()).collect();
    lines.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join("\n").trim().to_string()
}
