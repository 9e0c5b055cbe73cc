//! Tab-separated compact rendering with byte budgets.

/// Appended when output is cut at its byte budget.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Replace characters that would break a one-row-per-line table.
pub fn sanitize_cell(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

/// Render a header row plus data rows as a tab-separated table.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&headers.join("\t"));
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| sanitize_cell(c)).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

/// Enforce a byte budget: output longer than `max_bytes` is cut at the last
/// UTF-8 boundary that leaves room for the truncation marker.
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    if max_bytes <= TRUNCATION_MARKER.len() {
        return TRUNCATION_MARKER[..TRUNCATION_MARKER.len().min(max_bytes)].to_string();
    }
    let budget = max_bytes - TRUNCATION_MARKER.len();
    let mut cut = budget;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], TRUNCATION_MARKER)
}
