/// Normalize a CSV header token for loose matching: lowercase, all whitespace removed.
///
/// "Source IP", " source ip " and "SourceIP" all normalize to "sourceip".
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
