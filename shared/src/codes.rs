/// Next code in a yearly sequence such as `COT-2024-0007` or `NC-2024-012`.
///
/// Codes from other years or with another prefix are ignored, so numbering
/// restarts at 1 every year.
pub fn next_code<'a>(
    prefix: &str,
    year: i32,
    width: usize,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let stem = format!("{prefix}-{year}-");
    let last = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(stem.as_str()))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{stem}{:0width$}", last + 1)
}
