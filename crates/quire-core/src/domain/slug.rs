use std::sync::LazyLock;

use regex::Regex;

/// Longest slug stored in the `slug` columns.
pub const SLUG_MAX_LEN: usize = 250;

static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("strip pattern is valid"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("separator pattern is valid"));

/// Derive a slug from a title or tag name.
///
/// Letters and digits of any script are kept and lowercased, other symbols are
/// dropped, and runs of whitespace or dashes become one dash. The result is cut
/// to [`SLUG_MAX_LEN`] characters.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lowered, "");
    let joined = SEPARATOR_RE.replace_all(&stripped, "-");
    let slug = joined.trim_matches(|c| c == '-' || c == '_');
    if slug.chars().count() <= SLUG_MAX_LEN {
        return slug.to_string();
    }
    let cut: String = slug.chars().take(SLUG_MAX_LEN).collect();
    cut.trim_end_matches(|c| c == '-' || c == '_').to_string()
}
