use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

fn separator_run() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new("[^a-z0-9]+").expect("valid separator pattern"))
}

/// Normalizes a label into an identifier-safe slug.
///
/// The label is lowercased, every run of characters outside `[a-z0-9]`
/// (non-ASCII letters included) collapses to a single `-`, and leading or
/// trailing hyphens are trimmed. The output alphabet is `[a-z0-9-]` with no
/// doubled, leading, or trailing hyphen, so applying `pathify` to its own
/// output returns the input unchanged.
///
/// ```
/// use sdg_data_filler::pathify::pathify;
///
/// assert_eq!(pathify("Northern Ireland"), "northern-ireland");
/// assert_eq!(pathify("  16 to 24 (years) "), "16-to-24-years");
/// assert_eq!(pathify("northern-ireland"), "northern-ireland");
/// ```
pub fn pathify(label: &str) -> Cow<'_, str> {
    if is_pathified(label) {
        return Cow::Borrowed(label);
    }
    let lowered = label.to_lowercase();
    let collapsed = separator_run().replace_all(&lowered, "-");
    Cow::Owned(collapsed.trim_matches('-').to_string())
}

/// Returns `true` when `value` is already in slug form.
pub fn is_pathified(value: &str) -> bool {
    !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
