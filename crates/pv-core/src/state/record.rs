//! Preview record naming

/// File-name slug for a project identity
///
/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters into a single `-`, so "St. Mary's Academy" becomes
/// `st-mary-s-academy`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}
