//! Title-to-slug normalisation.
//!
//! Uniqueness is checked against the store by the catalog's slug allocator;
//! this module only produces candidates.

/// Maximum slug length, suffix included.
pub const MAX_SLUG_LEN: usize = 200;

/// Slug used when a title contains no usable characters.
pub const FALLBACK_SLUG: &str = "listing";

/// Normalise a title into a lowercase, hyphen-separated ASCII slug.
///
/// # Examples
///
/// ```
/// use estate_core::slug::slugify;
///
/// assert_eq!(slugify("Modern Family House, 4 Bed"), "modern-family-house-4-bed");
/// assert_eq!(slugify("  Café -- Élysée  "), "cafe-elysee");
/// assert_eq!(slugify("!!!"), "listing");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(fold_char) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    let slug = truncate(&slug, MAX_SLUG_LEN);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Append `-{n}` to `base`, shortening the base so the result stays within
/// [`MAX_SLUG_LEN`].
pub fn with_suffix(base: &str, n: u32) -> String {
    let suffix = format!("-{n}");
    let base = truncate(base, MAX_SLUG_LEN - suffix.len());
    format!("{base}{suffix}")
}

/// Cut at `max` bytes (slugs are ASCII) and drop any trailing hyphen.
fn truncate(slug: &str, max: usize) -> String {
    let cut = if slug.len() > max { &slug[..max] } else { slug };
    cut.trim_end_matches('-').to_string()
}

/// Map common Latin letters with diacritics to their ASCII base.
fn fold_char(c: char) -> impl Iterator<Item = char> {
    let folded: &[char] = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => &['a'],
        'æ' | 'Æ' => &['a', 'e'],
        'ç' | 'Ç' => &['c'],
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => &['e'],
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => &['i'],
        'ñ' | 'Ñ' => &['n'],
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => &['o'],
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => &['u'],
        'ý' | 'ÿ' | 'Ý' => &['y'],
        'ß' => &['s', 's'],
        _ => &[],
    };
    let passthrough = folded.is_empty().then_some(c);
    folded.iter().copied().chain(passthrough)
}
