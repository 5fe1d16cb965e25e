use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slug pattern"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("valid slug pattern"));

/// ASCII letters, digits, hyphens and underscores. Empty input passes so an
/// omitted slug can still be derived from the name.
pub static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]*$").expect("valid slug pattern"));

/// URL slug of a catalog name: "Camisetas Básicas" becomes "camisetas-basicas".
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter_map(fold_accent).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(&cleaned, "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_owned()
}

/// Strips diacritics from Latin letters; other non-ASCII characters are dropped.
fn fold_accent(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        _ => return None,
    };
    Some(folded)
}

/// The explicit slug when one was given, otherwise one derived from `name`.
pub fn slug_or_derive(slug: Option<&str>, name: &str) -> String {
    match slug.map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_owned(),
        _ => slugify(name),
    }
}
