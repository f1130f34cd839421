//! URL resolution against a base.

use url::Url;

/// True when `input` already names a scheme and authority (`http://...`).
pub fn is_absolute(input: &str) -> bool {
    Url::parse(input)
        .map(|url| !url.cannot_be_a_base())
        .unwrap_or(false)
}

/// Join two URL segments with exactly one `/` between them.
///
/// Leading `./` and `/` runs on the segment and trailing `/` runs on the
/// base collapse into the single separator. A segment that is empty after
/// trimming leaves the base untouched.
pub fn join_url(base: &str, segment: &str) -> String {
    let trimmed = segment.trim_start_matches("./").trim_start_matches('/');
    if trimmed.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return segment.to_string();
    }

    format!("{}/{}", base.trim_end_matches('/'), trimmed)
}

/// Resolve `input` against an optional base URL.
///
/// Absolute inputs and inputs that already start with the base are returned
/// unchanged.
pub fn with_base(input: &str, base: Option<&str>) -> String {
    match base {
        Some(base) if !base.is_empty() && base != "/" => {
            if is_absolute(input) || input.starts_with(base) {
                input.to_string()
            } else {
                join_url(base, input)
            }
        }
        _ => input.to_string(),
    }
}

/// Append URL-encoded query pairs, keeping any query already present.
pub fn with_query(input: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return input.to_string();
    }

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();

    let (head, fragment) = match input.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (input, None),
    };
    let separator = match head.find('?') {
        Some(idx) if idx + 1 == head.len() => "",
        Some(_) => "&",
        None => "?",
    };

    match fragment {
        Some(fragment) => format!("{}{}{}#{}", head, separator, encoded, fragment),
        None => format!("{}{}{}", head, separator, encoded),
    }
}
