//! URL path joining for asset references.

use std::path::{Path, MAIN_SEPARATOR};

/// Join URL path segments with `/`.
///
/// Empty segments are skipped and native separators become `/`. The joined
/// string then gets one left-to-right collapse pass where each `///` or `//`
/// becomes a single `/`. The pass does not repeat, so longer runs are only
/// shortened: four slashes collapse to two.
pub fn http_join<S: AsRef<str>>(segments: &[S]) -> String {
    let joined: Vec<String> = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if MAIN_SEPARATOR != '/' {
                s.replace(MAIN_SEPARATOR, "/")
            } else {
                s.to_string()
            }
        })
        .collect();

    collapse_slashes(&joined.join("/"))
}

/// Single collapse pass: `///` then `//` at each position, never revisited.
fn collapse_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("///") {
            out.push('/');
            rest = &rest[3..];
        } else if rest.starts_with("//") {
            out.push('/');
            rest = &rest[2..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    out
}

/// URL directory of an output path (`""` for files at the output root).
pub fn url_dirname(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().replace(MAIN_SEPARATOR, "/"))
        .unwrap_or_default()
}
