/// File names of repository indexes. A path ending in one of these points at the index itself
/// instead of the repository base.
const INDEX_FILES: &[&str] = &[
    "index.xml",
    "index.jar",
    "index-v1.jar",
    "index-v1.json",
    "index-v2.json",
    "entry.jar",
    "entry.json",
];

/// Reduce a URI path to the repository base path by removing trailing slashes and a trailing
/// index file name, repeated until the path doesn't change anymore.
pub fn path_cropped(path: &str) -> &str {
    let mut path = path;

    loop {
        let trimmed = trim_trailing_slashes(path);
        let cropped = match trimmed.rsplit_once('/') {
            Some((base, last)) if is_index_file(last) => base,
            _ => trimmed,
        };

        if cropped == path {
            return path;
        }

        path = cropped;
    }
}

fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { path } else { trimmed }
}

fn is_index_file(segment: &str) -> bool {
    INDEX_FILES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(segment))
}

pub fn null_if_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Format a fingerprint for display as uppercase groups of two characters.
///
/// A trailing single character (odd length) is dropped.
pub fn format_fingerprint(fingerprint: &str) -> String {
    let chars = fingerprint.chars().collect::<Vec<_>>();

    chars
        .chunks_exact(2)
        .map(|pair| pair.iter().collect::<String>().to_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}
