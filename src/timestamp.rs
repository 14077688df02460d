use chrono::{DateTime, NaiveDateTime, Utc};

/// Format shared by session directory names and export file names: UTC,
/// second granularity, no characters illegal in filenames (notably no
/// colon). Lexicographic order of the produced strings equals chronological
/// order of the instants.
const NAME_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Name the given instant, e.g. `2026-08-07T14-03-22Z`.
pub fn timestamp_name(at: DateTime<Utc>) -> String {
    at.format(NAME_FORMAT).to_string()
}

/// Name the current instant.
///
/// Two calls within the same second produce the same name; callers that
/// allocate a file or directory from it must treat an already-existing
/// target as an error rather than reuse it.
pub fn now_name() -> String {
    timestamp_name(Utc::now())
}

/// Parse a name back into its instant. Returns `None` for strings that were
/// not produced by [`timestamp_name`].
pub fn parse_name(name: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(name, NAME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
