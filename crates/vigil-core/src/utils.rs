//! Small helpers shared across crates.

use std::path::PathBuf;

const DATA_DIR_NAME: &str = ".vigil";

/// Default data directory, `~/.vigil`. Falls back to `./.vigil` when no
/// home directory is set.
pub fn get_data_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Resolve a leading `~` against the home directory. Other paths pass
/// through untouched.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return PathBuf::from(path),
    };
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(rest)
}

/// Cut `s` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Lowercase and collapse every whitespace run to one space.
pub fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&word.to_lowercase());
    }
    out
}

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_input() {
        assert_eq!(truncate_string("soc2", 10), "soc2");
        assert_eq!(truncate_string("exactly", 7), "exactly");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_string("openai-primary/gpt-4o-mini", 12), "openai-pr...");
        assert_eq!(truncate_string("こんにちは世界です", 5), "こん...");
    }

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(
            normalize_whitespace("  Draft   an\tAccess\nControl policy "),
            "draft an access control policy"
        );
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn expand_home_resolves_tilde() {
        let expanded = expand_home("~/vigil/data");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("vigil/data"));
    }

    #[test]
    fn expand_home_leaves_other_paths() {
        assert_eq!(expand_home("/var/lib/vigil"), PathBuf::from("/var/lib/vigil"));
        assert_eq!(expand_home("~other/dir"), PathBuf::from("~other/dir"));
    }

    #[test]
    fn data_path_is_dot_vigil() {
        assert!(get_data_path().ends_with(".vigil"));
    }
}
