//! Fixed key patterns for the registry namespace.
//!
//! Every registry key is built from one of these templates so the literal
//! prefixes live in exactly one place.

/// Fixed key holding the version of the most recently ingested snapshot.
pub const LAST_DOWNLOAD_KEY: &str = "last_download_time";

/// Snapshot record key: one version argument.
pub const SNAPSHOT_TEMPLATE: KeyTemplate = KeyTemplate::new("t:{}");

/// Patch record key: a from/to version pair.
pub const PATCH_TEMPLATE: KeyTemplate = KeyTemplate::new("p:{}_{}");

/// A key pattern with positional `{}` markers.
///
/// `format` substitutes arguments left to right and requires exactly as
/// many arguments as markers. Formatting with fewer arguments than markers
/// produces the prefix up to the first unfilled marker, which is how scan
/// prefixes are built (`t:` from the snapshot template, `p:` from the
/// patch template).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyTemplate {
    pattern: &'static str,
}

impl KeyTemplate {
    pub const fn new(pattern: &'static str) -> Self {
        Self { pattern }
    }

    /// Number of `{}` markers in the pattern.
    pub fn arity(&self) -> usize {
        self.pattern.matches("{}").count()
    }

    /// Substitute all markers. Panics if the argument count is wrong;
    /// callers pass compile-time-known template/argument pairs.
    pub fn format(&self, args: &[&str]) -> String {
        assert_eq!(
            args.len(),
            self.arity(),
            "template {:?} takes {} argument(s), got {}",
            self.pattern,
            self.arity(),
            args.len()
        );
        self.fill(args)
    }

    /// Substitute the leading markers only, truncating the pattern at the
    /// first unfilled one. With no arguments this yields the bare prefix.
    pub fn prefix(&self, args: &[&str]) -> String {
        assert!(
            args.len() <= self.arity(),
            "template {:?} takes at most {} argument(s), got {}",
            self.pattern,
            self.arity(),
            args.len()
        );
        self.fill(args)
    }

    fn fill(&self, args: &[&str]) -> String {
        let mut out = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern;
        for arg in args {
            match rest.find("{}") {
                Some(idx) => {
                    out.push_str(&rest[..idx]);
                    out.push_str(arg);
                    rest = &rest[idx + 2..];
                }
                None => break,
            }
        }
        match rest.find("{}") {
            // Unfilled markers truncate the key: it becomes a scan prefix.
            Some(idx) => out.push_str(&rest[..idx]),
            None => out.push_str(rest),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_key_formats_version() {
        assert_eq!(SNAPSHOT_TEMPLATE.format(&["1408657604"]), "t:1408657604");
    }

    #[test]
    fn patch_key_formats_pair() {
        assert_eq!(
            PATCH_TEMPLATE.format(&["1408657604", "1408657609"]),
            "p:1408657604_1408657609"
        );
    }

    #[test]
    fn empty_args_yield_bare_prefix() {
        assert_eq!(SNAPSHOT_TEMPLATE.prefix(&[]), "t:");
        assert_eq!(PATCH_TEMPLATE.prefix(&[]), "p:");
    }

    #[test]
    fn partial_args_yield_longer_prefix() {
        assert_eq!(PATCH_TEMPLATE.prefix(&["100"]), "p:100_");
    }

    #[test]
    fn arity_counts_markers() {
        assert_eq!(SNAPSHOT_TEMPLATE.arity(), 1);
        assert_eq!(PATCH_TEMPLATE.arity(), 2);
    }

    #[test]
    #[should_panic(expected = "takes 2 argument(s)")]
    fn format_rejects_wrong_arity() {
        PATCH_TEMPLATE.format(&["only-one"]);
    }
}
