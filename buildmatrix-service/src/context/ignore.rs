// Ignore pattern handling
// Normalizes recursive-wildcard patterns into depth-bounded single-level
// patterns and evaluates exclusion against relative paths

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::context::packer::{PackError, IGNORE_FILE_NAME};

/// How many directory levels a `**` segment expands to.
///
/// The matcher only understands single-level wildcards, so `**` is
/// pre-expanded into one pattern per depth from 0 up to this bound. Paths
/// nested deeper than the bound silently escape exclusion; that costs context
/// size, not correctness of the build.
pub const MAX_WILDCARD_DEPTH: usize = 20;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Read raw ignore patterns from the base directory's ignore file.
///
/// A missing file is an empty pattern set; blank lines and `#` comments are
/// skipped.
pub fn load_patterns(base_dir: &Path) -> Result<Vec<String>, PackError> {
    let path = base_dir.join(IGNORE_FILE_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Expand recursive-wildcard patterns into concrete depth-bounded patterns.
///
/// Patterns without `**` pass through unchanged; expansions replace their
/// source pattern in place, so input order is otherwise preserved.
pub fn normalize_patterns<I>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut normalized = Vec::new();
    for pattern in patterns {
        if pattern.contains("**") {
            normalized.extend(expand_depth_wildcard(&pattern));
        } else {
            normalized.push(pattern);
        }
    }
    normalized
}

/// Expand one `**` pattern into `MAX_WILDCARD_DEPTH` single-level patterns.
///
/// The pattern is split at the first `**`; for depth `i` the result joins
/// head, `i` single-level wildcards, and tail with `/`.
fn expand_depth_wildcard(pattern: &str) -> Vec<String> {
    let (head, tail) = match pattern.split_once("**") {
        Some(parts) => parts,
        None => return vec![pattern.to_string()],
    };
    let head = head.trim_end_matches('/');
    let tail = tail.trim_start_matches('/');

    let (negated, head) = match head.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, head),
    };

    (0..MAX_WILDCARD_DEPTH)
        .map(|depth| {
            let mut segments: Vec<&str> = Vec::with_capacity(depth + 2);
            if !head.is_empty() {
                segments.push(head);
            }
            segments.extend(std::iter::repeat("*").take(depth));
            if !tail.is_empty() {
                segments.push(tail);
            }
            let joined = segments.join("/");
            if negated {
                format!("!{}", joined)
            } else {
                joined
            }
        })
        .collect()
}

struct IgnoreRule {
    pattern: Pattern,
    negated: bool,
}

/// An ordered set of compiled exclusion rules.
///
/// Docker ignore semantics: the last matching pattern decides, `!` negates,
/// and a pattern matching a directory covers everything beneath it. Matching
/// is single-level only (`*` never crosses a path separator) — recursive
/// patterns must already be normalized.
pub struct IgnoreSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreSet {
    /// Compile normalized patterns into an ignore set
    pub fn new<I>(patterns: I) -> Result<Self, PackError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut rules = Vec::new();
        for raw in patterns {
            let (negated, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let body = body.trim_end_matches('/');
            if body.is_empty() {
                continue;
            }
            let pattern = Pattern::new(body)
                .map_err(|e| PackError::InvalidPattern(format!("{}: {}", raw, e)))?;
            rules.push(IgnoreRule { pattern, negated });
        }
        Ok(Self { rules })
    }

    /// Whether a relative path is excluded from the context
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        // The path and each of its ancestors are candidates, so a rule
        // matching a directory excludes its whole subtree.
        let candidates: Vec<String> = relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();

        let mut excluded = false;
        for rule in &self.rules {
            if candidates
                .iter()
                .any(|c| rule.pattern.matches_with(c, OPTIONS))
            {
                excluded = !rule.negated;
            }
        }
        excluded
    }
}
