//! Tag selection: glob patterns over the hub's tag list.

use std::collections::BTreeSet;

use globset::Glob;

use crate::error::{RegencronError, Result};

/// Match every tag against each pattern and collect the union. Shell-style
/// globs (`*`, `?`, character classes), case-sensitive; a tag matching more
/// than one pattern appears once. An empty result is not an error here —
/// the caller decides whether that is fatal.
pub fn select_tags(tags: &[String], patterns: &[String]) -> Result<BTreeSet<String>> {
    let mut selected = BTreeSet::new();
    for pattern in patterns {
        let matcher = Glob::new(pattern)
            .map_err(|e| RegencronError::Config(format!("invalid tag pattern '{pattern}': {e}")))?
            .compile_matcher();
        selected.extend(
            tags.iter()
                .filter(|tag| matcher.is_match(tag.as_str()))
                .cloned(),
        );
    }
    Ok(selected)
}
