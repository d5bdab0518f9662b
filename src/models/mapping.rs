// Model name resolution (client name → upstream name)
// Author: kelexine (https://github.com/kelexine)

use std::collections::HashMap;

/// Resolve the upstream model for a client-supplied model name.
///
/// Lookup order: exact alias, alias without a trailing `-YYYYMMDD` date
/// suffix, then the name unchanged. Matching is case-sensitive.
pub fn resolve_model(requested: &str, aliases: &HashMap<String, String>) -> String {
    if let Some(target) = aliases.get(requested) {
        return target.clone();
    }

    // Claude Code often sends versioned model names with date suffixes
    // e.g., "claude-sonnet-4-5-20250929" -> "claude-sonnet-4-5"
    let normalized = strip_date_suffix(requested);
    aliases
        .get(normalized)
        .cloned()
        .unwrap_or_else(|| requested.to_string())
}

/// Strip date suffix from model names (e.g., "claude-sonnet-4-5-20250929" -> "claude-sonnet-4-5")
pub fn strip_date_suffix(model: &str) -> &str {
    match model.rsplit_once('-') {
        Some((base, suffix))
            if !base.is_empty()
                && suffix.len() == 8
                && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => model,
    }
}
