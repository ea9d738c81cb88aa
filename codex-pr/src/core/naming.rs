//! Branch names, commit messages and PR titles derived from the prompt.

use std::sync::LazyLock;

use regex::Regex;

const SLUG_MAX_LEN: usize = 40;
const SUBJECT_MAX_LEN: usize = 72;
const SUBJECT_PREFIX: &str = "codex: ";
const FALLBACK_SLUG: &str = "changes";

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex should compile"));

/// Lowercase, dash-separated slug of the prompt, at most 40 chars.
///
/// Truncation prefers a dash boundary so words are not cut in half.
pub fn slugify(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let dashed = NON_ALNUM_RE.replace_all(&lower, "-");
    let trimmed = dashed.trim_matches('-');
    if trimmed.is_empty() {
        return FALLBACK_SLUG.to_string();
    }
    if trimmed.len() <= SLUG_MAX_LEN {
        return trimmed.to_string();
    }
    let cut = &trimmed[..SLUG_MAX_LEN];
    let cut = match cut.rfind('-') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut,
    };
    cut.trim_matches('-').to_string()
}

/// Branch name without the uniqueness counter: `<prefix><slug>-<suffix>`.
pub fn branch_base(prefix: &str, prompt: &str, suffix: &str) -> String {
    format!("{prefix}{}-{suffix}", slugify(prompt))
}

/// Candidate branch for a uniqueness attempt (1 → base, n → `base-n`).
pub fn branch_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}

/// Commit subject / PR title: `codex: <first prompt line>`, at most 72 chars.
pub fn subject_line(prompt: &str) -> String {
    let first = prompt
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(FALLBACK_SLUG);
    let budget = SUBJECT_MAX_LEN - SUBJECT_PREFIX.len();
    let mut subject = String::from(SUBJECT_PREFIX);
    if first.chars().count() <= budget {
        subject.push_str(first);
    } else {
        subject.extend(first.chars().take(budget - 3));
        subject.push_str("...");
    }
    subject
}

/// Full commit message: subject, blank line, the prompt verbatim.
pub fn commit_message(prompt: &str) -> String {
    format!("{}\n\n{}\n", subject_line(prompt), prompt.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Add a LICENSE file!"), "add-a-license-file");
        assert_eq!(slugify("  fix: README typos (docs)  "), "fix-readme-typos-docs");
    }

    #[test]
    fn slugify_falls_back_for_symbol_only_prompts() {
        assert_eq!(slugify("!!! ???"), "changes");
        assert_eq!(slugify("日本語"), "changes");
    }

    #[test]
    fn slugify_truncates_at_word_boundary() {
        let slug = slugify(
            "refactor the configuration loader to support layered overrides and env vars",
        );
        assert!(slug.len() <= SLUG_MAX_LEN, "{slug}");
        assert_eq!(slug, "refactor-the-configuration-loader-to");
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn branch_names_include_suffix_and_counter() {
        let base = branch_base("codex/", "add a LICENSE file", "42-1");
        assert_eq!(base, "codex/add-a-license-file-42-1");
        assert_eq!(branch_candidate(&base, 1), base);
        assert_eq!(branch_candidate(&base, 3), format!("{base}-3"));
    }

    #[test]
    fn subject_uses_first_non_empty_line() {
        assert_eq!(
            subject_line("\n  add a LICENSE file\nuse MIT"),
            "codex: add a LICENSE file"
        );
    }

    #[test]
    fn subject_is_bounded() {
        let subject = subject_line(&"word ".repeat(40));
        assert_eq!(subject.chars().count(), SUBJECT_MAX_LEN);
        assert!(subject.ends_with("..."));
    }

    #[test]
    fn commit_message_carries_prompt_body() {
        let msg = commit_message("add a LICENSE file\n\nUse the MIT text.");
        assert!(msg.starts_with("codex: add a LICENSE file\n\n"));
        assert!(msg.contains("Use the MIT text."));
    }
}
