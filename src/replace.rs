//! # Batch Search/Replace Engine
//!
//! Applies ordered replacement rules across a working tree and records,
//! per rule, which repositories were modified, which had zero matches,
//! which files were touched and how many replacements were made. The rule's
//! index in the configured sequence is its statistics key.
//!
//! Individual file problems (unreadable content, non-UTF-8 bytes) never
//! abort a rule or the run; the file is simply left unmodified. The
//! end-of-run summary flags any rule that modified nothing anywhere, which
//! is the operator's primary signal for a mistyped search pattern.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ReplacementRule;
use glob::Pattern;
use log::{debug, info, warn};
use regex::RegexBuilder;
use walkdir::WalkDir;

/// Accumulated outcome of one rule across all repositories in a run.
#[derive(Debug, Default, Clone)]
pub struct RuleStat {
    /// Repositories where the rule modified at least one file.
    pub modified_repos: BTreeSet<String>,
    /// Repositories where the rule matched nothing.
    pub zero_match_repos: BTreeSet<String>,
    /// Every file the rule modified, in processing order.
    pub files: Vec<PathBuf>,
    /// Replacements made per repository.
    pub replacement_counts: BTreeMap<String, usize>,
    /// Replacements made across the whole run.
    pub total_replacements: usize,
}

/// Per-rule statistics for a whole run, keyed by rule index.
///
/// Entries are created lazily on first reference and only ever grow.
#[derive(Debug, Default)]
pub struct RuleStats {
    rules: BTreeMap<usize, RuleStat>,
}

impl RuleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: usize) -> Option<&RuleStat> {
        self.rules.get(&idx)
    }

    fn entry(&mut self, idx: usize) -> &mut RuleStat {
        self.rules.entry(idx).or_default()
    }

    /// Total files modified across all rules and repositories.
    pub fn total_files(&self) -> usize {
        self.rules.values().map(|s| s.files.len()).sum()
    }

    /// Total replacements across all rules and repositories.
    pub fn total_replacements(&self) -> usize {
        self.rules.values().map(|s| s.total_replacements).sum()
    }

    /// Indices of rules that modified no repository at all.
    pub fn zero_match_rule_indices(&self) -> Vec<usize> {
        self.rules
            .iter()
            .filter(|(_, s)| s.modified_repos.is_empty())
            .map(|(idx, _)| *idx)
            .collect()
    }

    /// Log the per-rule summary for the whole run.
    pub fn log_summary(&self) {
        if self.rules.is_empty() {
            info!("no replacement rules were executed");
            return;
        }

        info!("{}", "=".repeat(60));
        info!("replacement rule summary");
        info!("{}", "=".repeat(60));

        for (idx, stat) in &self.rules {
            info!("rule #{}:", idx + 1);
            info!("  - repositories modified: {}", stat.modified_repos.len());
            if !stat.zero_match_repos.is_empty() {
                info!("  - zero-match repositories: {}", stat.zero_match_repos.len());
            }
            info!("  - files modified: {}", stat.files.len());
            info!("  - total replacements: {}", stat.total_replacements);
        }

        info!("{}", "-".repeat(60));
        info!(
            "total: {} files modified, {} replacements",
            self.total_files(),
            self.total_replacements()
        );

        let zero_match = self.zero_match_rule_indices();
        if !zero_match.is_empty() {
            let display: Vec<String> = zero_match.iter().map(|i| (i + 1).to_string()).collect();
            warn!(
                "rules matched nothing in any repository: [{}]",
                display.join(", ")
            );
            warn!("check the search strings and exclude patterns");
        }
        info!("{}", "=".repeat(60));
    }
}

/// Apply every rule, in order, to the tree rooted at `tree`.
///
/// Returns the number of file modifications made (a file touched by two
/// rules counts twice, mirroring the per-rule provenance).
pub fn apply_rules(
    tree: &Path,
    rules: &[ReplacementRule],
    repo_name: &str,
    stats: &mut RuleStats,
) -> usize {
    let mut modified_count = 0;

    for (idx, rule) in rules.iter().enumerate() {
        if rule.search.is_empty() {
            continue;
        }

        stats.entry(idx);
        info!(
            "applying rule #{}{}: {}",
            idx + 1,
            if rule.is_regex { " (regex)" } else { "" },
            truncate(&rule.search, 50)
        );

        let regex = if rule.is_regex {
            match RegexBuilder::new(&rule.search).multi_line(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("rule #{} has an invalid pattern: {}", idx + 1, e);
                    stats.entry(idx).zero_match_repos.insert(repo_name.to_string());
                    continue;
                }
            }
        } else {
            None
        };

        let excludes = compile_excludes(&rule.exclude_patterns);
        let mut files_modified = 0;
        let mut repo_replacements = 0;

        for path in candidate_files(tree, &rule.include_extensions, &excludes) {
            if let Some(count) = apply_to_file(&path, &rule.search, &rule.replace, regex.as_ref())
            {
                modified_count += 1;
                files_modified += 1;
                repo_replacements += count;
                stats.entry(idx).files.push(path);
            }
        }

        let stat = stats.entry(idx);
        if files_modified > 0 {
            stat.modified_repos.insert(repo_name.to_string());
            stat.replacement_counts
                .insert(repo_name.to_string(), repo_replacements);
            stat.total_replacements += repo_replacements;
            info!(
                "  -> rule #{} modified {} files in [{}], {} replacements",
                idx + 1,
                files_modified,
                repo_name,
                repo_replacements
            );
        } else {
            stat.zero_match_repos.insert(repo_name.to_string());
            info!("  -> rule #{} matched nothing in [{}]", idx + 1, repo_name);
        }
    }

    if modified_count > 0 {
        info!("repository [{}]: {} files modified", repo_name, modified_count);
    }
    modified_count
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn compile_excludes(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("ignoring invalid exclude pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

/// Enumerate the files a rule applies to: everything under `tree` except the
/// version-control metadata directory, excluded paths, and (when an
/// extension filter is set) files with other extensions.
fn candidate_files(tree: &Path, include_exts: &[String], excludes: &[Pattern]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(tree)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| !matches_exclude(path, excludes))
        .filter(|path| extension_included(path, include_exts))
        .collect();
    files.sort();
    files
}

fn matches_exclude(path: &Path, excludes: &[Pattern]) -> bool {
    let full = path.to_string_lossy();
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    excludes
        .iter()
        .any(|p| p.matches(&full) || p.matches(&base))
}

fn extension_included(path: &Path, include_exts: &[String]) -> bool {
    if include_exts.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    include_exts
        .iter()
        .any(|inc| inc.trim_start_matches('.') == ext)
}

/// Apply one rule to one file. Returns the replacement count when the file
/// was modified, `None` otherwise. Read and write problems are absorbed.
fn apply_to_file(
    path: &Path,
    search: &str,
    replace: &str,
    regex: Option<&regex::Regex>,
) -> Option<usize> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("skipping unreadable file {}: {}", path.display(), e);
            return None;
        }
    };

    let (new_content, count) = match regex {
        Some(re) => {
            let count = re.find_iter(&content).count();
            (re.replace_all(&content, replace).into_owned(), count)
        }
        None => (
            content.replace(search, replace),
            content.matches(search).count(),
        ),
    };

    if count > 0 && new_content != content {
        if let Err(e) = fs::write(path, &new_content) {
            warn!("could not write {}: {}", path.display(), e);
            return None;
        }
        debug!("modified {} ({} replacements)", path.display(), count);
        Some(count)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn literal_rule(search: &str, replace: &str) -> ReplacementRule {
        ReplacementRule {
            search: search.to_string(),
            replace: replace.to_string(),
            is_regex: false,
            include_extensions: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    #[test]
    fn test_literal_replacement_counts_every_occurrence() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "foo foo bar").unwrap();

        let rules = vec![literal_rule("foo", "bar")];
        let mut stats = RuleStats::new();
        let modified = apply_rules(temp.path(), &rules, "repo-a", &mut stats);

        assert_eq!(modified, 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "bar bar bar"
        );
        let stat = stats.get(0).unwrap();
        assert_eq!(stat.total_replacements, 2);
        assert_eq!(stat.replacement_counts["repo-a"], 2);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "v1 and v1").unwrap();

        let rules = vec![literal_rule("v1", "v2")];
        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &rules, "repo-a", &mut stats);
        let modified_again = apply_rules(temp.path(), &rules, "repo-a", &mut stats);

        assert_eq!(modified_again, 0);
        assert_eq!(stats.get(0).unwrap().total_replacements, 2);
        assert!(stats.get(0).unwrap().zero_match_repos.contains("repo-a"));
    }

    #[test]
    fn test_extension_filter() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "v1").unwrap();
        fs::write(temp.path().join("b.md"), "v1").unwrap();

        let mut rule = literal_rule("v1", "v2");
        rule.include_extensions = vec![".txt".to_string()];
        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &[rule], "repo-a", &mut stats);

        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "v2");
        assert_eq!(fs::read_to_string(temp.path().join("b.md")).unwrap(), "v1");
    }

    #[test]
    fn test_exclude_by_base_name_and_path() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("vendor")).unwrap();
        fs::write(temp.path().join("keep.txt"), "v1").unwrap();
        fs::write(temp.path().join("skip.lock"), "v1").unwrap();
        fs::write(temp.path().join("vendor/dep.txt"), "v1").unwrap();

        let mut rule = literal_rule("v1", "v2");
        rule.exclude_patterns = vec!["*.lock".to_string(), "**/vendor/*".to_string()];
        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &[rule], "repo-a", &mut stats);

        assert_eq!(fs::read_to_string(temp.path().join("keep.txt")).unwrap(), "v2");
        assert_eq!(
            fs::read_to_string(temp.path().join("skip.lock")).unwrap(),
            "v1"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("vendor/dep.txt")).unwrap(),
            "v1"
        );
    }

    #[test]
    fn test_git_directory_is_never_touched() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/config"), "v1").unwrap();
        fs::write(temp.path().join("a.txt"), "v1").unwrap();

        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &[literal_rule("v1", "v2")], "repo-a", &mut stats);

        assert_eq!(
            fs::read_to_string(temp.path().join(".git/config")).unwrap(),
            "v1"
        );
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "v2");
    }

    #[test]
    fn test_regex_rule_multi_line() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Cargo.toml"), "version = \"1.0\"\nname = \"x\"\n")
            .unwrap();

        let rule = ReplacementRule {
            search: r#"^version = ".*"$"#.to_string(),
            replace: r#"version = "2.0""#.to_string(),
            is_regex: true,
            include_extensions: Vec::new(),
            exclude_patterns: Vec::new(),
        };
        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &[rule], "repo-a", &mut stats);

        assert_eq!(
            fs::read_to_string(temp.path().join("Cargo.toml")).unwrap(),
            "version = \"2.0\"\nname = \"x\"\n"
        );
        assert_eq!(stats.get(0).unwrap().total_replacements, 1);
    }

    #[test]
    fn test_invalid_regex_records_zero_match() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "content").unwrap();

        let rule = ReplacementRule {
            search: "(unclosed".to_string(),
            replace: "x".to_string(),
            is_regex: true,
            include_extensions: Vec::new(),
            exclude_patterns: Vec::new(),
        };
        let mut stats = RuleStats::new();
        let modified = apply_rules(temp.path(), &[rule], "repo-a", &mut stats);

        assert_eq!(modified, 0);
        assert!(stats.get(0).unwrap().zero_match_repos.contains("repo-a"));
    }

    #[test]
    fn test_unreadable_file_is_absorbed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("binary.bin"), [0xff, 0xfe, 0x00, b'v', b'1']).unwrap();
        fs::write(temp.path().join("a.txt"), "v1").unwrap();

        let mut stats = RuleStats::new();
        let modified = apply_rules(temp.path(), &[literal_rule("v1", "v2")], "repo-a", &mut stats);

        assert_eq!(modified, 1);
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "v2");
    }

    #[test]
    fn test_empty_search_is_skipped_silently() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "v1").unwrap();

        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &[literal_rule("", "v2")], "repo-a", &mut stats);

        assert!(stats.get(0).is_none());
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "v1");
    }

    #[test]
    fn test_two_repo_scenario_provenance() {
        let repo_a = TempDir::new().unwrap();
        let repo_b = TempDir::new().unwrap();
        fs::write(repo_a.path().join("one.txt"), "v1").unwrap();
        fs::write(repo_a.path().join("two.txt"), "uses v1 here").unwrap();
        fs::write(repo_a.path().join("ignored.md"), "v1").unwrap();
        fs::write(repo_b.path().join("other.txt"), "nothing to see").unwrap();

        let mut rule = literal_rule("v1", "v2");
        rule.include_extensions = vec![".txt".to_string()];
        let rules = vec![rule];

        let mut stats = RuleStats::new();
        apply_rules(repo_a.path(), &rules, "repo-a", &mut stats);
        apply_rules(repo_b.path(), &rules, "repo-b", &mut stats);

        let stat = stats.get(0).unwrap();
        assert_eq!(
            stat.modified_repos.iter().collect::<Vec<_>>(),
            vec!["repo-a"]
        );
        assert_eq!(
            stat.zero_match_repos.iter().collect::<Vec<_>>(),
            vec!["repo-b"]
        );
        assert_eq!(stat.total_replacements, 2);
        assert_eq!(stat.files.len(), 2);
        assert_eq!(stats.total_files(), 2);
        assert_eq!(stats.zero_match_rule_indices(), Vec::<usize>::new());
    }

    #[test]
    fn test_zero_match_everywhere_is_flagged() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "content").unwrap();

        let mut stats = RuleStats::new();
        apply_rules(temp.path(), &[literal_rule("no-such-text", "x")], "repo-a", &mut stats);

        assert_eq!(stats.zero_match_rule_indices(), vec![0]);
    }
}
