//! # Commit Message Templating
//!
//! Restricted placeholder substitution for commit messages. A template may
//! reference the built-in placeholders `{repo_name}`, `{date}`, `{datetime}`,
//! `{timestamp}`, `{replacement_count}` and `{command_count}`, plus any
//! operator-supplied variable. Unknown placeholders are left untouched;
//! substitution never evaluates anything.

use std::collections::HashMap;

use chrono::Local;
use regex::Regex;

/// Build the substitution map for one repository's commit.
///
/// Operator-supplied `custom` variables are merged in first; built-ins win
/// on a name collision.
pub fn commit_vars(
    repo_name: &str,
    replacement_count: usize,
    command_count: usize,
    custom: &HashMap<String, String>,
) -> HashMap<String, String> {
    let now = Local::now();
    let mut vars = custom.clone();
    vars.insert("repo_name".to_string(), repo_name.to_string());
    vars.insert("date".to_string(), now.format("%Y-%m-%d").to_string());
    vars.insert(
        "datetime".to_string(),
        now.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    vars.insert("timestamp".to_string(), now.timestamp().to_string());
    vars.insert(
        "replacement_count".to_string(),
        replacement_count.to_string(),
    );
    vars.insert("command_count".to_string(), command_count.to_string());
    vars
}

/// Substitute `{placeholder}` references in `template` from `vars`.
///
/// Placeholders without a value keep their literal `{name}` spelling.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let pattern = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static placeholder pattern");
    pattern
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
