//! Markdown to MediaWiki wikitext conversion.
//!
//! Line oriented: fenced code bodies pass through untouched, every other
//! line gets the inline rewrites, and pipe-delimited rows fold into a
//! `{| class="wikitable"` block.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,5})\s+(.+)$").unwrap());
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static ITALIC_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.+?)_").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static UNORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)- (.+)$").unwrap());
static ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)\d+\. (.+)$").unwrap());
static TABLE_SEPARATOR_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-\s:]*$").unwrap());

/// Converts an Azure DevOps wiki Markdown document into MediaWiki wikitext.
///
/// Fenced code blocks become `<syntaxhighlight>` blocks and their bodies are
/// left verbatim. An unterminated fence is closed at end of input. Outside of
/// fences each line is rewritten in a fixed order (heading, bold, italic,
/// link, inline code, list marker) and contiguous `|`-delimited rows are
/// reassembled as a wikitable whose first row is the header row.
pub fn markdown_to_wikitext(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut in_table = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            if in_table {
                out.push("|}".to_string());
                in_table = false;
            }
            if in_fence {
                out.push("</syntaxhighlight>".to_string());
                in_fence = false;
            } else {
                let lang: String = trimmed[3..]
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                out.push(format!("<syntaxhighlight lang=\"{lang}\">"));
                in_fence = true;
            }
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }

        let converted = convert_line(line);

        if is_table_row(&converted) {
            let cells = split_cells(&converted);
            if !in_table {
                out.push(r#"{| class="wikitable""#.to_string());
                out.push("|-".to_string());
                for cell in &cells {
                    out.push(format!("! {cell}"));
                }
                in_table = true;
            } else if cells.iter().all(|c| TABLE_SEPARATOR_CELL.is_match(c)) {
                // Alignment row between header and data carries no content.
            } else {
                out.push("|-".to_string());
                for cell in &cells {
                    out.push(format!("| {cell}"));
                }
            }
            continue;
        }
        if in_table {
            out.push("|}".to_string());
            in_table = false;
        }
        out.push(converted);
    }

    if in_table {
        out.push("|}".to_string());
    }
    if in_fence {
        out.push("</syntaxhighlight>".to_string());
    }

    let mut result = out.join("\n");
    if markdown.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Rewrites a single non-fence line. Bold must run before italic so `**`
/// pairs do not feed the single-star rule, and list markers are rewritten
/// last so the emitted `*` cannot be re-matched as emphasis.
fn convert_line(line: &str) -> String {
    let mut line = line.to_string();

    if let Some(caps) = HEADING.captures(&line) {
        let marks = "=".repeat(caps[1].len());
        line = format!("{} {} {}", marks, &caps[2], marks);
    }

    line = BOLD_STARS.replace_all(&line, "'''${1}'''").into_owned();
    line = BOLD_UNDERSCORES.replace_all(&line, "'''${1}'''").into_owned();
    line = ITALIC_STARS.replace_all(&line, "''${1}''").into_owned();
    line = ITALIC_UNDERSCORES.replace_all(&line, "''${1}''").into_owned();
    line = LINK.replace_all(&line, "[${2} ${1}]").into_owned();
    line = INLINE_CODE.replace_all(&line, "<code>${1}</code>").into_owned();
    line = UNORDERED_ITEM.replace(&line, "${1}* ${2}").into_owned();
    line = ORDERED_ITEM.replace(&line, "${1}# ${2}").into_owned();

    line
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    line.contains('|') && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Inner cells of a `| a | b |` row. The leading and trailing empty
/// fragments produced by the outer pipes are dropped.
fn split_cells(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.trim().split('|').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Derives a MediaWiki page title from a wiki page path.
///
/// Strips one trailing `.md`, turns underscores and hyphens into spaces and
/// title-cases each word. Path separators are kept so nested pages land as
/// MediaWiki subpages.
pub fn sanitize_title(path: &str) -> String {
    let name = path.strip_suffix(".md").unwrap_or(path);
    let name = name.replace(['_', '-'], " ");
    name.split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title for a page, falling back to `Page_{id}` when the path sanitizes to
/// nothing.
pub fn page_title(path: &str, page_id: i64) -> String {
    let title = sanitize_title(path.trim_start_matches('/'));
    if title.is_empty() {
        format!("Page_{page_id}")
    } else {
        title
    }
}

// First letter of every alphabetic run goes up, the rest go down, so
// "api2go" becomes "Api2Go" and "guides/setup" becomes "Guides/Setup".
fn title_case_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
