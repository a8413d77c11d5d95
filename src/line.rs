//! Line classification for Markdown task documents.
//!
//! Stateless, per-line analysis: a line is a heading, a checkbox task item,
//! a plain list item, or something we do not model. Task items additionally
//! carry trailing assignee tokens (`@name`) and a trailing identifier
//! (`PRD-NNNNNN` by default). All functions here are pure; document-level
//! traversal lives in [`crate::parser`].

use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(-|\*|\d+\.)\s*\[([^\]]*)\]\s*(.*)$").unwrap());

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(-|\*|\d+\.)\s+(.+)$").unwrap());

static ASSIGNEE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@[\w-]+$").unwrap());

/// Compute the indentation weight of a leading-whitespace string.
///
/// Each space counts 1, each tab counts 4. Mixed tabs and spaces are
/// compared purely numerically; no tab-stop alignment is attempted.
#[must_use]
pub fn indent_width(indent: &str) -> usize {
    indent
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Normalize raw checkbox content.
///
/// Up to three spaces (or empty) becomes a single space (incomplete); any
/// short variant of `x` becomes lowercase `x` (complete). Anything else is
/// left untouched and treated as incomplete by [`checkbox_completed`].
#[must_use]
pub fn normalize_checkbox(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() && raw.len() <= 3 {
        " ".to_string()
    } else if trimmed.eq_ignore_ascii_case("x") && raw.len() <= 3 {
        "x".to_string()
    } else {
        raw.to_string()
    }
}

/// Whether raw checkbox content marks the task as completed.
#[must_use]
pub fn checkbox_completed(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("x")
}

/// A Markdown heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingLine {
    /// Heading level, 1-6.
    pub level: u8,
    /// Heading text with the `#` markers stripped.
    pub text: String,
}

/// A plain (checkbox-less) list item line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemLine {
    /// Leading whitespace, verbatim.
    pub indent: String,
    /// Bullet marker: `-`, `*`, or `N.`.
    pub bullet: String,
    /// Item content after the bullet.
    pub content: String,
}

/// A checkbox task item line, decomposed into its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    /// Leading whitespace, verbatim.
    pub indent: String,
    /// Bullet marker: `-`, `*`, or `N.`.
    pub bullet: String,
    /// Raw checkbox content between the brackets.
    pub checkbox: String,
    /// Description with assignees and identifier stripped. Interior
    /// whitespace is preserved.
    pub text: String,
    /// Trailing `@name` tokens, names without the `@`.
    pub assignees: Vec<String>,
    /// Trailing identifier token, if present.
    pub id: Option<String>,
}

impl TaskLine {
    /// Whether the checkbox marks this task as completed.
    #[must_use]
    pub fn completed(&self) -> bool {
        checkbox_completed(&self.checkbox)
    }

    /// Indentation weight of this line (space = 1, tab = 4).
    #[must_use]
    pub fn indent_width(&self) -> usize {
        indent_width(&self.indent)
    }

    /// Set the checkbox to the canonical completed or incomplete form.
    pub fn set_completed(&mut self, completed: bool) {
        self.checkbox = if completed { "x" } else { " " }.to_string();
    }

    /// Re-emit the line in canonical spacing, preserving the original
    /// bullet marker and indentation.
    ///
    /// Exactly one space separates the description, each assignee token
    /// and the trailing identifier.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}{} [{}]",
            self.indent,
            self.bullet,
            normalize_checkbox(&self.checkbox)
        );
        if !self.text.is_empty() {
            out.push(' ');
            out.push_str(&self.text);
        }
        for assignee in &self.assignees {
            out.push_str(" @");
            out.push_str(assignee);
        }
        if let Some(id) = &self.id {
            out.push(' ');
            out.push_str(id);
        }
        out
    }
}

/// Classification of a single document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// A `#`-heading line.
    Heading(HeadingLine),
    /// A checkbox task item.
    Task(TaskLine),
    /// A bulleted or numbered item without a checkbox.
    ListItem(ListItemLine),
    /// Whitespace only.
    Blank,
    /// Anything else (prose, code fences, tables, ...).
    Other,
}

/// Per-prefix line classifier.
///
/// The identifier pattern depends on the configured prefix, so the
/// compiled regexes live here rather than in statics. One classifier is
/// built per parse or mutation call.
#[derive(Debug)]
pub struct LineClassifier {
    prefix: String,
    /// Matches an identifier token anywhere in a string.
    id_re: Regex,
    /// Matches a whole string that is exactly one identifier token.
    id_token_re: Regex,
}

impl LineClassifier {
    /// Build a classifier for the given identifier prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        let escaped = regex::escape(prefix);
        // Infallible: the pattern is fixed apart from the escaped literal.
        let id_re = Regex::new(&format!(r"{escaped}-\d{{6}}")).unwrap();
        let id_token_re = Regex::new(&format!(r"^{escaped}-\d{{6}}$")).unwrap();
        Self {
            prefix: prefix.to_string(),
            id_re,
            id_token_re,
        }
    }

    /// The identifier prefix this classifier was built for.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Regex matching identifier tokens anywhere in a string.
    #[must_use]
    pub fn id_regex(&self) -> &Regex {
        &self.id_re
    }

    /// Classify one line of text.
    #[must_use]
    pub fn classify(&self, line: &str) -> LineKind {
        if line.trim().is_empty() {
            return LineKind::Blank;
        }
        if let Some(caps) = HEADING_RE.captures(line) {
            return LineKind::Heading(HeadingLine {
                level: caps[1].len() as u8,
                text: caps[2].to_string(),
            });
        }
        if let Some(task) = self.parse_task(line) {
            return LineKind::Task(task);
        }
        if let Some(caps) = LIST_RE.captures(line) {
            return LineKind::ListItem(ListItemLine {
                indent: caps[1].to_string(),
                bullet: caps[2].to_string(),
                content: caps[3].to_string(),
            });
        }
        LineKind::Other
    }

    /// Parse a line as a task item, decomposing the remainder into
    /// description, trailing assignee tokens and a trailing identifier.
    #[must_use]
    pub fn parse_task(&self, line: &str) -> Option<TaskLine> {
        let caps = TASK_RE.captures(line)?;
        let mut rest = caps[4].trim().to_string();

        let id = take_trailing_token(&mut rest, |tok| self.id_token_re.is_match(tok));

        let mut assignees = Vec::new();
        while let Some(tok) = take_trailing_token(&mut rest, |tok| ASSIGNEE_TOKEN_RE.is_match(tok))
        {
            assignees.insert(0, tok[1..].to_string());
        }

        Some(TaskLine {
            indent: caps[1].to_string(),
            bullet: caps[2].to_string(),
            checkbox: caps[3].to_string(),
            text: rest,
            assignees,
            id,
        })
    }

    /// Normalize a task line's formatting in place, returning the corrected
    /// line when it differs from the input.
    ///
    /// Repairs irregular checkbox content, collapses duplicate in-line
    /// identifiers down to the first occurrence re-appended at the end, and
    /// rewrites the bullet to `-` with single spacing. Returns `None` when
    /// the line is not a task item at all.
    #[must_use]
    pub fn normalize_task_line(&self, line: &str) -> Option<String> {
        let caps = TASK_RE.captures(line)?;
        let indent = &caps[1];
        let checkbox = normalize_checkbox(&caps[3]);
        let mut rest = caps[4].trim().to_string();

        let ids: Vec<String> = self
            .id_re
            .find_iter(&rest)
            .map(|m| m.as_str().to_string())
            .collect();
        if let Some(first) = ids.first() {
            // Strip every identifier occurrence, then re-append the first
            // one at the canonical trailing position.
            rest = self.id_re.replace_all(&rest, "").trim().to_string();
            rest = collapse_spaces(&rest);
            if rest.is_empty() {
                rest = first.clone();
            } else {
                rest = format!("{rest} {first}");
            }
        }

        if rest.is_empty() {
            Some(format!("{indent}- [{checkbox}]"))
        } else {
            Some(format!("{indent}- [{checkbox}] {rest}"))
        }
    }
}

/// Quick check: does the line look like a task item with a well-formed
/// checkbox? Used by insertion heuristics that only need a yes/no.
#[must_use]
pub fn is_task_line(line: &str) -> bool {
    static QUICK_TASK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*(-|\*|\d+\.)\s+\[[ xX]\]").unwrap());
    QUICK_TASK_RE.is_match(line)
}

/// Quick check: is the line a heading?
#[must_use]
pub fn is_heading(line: &str) -> bool {
    HEADING_RE.is_match(line)
}

/// Pop a whitespace-separated trailing token from `s` when it satisfies
/// `pred`, trimming the remainder. Returns the token.
fn take_trailing_token(s: &mut String, pred: impl Fn(&str) -> bool) -> Option<String> {
    let trimmed = s.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    // Leading whitespace in a line interior is always single-byte
    // (space or tab), so `+ 1` stays on a char boundary.
    let start = trimmed
        .rfind(|c: char| c.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let token = &trimmed[start..];
    if !pred(token) {
        return None;
    }
    let token = token.to_string();
    let remainder = trimmed[..start].trim_end().to_string();
    *s = remainder;
    Some(token)
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Tests
// ============================================================================
