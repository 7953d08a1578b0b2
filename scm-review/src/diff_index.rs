//! Index of a unified multi-file diff: repository path -> hunks.
//!
//! Only hunk coordinates are kept; line contents are validated against the
//! hunk header counters and then dropped. The index is built per publish cycle
//! from a freshly fetched diff and never cached.

use std::collections::HashMap;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

use tracing::debug;

use crate::errors::DiffParseError;

/// One contiguous change region, with 1-based starts for both file versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub origin_start: u32,
    pub origin_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

impl Hunk {
    /// Whether a comment on `line` may be anchored inside this hunk.
    ///
    /// The line must be at or past both start lines and at or before both
    /// `start + count` ends. Origin and new coordinates are checked together,
    /// so a line valid on only one side is rejected.
    pub fn covers(&self, line: u32) -> bool {
        let line = u64::from(line);
        let origin_start = u64::from(self.origin_start);
        let new_start = u64::from(self.new_start);

        if line < origin_start || line < new_start {
            return false;
        }
        if line > origin_start + u64::from(self.origin_lines)
            || line > new_start + u64::from(self.new_lines)
        {
            return false;
        }
        true
    }
}

/// A file touched by the diff together with its hunks in diff order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    pub path: String,
    pub hunks: Vec<Hunk>,
}

/// Path-keyed view over a parsed diff.
#[derive(Debug, Clone, Default)]
pub struct DiffIndex {
    files: HashMap<String, DiffFile>,
}

type DiffLines<'a> = Peekable<Enumerate<Lines<'a>>>;

impl DiffIndex {
    /// Parses `raw` (as returned by `Accept: application/vnd.github.v3.diff`).
    ///
    /// Keys are the origin paths with their two-character marker (`a/`)
    /// removed. Added files (`--- /dev/null`) are keyed by the new path.
    /// Extended headers (`index`, `new file mode`, `Binary files ...`) are skipped.
    /// Empty input yields an empty index.
    pub fn build(raw: &str) -> Result<Self, DiffParseError> {
        let mut index = DiffIndex::default();
        let mut current: Option<DiffFile> = None;
        let mut saw_file_header = false;
        let mut lines: DiffLines<'_> = raw.lines().enumerate().peekable();

        while let Some((idx, line)) = lines.next() {
            let line_no = idx + 1;

            if line.starts_with("diff ") {
                index.flush(current.take());
                saw_file_header = true;
                continue;
            }

            if let Some(origin) = line.strip_prefix("--- ") {
                let new = match lines.next() {
                    Some((_, next)) if next.starts_with("+++ ") => &next[4..],
                    _ => return Err(DiffParseError::MissingNewFileHeader(line_no + 1)),
                };

                index.flush(current.take());
                saw_file_header = true;
                current = Some(DiffFile {
                    path: file_key(origin, new),
                    hunks: Vec::new(),
                });
                continue;
            }

            if line.starts_with("@@") {
                let file = current
                    .as_mut()
                    .ok_or(DiffParseError::HunkWithoutFile(line_no))?;
                let hunk =
                    parse_hunk_header(line).ok_or_else(|| DiffParseError::InvalidHunkHeader {
                        line: line_no,
                        header: line.to_string(),
                    })?;

                consume_hunk_body(&mut lines, &hunk, line_no)?;
                file.hunks.push(hunk);
            }
        }
        index.flush(current);

        if !saw_file_header && !raw.trim().is_empty() {
            return Err(DiffParseError::NotADiff);
        }

        debug!("diff index built: files={}", index.files.len());
        Ok(index)
    }

    /// Hunks for a repository-relative path, if the file is part of the diff.
    pub fn hunks_for(&self, path: &str) -> Option<&[Hunk]> {
        self.files.get(path).map(|f| f.hunks.as_slice())
    }

    pub fn file(&self, path: &str) -> Option<&DiffFile> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    fn flush(&mut self, file: Option<DiffFile>) {
        let Some(file) = file else { return };
        // the same path twice only happens in concatenated diffs; keep every hunk
        self.files
            .entry(file.path.clone())
            .or_insert_with(|| DiffFile {
                path: file.path,
                hunks: Vec::new(),
            })
            .hunks
            .extend(file.hunks);
    }
}

/// Map key for a `---`/`+++` header pair.
fn file_key(origin: &str, new: &str) -> String {
    let origin = strip_timestamp(origin);
    let path = if origin == "/dev/null" {
        strip_timestamp(new)
    } else {
        origin
    };
    path.get(2..).unwrap_or(path).to_string()
}

/// `--- a/file.go\t2021-12-04 15:44:18` -> `a/file.go`
fn strip_timestamp(header: &str) -> &str {
    header.split('\t').next().unwrap_or(header).trim_end()
}

/// `@@ -60,10 +60,11 @@ optional section` -> Hunk. A missing count means 1.
fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let rest = line.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let mut ranges = rest[..end].split_whitespace();

    let (origin_start, origin_lines) = parse_range(ranges.next()?.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(ranges.next()?.strip_prefix('+')?)?;
    if ranges.next().is_some() {
        return None;
    }

    Some(Hunk {
        origin_start,
        origin_lines,
        new_start,
        new_lines,
    })
}

fn parse_range(s: &str) -> Option<(u32, u32)> {
    match s.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

/// Walks the hunk body until both counters are exhausted.
fn consume_hunk_body(
    lines: &mut DiffLines<'_>,
    hunk: &Hunk,
    header_line: usize,
) -> Result<(), DiffParseError> {
    let mut origin_left = hunk.origin_lines;
    let mut new_left = hunk.new_lines;
    let mut last_line = header_line;

    while origin_left > 0 || new_left > 0 {
        let Some(&(idx, line)) = lines.peek() else {
            return Err(DiffParseError::TruncatedHunk(last_line + 1));
        };
        let line_no = idx + 1;

        match line.as_bytes().first() {
            // some tools strip the single space of empty context lines
            Some(b' ') | None => {
                if origin_left == 0 || new_left == 0 {
                    return Err(DiffParseError::TruncatedHunk(line_no));
                }
                origin_left -= 1;
                new_left -= 1;
            }
            Some(b'-') => {
                if origin_left == 0 {
                    return Err(DiffParseError::TruncatedHunk(line_no));
                }
                origin_left -= 1;
            }
            Some(b'+') => {
                if new_left == 0 {
                    return Err(DiffParseError::TruncatedHunk(line_no));
                }
                new_left -= 1;
            }
            // "\ No newline at end of file"
            Some(b'\\') => {}
            _ => return Err(DiffParseError::TruncatedHunk(line_no)),
        }

        lines.next();
        last_line = line_no;
    }

    if let Some(&(_, next)) = lines.peek() {
        if next.starts_with('\\') {
            lines.next();
        }
    }

    Ok(())
}
