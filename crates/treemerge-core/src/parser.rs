//! Line-oriented Python parser.
//!
//! Each logical line becomes one node, nested under the closest preceding
//! line with shallower indentation. Triple-quoted block comments collapse
//! into a single node spanning their lines. Blank lines are buffered and
//! attached to the same parent as the next non-blank line so that a
//! depth-first unparse reproduces the original line order.
//!
//! Fresh trees are not cross-comparable; the matcher assigns the shared
//! identity space afterwards.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::{NodeKind, Tree};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unterminated block comment starting on line {line}")]
    UnterminatedBlockComment { line: usize },
}

/// Read and parse one source file.
pub fn parse_file(path: &Path) -> Result<Tree, ParseError> {
    let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_source(&source)
}

/// Parse source text into a line tree.
pub fn parse_source(source: &str) -> Result<Tree, ParseError> {
    let lines: Vec<&str> = source
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut tree = Tree::new();
    // currently open blocks, innermost last
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut pending_blanks: Vec<usize> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let raw = lines[i];
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            pending_blanks.push(tree.push(NodeKind::Whitespace, String::new(), 0));
            i += 1;
            continue;
        }

        let indent = indent_width(raw);
        let (kind, content, consumed) = if let Some(delim) = block_comment_delim(trimmed) {
            let (content, consumed) = scan_block_comment(&lines, i, delim)?;
            (NodeKind::BlockComment, content, consumed)
        } else {
            (classify(trimmed), strip_indent(raw).to_string(), 1)
        };

        while open.last().is_some_and(|&(depth, _)| depth >= indent) {
            open.pop();
        }
        let parent = open.last().map(|&(_, id)| id).unwrap_or(tree.root());

        for blank in pending_blanks.drain(..) {
            let at = tree.children(parent).len();
            tree.attach(parent, at, blank);
        }

        let id = tree.push(kind, content, indent);
        let at = tree.children(parent).len();
        tree.attach(parent, at, id);
        open.push((indent, id));

        i += consumed;
    }

    let root = tree.root();
    for blank in pending_blanks.drain(..) {
        let at = tree.children(root).len();
        tree.attach(root, at, blank);
    }

    Ok(tree)
}

/// Indentation width in columns, tabs counted as 4.
fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

fn strip_indent(line: &str) -> &str {
    line.trim_start_matches([' ', '\t'])
}

fn block_comment_delim(trimmed: &str) -> Option<&'static str> {
    if trimmed.starts_with("\"\"\"") {
        Some("\"\"\"")
    } else if trimmed.starts_with("'''") {
        Some("'''")
    } else {
        None
    }
}

/// Collect a triple-quoted comment into one content string. The first line
/// is stored without its indentation (the node carries it); continuation
/// lines keep theirs. Returns the content and the number of lines consumed.
fn scan_block_comment(
    lines: &[&str],
    start: usize,
    delim: &str,
) -> Result<(String, usize), ParseError> {
    let first = strip_indent(lines[start]);
    if first[delim.len()..].contains(delim) {
        return Ok((first.to_string(), 1));
    }

    let mut content = first.to_string();
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        content.push('\n');
        content.push_str(line);
        if line.contains(delim) {
            return Ok((content, offset + 2));
        }
    }
    Err(ParseError::UnterminatedBlockComment { line: start + 1 })
}

fn classify(line: &str) -> NodeKind {
    if line.starts_with("import ") || line.starts_with("from ") {
        NodeKind::Import
    } else if line.starts_with("class ") {
        NodeKind::Class
    } else if line.starts_with("def ") || line.starts_with("async def ") {
        NodeKind::Method
    } else if line.starts_with("if ")
        || line.starts_with("elif ")
        || line.starts_with("else:")
        || line.starts_with("else ")
    {
        NodeKind::IfStatement
    } else if line.starts_with("while ") {
        NodeKind::WhileLoop
    } else if line.starts_with("for ") {
        NodeKind::ForLoop
    } else if line == "return" || line.starts_with("return ") {
        NodeKind::Return
    } else if line.starts_with('#') {
        NodeKind::Comment
    } else {
        NodeKind::Assignment
    }
}
