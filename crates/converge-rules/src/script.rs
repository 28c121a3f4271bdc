//! Script templates
//!
//! Each line of a rule's script is compiled once, at bundle load time, into
//! literal text and `${...}` placeholders. Rendering fills the placeholders
//! from the diff being remediated and the full desired index.
//!
//! | placeholder | expands to |
//! |---|---|
//! | `${rule}` | the rule name |
//! | `${path}` | the diff path |
//! | `${parent}` | the diff path without its last segment |
//! | `${key}` | the last segment of the diff path |
//! | `${segment(i)}` | segment `i`; negative counts from the end |
//! | `${value}` | desired leaf at the diff path |
//! | `${value(rel)}` | desired leaf at `rel`, resolved against `${parent}` |
//! | `${old}` / `${new}` | old / new value carried by the diff |
//!
//! Anything that cannot be resolved renders as `undefined`.

use std::fmt;
use std::sync::LazyLock;

use converge_model::{Diff, Path, PathIndex, Segment};
use regex::Regex;

use crate::error::{Error, Result};

const UNDEFINED: &str = "undefined";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-z]+)(?:\(([^)]*)\))?\}").expect("placeholder regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    Rule,
    Path,
    Parent,
    Key,
    Segment(isize),
    Value(Option<String>),
    Old,
    New,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Placeholder(Placeholder),
}

/// Inputs available while rendering a script
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    pub rule: &'a str,
    pub diff: &'a Diff,
    pub desired: &'a PathIndex,
}

/// One compiled script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    source: String,
    pieces: Vec<Piece>,
}

impl ScriptTemplate {
    pub fn compile(template: &str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                pieces.push(Piece::Text(template[last..whole.start()].to_string()));
            }
            let name = &caps[1];
            let arg = caps.get(2).map(|m| m.as_str());
            let placeholder = parse_placeholder(name, arg).map_err(|reason| Error::InvalidTemplate {
                template: template.to_string(),
                reason,
            })?;
            pieces.push(Piece::Placeholder(placeholder));
            last = whole.end();
        }

        if last < template.len() {
            pieces.push(Piece::Text(template[last..].to_string()));
        }

        let malformed = pieces
            .iter()
            .any(|piece| matches!(piece, Piece::Text(text) if text.contains("${")));
        if malformed {
            return Err(Error::InvalidTemplate {
                template: template.to_string(),
                reason: "unterminated or malformed placeholder".to_string(),
            });
        }

        Ok(Self {
            source: template.to_string(),
            pieces,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &ScriptContext<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Placeholder(placeholder) => out.push_str(&expand(placeholder, ctx)),
            }
        }
        out
    }
}

impl fmt::Display for ScriptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn parse_placeholder(name: &str, arg: Option<&str>) -> std::result::Result<Placeholder, String> {
    let no_arg = |placeholder: Placeholder| match arg {
        None => Ok(placeholder),
        Some(_) => Err(format!("${{{}}} takes no argument", name)),
    };

    match name {
        "rule" => no_arg(Placeholder::Rule),
        "path" => no_arg(Placeholder::Path),
        "parent" => no_arg(Placeholder::Parent),
        "key" => no_arg(Placeholder::Key),
        "old" => no_arg(Placeholder::Old),
        "new" => no_arg(Placeholder::New),
        "segment" => {
            let raw = arg.ok_or_else(|| "${segment(i)} needs an index".to_string())?;
            raw.trim()
                .parse::<isize>()
                .map(Placeholder::Segment)
                .map_err(|_| format!("segment index '{}' is not an integer", raw))
        }
        "value" => match arg.map(str::trim) {
            None => Ok(Placeholder::Value(None)),
            Some("") => Err("${value()} needs a path".to_string()),
            Some(rel) => Ok(Placeholder::Value(Some(rel.to_string()))),
        },
        other => Err(format!("unknown placeholder '{}'", other)),
    }
}

fn segment_text(segment: &Segment) -> String {
    match segment {
        Segment::Key(key) => key.clone(),
        Segment::Index(idx) => idx.to_string(),
    }
}

fn lookup(desired: &PathIndex, path: &Path) -> String {
    desired
        .get(path)
        .map(ToString::to_string)
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn expand(placeholder: &Placeholder, ctx: &ScriptContext<'_>) -> String {
    let path = ctx.diff.path();
    match placeholder {
        Placeholder::Rule => ctx.rule.to_string(),
        Placeholder::Path => path.to_string(),
        Placeholder::Parent => path.parent().unwrap_or_default().to_string(),
        Placeholder::Key => path
            .last()
            .map(segment_text)
            .unwrap_or_else(|| UNDEFINED.to_string()),
        Placeholder::Segment(idx) => path
            .segment(*idx)
            .map(segment_text)
            .unwrap_or_else(|| UNDEFINED.to_string()),
        Placeholder::Value(None) => lookup(ctx.desired, path),
        Placeholder::Value(Some(rel)) => {
            let base = path.parent().unwrap_or_default();
            match base.resolve(rel) {
                Ok(target) => lookup(ctx.desired, &target),
                Err(e) => {
                    tracing::debug!("Cannot resolve {} from {}: {}", rel, base, e);
                    UNDEFINED.to_string()
                }
            }
        }
        Placeholder::Old => ctx
            .diff
            .old_value()
            .map(ToString::to_string)
            .unwrap_or_else(|| UNDEFINED.to_string()),
        Placeholder::New => ctx
            .diff
            .new_value()
            .map(ToString::to_string)
            .unwrap_or_else(|| UNDEFINED.to_string()),
    }
}
