//! Built-in CSS modules transform
//!
//! Rewrites every local class selector to a generated name built from the
//! configured template. `:global(...)` selectors are left unscoped, and
//! declaration blocks, comments and strings are copied through untouched.

use crate::config::{LocalsConvention, TransformConfig};
use crate::resolve::module_stem;
use crate::transform::{StyleTransform, TransformError, TransformOutput};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// At-rules whose blocks contain rules rather than declarations
const RULE_BLOCK_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "layer",
    "container",
    "document",
    "scope",
    "starting-style",
    "keyframes",
    "-webkit-keyframes",
];

/// Scopes class selectors per file
#[derive(Debug, Clone)]
pub struct ScopedClassTransform {
    config: TransformConfig,
    module_suffix: String,
}

impl ScopedClassTransform {
    pub fn new(config: TransformConfig, module_suffix: impl Into<String>) -> Self {
        Self {
            config,
            module_suffix: module_suffix.into(),
        }
    }
}

impl StyleTransform for ScopedClassTransform {
    fn transform(&self, source: &str, file: &Path) -> Result<TransformOutput, TransformError> {
        let name = sanitize(&module_stem(file, &self.module_suffix));
        let mut rewriter = Rewriter {
            source,
            config: &self.config,
            name,
            content_hash: Sha256::digest(source.as_bytes()).to_vec(),
            class_map: BTreeMap::new(),
        };

        let output_text = rewriter.rewrite()?;
        Ok(TransformOutput {
            output_text,
            class_map: rewriter.class_map,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Rules,
    Declarations,
}

struct Rewriter<'a> {
    source: &'a str,
    config: &'a TransformConfig,
    name: String,
    content_hash: Vec<u8>,
    class_map: BTreeMap<String, String>,
}

impl Rewriter<'_> {
    fn rewrite(&mut self) -> Result<String, TransformError> {
        let src = self.source;
        let bytes = src.as_bytes();
        let mut out = String::with_capacity(src.len() + src.len() / 4);
        let mut stack: Vec<(Block, usize)> = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let in_rules = stack.last().is_none_or(|(block, _)| *block == Block::Rules);

            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = comment_end(src, i)?;
                }
                b'"' | b'\'' => {
                    i = string_end(src, i)?;
                }
                b'{' => {
                    let segment = &src[start..i];
                    let block = if !in_rules {
                        out.push_str(segment);
                        Block::Declarations
                    } else if segment.trim_start().starts_with('@') {
                        out.push_str(segment);
                        at_rule_block(segment)
                    } else {
                        let scoped = self.scope_selector(start, i, false)?;
                        out.push_str(&scoped);
                        Block::Declarations
                    };
                    out.push('{');
                    stack.push((block, i));
                    i += 1;
                    start = i;
                }
                b'}' => {
                    if stack.pop().is_none() {
                        return Err(TransformError::at(src, i, "unexpected '}'"));
                    }
                    out.push_str(&src[start..=i]);
                    i += 1;
                    start = i;
                }
                b';' if in_rules => {
                    // Statement at-rules such as @import or @charset
                    out.push_str(&src[start..=i]);
                    i += 1;
                    start = i;
                }
                _ => i += 1,
            }
        }

        if let Some((_, open)) = stack.last() {
            return Err(TransformError::at(src, *open, "unclosed block"));
        }

        let rest = &src[start..];
        if has_content(rest) {
            let offset = start + (rest.len() - rest.trim_start().len());
            return Err(TransformError::at(src, offset, "expected '{' after selector"));
        }
        out.push_str(rest);

        Ok(out)
    }

    /// Rewrite the class selectors in `source[from..to]`
    fn scope_selector(
        &mut self,
        from: usize,
        to: usize,
        mut global: bool,
    ) -> Result<String, TransformError> {
        // Bounded view keeps scans inside the selector with source offsets intact
        let source = self.source;
        let src = &source[..to];
        let bytes = src.as_bytes();
        let mut out = String::with_capacity((to - from) * 2);
        let mut start = from;
        let mut i = from;

        while i < to {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = comment_end(src, i)?;
                }
                b'"' | b'\'' => {
                    i = string_end(src, i)?;
                }
                b'[' => {
                    i = bracket_end(src, i)
                        .ok_or_else(|| TransformError::at(src, i, "unclosed attribute selector"))?;
                }
                b',' => {
                    global = false;
                    i += 1;
                }
                b':' => match pseudo_scope(&src[i..]) {
                    Some((keyword, true)) => {
                        out.push_str(&src[start..i]);
                        let open = i + keyword.len() + 1;
                        let close = paren_end(src, open).ok_or_else(|| {
                            TransformError::at(src, i, format!("unclosed {}(", keyword))
                        })?;
                        if keyword == ":global" {
                            out.push_str(&src[open..close]);
                        } else {
                            let scoped = self.scope_selector(open, close, false)?;
                            out.push_str(&scoped);
                        }
                        i = close + 1;
                        start = i;
                    }
                    Some((keyword, false)) => {
                        out.push_str(&src[start..i]);
                        global = keyword == ":global";
                        i += keyword.len();
                        while i < to && bytes[i].is_ascii_whitespace() {
                            i += 1;
                        }
                        start = i;
                    }
                    None => i += 1,
                },
                b'.' if starts_ident(&bytes[i + 1..]) => {
                    let end = ident_end(bytes, i + 1);
                    out.push_str(&src[start..i]);
                    out.push('.');
                    let local = &src[i + 1..end];
                    if global {
                        out.push_str(local);
                    } else {
                        let generated = self.generated_name(local);
                        out.push_str(&generated);
                    }
                    i = end;
                    start = i;
                }
                _ => i += 1,
            }
        }

        out.push_str(&src[start..to]);
        Ok(out)
    }

    /// Generated name for `local`, recorded in the class map
    fn generated_name(&mut self, local: &str) -> String {
        if let Some(existing) = self.class_map.get(local) {
            return existing.clone();
        }

        let mut hasher = Sha256::new();
        hasher.update(self.config.hash_prefix.as_bytes());
        hasher.update([0u8]);
        hasher.update(local.as_bytes());
        hasher.update([0u8]);
        hasher.update(&self.content_hash);
        let hash = hex::encode(hasher.finalize());
        let hash = &hash[..self.config.hash_length.clamp(1, hash.len())];

        let generated = self
            .config
            .scoped_name
            .replace("[name]", &self.name)
            .replace("[local]", &sanitize(local))
            .replace("[hash]", hash);

        self.class_map.insert(local.to_string(), generated.clone());
        if self.config.locals_convention == LocalsConvention::CamelCase {
            let camel = camel_case(local);
            if camel != local {
                self.class_map.entry(camel).or_insert_with(|| generated.clone());
            }
        }
        generated
    }
}

/// Which block kind an at-rule prelude opens
fn at_rule_block(prelude: &str) -> Block {
    let name: String = prelude
        .trim_start()
        .trim_start_matches('@')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();

    if RULE_BLOCK_AT_RULES.contains(&name.as_str()) {
        Block::Rules
    } else {
        Block::Declarations
    }
}

/// Recognize `:global` or `:local` at the start of `rest`
///
/// Returns the keyword and whether it is the wrapping `(...)` form.
fn pseudo_scope(rest: &str) -> Option<(&'static str, bool)> {
    let keyword = if rest.starts_with(":global") {
        ":global"
    } else if rest.starts_with(":local") {
        ":local"
    } else {
        return None;
    };

    match rest.as_bytes().get(keyword.len()) {
        Some(b'(') => Some((keyword, true)),
        Some(b) if is_ident_byte(*b) => None,
        _ => Some((keyword, false)),
    }
}

fn comment_end(src: &str, open: usize) -> Result<usize, TransformError> {
    src[open + 2..]
        .find("*/")
        .map(|pos| open + 2 + pos + 2)
        .ok_or_else(|| TransformError::at(src, open, "unterminated comment"))
}

fn string_end(src: &str, open: usize) -> Result<usize, TransformError> {
    let bytes = src.as_bytes();
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(TransformError::at(src, open, "unterminated string"))
}

/// Index just past the `]` closing the bracket at `open`
fn bracket_end(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(src, i).ok()?,
            b']' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `)` matching an already-consumed `(` just before `from`
fn paren_end(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 1;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(src, i).ok()?,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Whether `text` holds anything besides whitespace and comments
fn has_content(text: &str) -> bool {
    let mut rest = text.trim_start();
    while let Some(after) = rest.strip_prefix("/*") {
        match after.find("*/") {
            Some(end) => rest = after[end + 2..].trim_start(),
            None => return true,
        }
    }
    !rest.is_empty()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

fn starts_ident(bytes: &[u8]) -> bool {
    match bytes {
        [b'-', next, ..] => next.is_ascii_alphabetic() || *next == b'_' || *next == b'-' || *next >= 0x80,
        [first, ..] => first.is_ascii_alphabetic() || *first == b'_' || *first >= 0x80,
        [] => false,
    }
}

fn ident_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            i += 2;
        } else if is_ident_byte(bytes[i]) {
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// Keep only characters that are valid inside a class name
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `foo-bar-baz` -> `fooBarBaz`
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (index, c) in name.chars().enumerate() {
        if c == '-' && index > 0 {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
