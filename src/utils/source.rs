//! Solidity source text helpers
//!
//! Plain text slicing only. No parsing, no AST.

/// A function located in source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan<'a> {
    pub name: &'a str,
    /// From `function` up to (excluding) the opening brace
    pub header: &'a str,
    /// Brace-delimited body including the braces; empty for declarations
    pub body: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> FunctionSpan<'a> {
    /// Full text of the function
    pub fn text(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Locate every `function name(...)` and its brace-matched body
pub fn function_spans(source: &str) -> Vec<FunctionSpan<'_>> {
    let mut spans = Vec::new();

    for (start, name_start, name_end) in function_headers(source) {
        let after_name = name_end;
        let rest = &source[after_name..];

        // Interface declarations end with ';' before any '{'
        let brace = rest.find('{');
        let semi = rest.find(';');
        let body_start = match (brace, semi) {
            (Some(b), Some(s)) if s < b => None,
            (Some(b), _) => Some(after_name + b),
            _ => None,
        };
        let name = &source[name_start..name_end];

        match body_start {
            Some(open) => {
                let close = matching_brace(source, open).unwrap_or(source.len());
                spans.push(FunctionSpan {
                    name,
                    header: &source[start..open],
                    body: &source[open..close],
                    start,
                    end: close,
                });
            }
            None => {
                let end = semi.map(|s| after_name + s + 1).unwrap_or(source.len());
                spans.push(FunctionSpan {
                    name,
                    header: &source[start..end],
                    body: "",
                    start,
                    end,
                });
            }
        }
    }

    spans
}

#[inline]
fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `(keyword start, name start, name end)` for each `function <name> (`
fn function_headers(source: &str) -> Vec<(usize, usize, usize)> {
    const KEYWORD: &str = "function";
    let bytes = source.as_bytes();
    let mut headers = Vec::new();
    let mut search = 0;

    while let Some(rel) = source[search..].find(KEYWORD) {
        let start = search + rel;
        search = start + KEYWORD.len();

        if start > 0 && is_word(bytes[start - 1]) {
            continue;
        }
        let rest = &source[search..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            continue;
        }
        let name_start = search + (rest.len() - trimmed.len());
        let name_len = trimmed.bytes().take_while(|b| is_word(*b)).count();
        if name_len == 0 {
            continue;
        }
        let name_end = name_start + name_len;
        if source[name_end..].trim_start().starts_with('(') {
            headers.push((start, name_start, name_end));
        }
    }

    headers
}

/// Byte offset just past the brace matching the `{` at `open`
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    matching_delim(source, open, '{', '}')
}

/// Byte offset just past the delimiter closing the one at `open`
fn matching_delim(source: &str, open: usize, opener: char, closer: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in source[open..].char_indices() {
        if c == opener {
            depth += 1;
        } else if c == closer {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(open + i + c.len_utf8());
            }
        }
    }
    None
}

/// A `for`/`while` loop located in source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSpan<'a> {
    /// Parenthesised loop condition including the parentheses
    pub condition: &'a str,
    /// Braced body, or the single statement up to `;`
    pub body: &'a str,
    pub start: usize,
}

/// Locate every `for (...)` and `while (...)` loop
pub fn loop_spans(source: &str) -> Vec<LoopSpan<'_>> {
    let bytes = source.as_bytes();
    let mut loops = Vec::new();

    for keyword in ["for", "while"] {
        let mut search = 0;
        while let Some(rel) = source[search..].find(keyword) {
            let start = search + rel;
            search = start + keyword.len();

            let before_ok = start == 0 || !is_word(bytes[start - 1]);
            let after_ok = bytes.get(search).map_or(false, |b| !is_word(*b));
            if !before_ok || !after_ok {
                continue;
            }
            let rest = &source[search..];
            let trimmed = rest.trim_start();
            if !trimmed.starts_with('(') {
                continue;
            }
            let open = search + (rest.len() - trimmed.len());
            let Some(close) = matching_delim(source, open, '(', ')') else {
                continue;
            };

            let after = &source[close..];
            let body_offset = close + (after.len() - after.trim_start().len());
            let body = if source[body_offset..].starts_with('{') {
                let end = matching_brace(source, body_offset).unwrap_or(source.len());
                &source[body_offset..end]
            } else {
                let end = source[body_offset..]
                    .find(';')
                    .map(|i| body_offset + i + 1)
                    .unwrap_or(source.len());
                &source[body_offset..end]
            };

            loops.push(LoopSpan {
                condition: &source[open..close],
                body,
                start,
            });
        }
    }

    loops.sort_by_key(|l| l.start);
    loops
}

/// Replace `//` and `/* */` comments with spaces, keeping byte offsets
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    let mut in_string: Option<char> = None;

    while let Some((_, c)) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match (c, chars.peek().map(|(_, n)| *n)) {
            ('"', _) | ('\'', _) => {
                in_string = Some(c);
                out.push(c);
            }
            ('/', Some('/')) => {
                out.push(' ');
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                    blank(&mut out, n);
                }
            }
            ('/', Some('*')) => {
                out.push(' ');
                let mut prev = ' ';
                for (_, n) in chars.by_ref() {
                    blank(&mut out, n);
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Push whitespace of the same byte width, keeping newlines
fn blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    }
}

/// Text from the last `function` keyword before `start` up to the first
/// closing brace after `end`. Falls back to the start of the source.
pub fn function_context(source: &str, start: usize, end: usize) -> &str {
    let from = source[..start].rfind("function").unwrap_or(0);
    let to = source[end..]
        .find('}')
        .map(|i| end + i + 1)
        .unwrap_or(source.len());
    &source[from..to]
}

/// Start of the receiver expression that ends at `end`, stepping back over
/// identifiers, dots and balanced parentheses: `payable(msg.sender)` in
/// `payable(msg.sender).call`.
pub fn receiver_start(source: &str, end: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = end;
    while i > 0 {
        let b = bytes[i - 1];
        if b == b')' {
            let mut depth = 0usize;
            let mut j = i;
            while j > 0 {
                j -= 1;
                match bytes[j] {
                    b')' => depth += 1,
                    b'(' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if depth != 0 {
                return i;
            }
            i = j;
        } else if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
            i -= 1;
        } else {
            break;
        }
    }
    i
}

/// First line of a snippet, trimmed
pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// `pragma solidity X;` capture
pub fn pragma_version(source: &str) -> Option<&str> {
    let mut search = 0;
    while let Some(rel) = source[search..].find("pragma") {
        search += rel + "pragma".len();
        let rest = &source[search..];
        let after_ws = rest.trim_start();
        if after_ws.len() == rest.len() {
            continue;
        }
        let Some(after_kw) = after_ws.strip_prefix("solidity") else {
            continue;
        };
        let version = after_kw.trim_start();
        if version.len() == after_kw.len() {
            continue;
        }
        if let Some(semi) = version.find(';') {
            let v = version[..semi].trim();
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
contract Vault {
    function deposit() external payable { balances[msg.sender] += msg.value; }
    function withdraw(uint256 amount) external nonReentrant {
        if (amount > 0) { payable(msg.sender).call{value: amount}(""); }
    }
}
interface IToken { function mint(address to, uint256 amt) external; }
"#;

    #[test]
    fn test_function_spans() {
        let spans = function_spans(SAMPLE);
        let names: Vec<_> = spans.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["deposit", "withdraw", "mint"]);

        let withdraw = &spans[1];
        assert!(withdraw.header.contains("nonReentrant"));
        assert!(withdraw.body.contains(".call{value: amount}"));
        assert!(withdraw.body.trim_end().ends_with('}'));

        assert!(spans[2].body.is_empty());
    }

    #[test]
    fn test_function_context() {
        let at = SAMPLE.find(".call").unwrap();
        let ctx = function_context(SAMPLE, at, at + 5);
        assert!(ctx.starts_with("function withdraw"));
        assert!(ctx.contains("nonReentrant"));
    }

    #[test]
    fn test_pragma_version() {
        assert_eq!(pragma_version("pragma solidity ^0.8.20;"), Some("^0.8.20"));
        assert_eq!(pragma_version("contract A {}"), None);
    }

    #[test]
    fn test_loop_spans() {
        let src = "for (uint i = 0; i < users.length; i++) { users[i].call(\"\"); } while (x) y++;";
        let loops = loop_spans(src);
        assert_eq!(loops.len(), 2);
        assert!(loops[0].condition.contains("users.length"));
        assert!(loops[0].body.contains(".call("));
        assert_eq!(loops[1].body, "y++;");
    }

    #[test]
    fn test_strip_comments_keeps_offsets() {
        let src = "// SPDX-License-Identifier: MIT\nuint a = b - c; /* x - y */ string s = \"//\";";
        let stripped = strip_comments(src);
        assert_eq!(stripped.len(), src.len());
        assert!(!stripped.contains("SPDX"));
        assert!(!stripped.contains("x - y"));
        assert!(stripped.contains("b - c"));
        assert!(stripped.contains("\"//\""));
    }

    #[test]
    fn test_receiver_start() {
        let src = "(bool ok,) = payable(msg.sender).call{value: 1}(\"\");";
        let dot = src.find(").call").unwrap() + 1;
        assert_eq!(&src[receiver_start(src, dot)..dot], "payable(msg.sender)");

        let src = "x = msg.sender.send(1);";
        let dot = src.rfind(".send").unwrap();
        assert_eq!(&src[receiver_start(src, dot)..dot], "msg.sender");

        let src = "a) .call(";
        assert_eq!(receiver_start(src, 2), 2);
    }

    #[test]
    fn test_empty_source() {
        assert!(function_spans("").is_empty());
        assert_eq!(function_context("", 0, 0), "");
        assert_eq!(first_line(""), "");
    }
}
