//! Structured syslog parser
//!
//! Decodes `[<PRI>[VERSION] ][TIMESTAMP HOST APP PROCID MSGID ][SD...] MESSAGE`.
//! Parsing is total: any header or structured-data mismatch yields the raw
//! fallback event instead of an error.

use std::collections::BTreeMap;

use chrono::DateTime;

use crate::{Charset, MAX_PRI, StructuredData, StructuredEvent, split_pri};

const NIL: &str = "-";
const BOM: char = '\u{FEFF}';

/// Parser for inbound syslog frames
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredMessageParser {
    charset: Charset,
}

impl StructuredMessageParser {
    /// Create a parser that decodes text with the given charset
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Parse one frame. Never fails.
    pub fn parse(&self, bytes: &[u8]) -> StructuredEvent {
        let text = self.charset.decode(bytes);
        parse_text(&text)
    }
}

/// Parse one UTF-8 frame with the default parser
pub fn parse(bytes: &[u8]) -> StructuredEvent {
    StructuredMessageParser::default().parse(bytes)
}

fn parse_text(text: &str) -> StructuredEvent {
    let mut cursor = Cursor::new(text);

    let pri = cursor.pri();
    let (facility, severity) = match pri.and_then(split_pri) {
        Some((f, s)) => (Some(f), Some(s)),
        None => (None, None),
    };

    match decompose(&mut cursor) {
        Some(mut event) => {
            event.facility = facility;
            event.severity = severity;
            event
        }
        None => StructuredEvent {
            facility,
            severity,
            ..StructuredEvent::raw(text)
        },
    }
}

fn decompose(cursor: &mut Cursor<'_>) -> Option<StructuredEvent> {
    let version = cursor.version();
    cursor.skip_spaces();

    let timestamp = match cursor.token()? {
        NIL => None,
        raw => Some(DateTime::parse_from_rfc3339(raw).ok()?),
    };
    let host = nil_to_none(cursor.token()?);
    let app_name = nil_to_none(cursor.token()?);
    let proc_id = nil_to_none(cursor.token()?);
    let msg_id = nil_to_none(cursor.token()?);

    let structured_data = cursor.structured_data()?;
    let message = cursor.rest();
    let message = message.strip_prefix(BOM).unwrap_or(message);

    Some(StructuredEvent {
        facility: None,
        severity: None,
        version,
        timestamp,
        host,
        app_name,
        proc_id,
        msg_id,
        structured_data,
        message: message.to_string(),
        structured: true,
    })
}

fn nil_to_none(token: &str) -> Option<String> {
    (token != NIL).then(|| token.to_string())
}

/// Byte cursor over the decoded frame. All delimiters are ASCII, so slicing
/// at their positions always lands on char boundaries.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while self.eat(b' ') {}
    }

    /// `<N>` with N ≤ 191. Leaves the cursor untouched when absent.
    fn pri(&mut self) -> Option<u8> {
        let rest = self.remaining().strip_prefix('<')?;
        let end = rest.find('>')?;
        let digits = &rest[..end];
        if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u8 = digits.parse().ok()?;
        if value > MAX_PRI {
            return None;
        }
        self.pos += end + 2;
        Some(value)
    }

    /// Version digits directly followed by a space
    fn version(&mut self) -> Option<u32> {
        let rest = self.remaining();
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 || rest.as_bytes().get(len) != Some(&b' ') {
            return None;
        }
        let version = rest[..len].parse().ok()?;
        self.pos += len + 1;
        Some(version)
    }

    /// One non-empty space-terminated token; consumes the separating space
    fn token(&mut self) -> Option<&'a str> {
        let rest = self.remaining();
        let len = rest.find(' ').unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        self.eat(b' ');
        Some(&rest[..len])
    }

    /// `-`, zero or more `[...]` elements. Consumes one trailing space.
    fn structured_data(&mut self) -> Option<StructuredData> {
        let mut data = StructuredData::new();
        let rest = self.remaining();
        if rest == NIL || rest.starts_with("- ") {
            self.pos += 1;
            self.eat(b' ');
            return Some(data);
        }
        while self.peek() == Some(b'[') {
            let (id, params) = self.sd_element()?;
            // Repeated SD-ID replaces the earlier element
            data.insert(id, params);
        }
        self.eat(b' ');
        Some(data)
    }

    fn sd_element(&mut self) -> Option<(String, BTreeMap<String, String>)> {
        self.eat(b'[');
        let id = self.sd_name()?;
        let mut params = BTreeMap::new();
        loop {
            match self.peek()? {
                b']' => {
                    self.pos += 1;
                    return Some((id, params));
                }
                b' ' => {
                    self.skip_spaces();
                    if self.peek()? == b']' {
                        continue;
                    }
                    let key = self.sd_name()?;
                    if !self.eat(b'=') || !self.eat(b'"') {
                        return None;
                    }
                    let value = self.sd_value()?;
                    params.insert(key, value);
                }
                _ => return None,
            }
        }
    }

    /// SD-NAME: printable ASCII except `=`, space, `]` and `"`
    fn sd_name(&mut self) -> Option<String> {
        let rest = self.remaining();
        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_graphic() && !matches!(b, b'=' | b']' | b'"'))
            .count();
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(rest[..len].to_string())
    }

    /// Quoted value after the opening `"`. Handles `\"`, `\\` and `\]`;
    /// any other backslash is kept literally.
    fn sd_value(&mut self) -> Option<String> {
        let mut value = String::new();
        let mut chars = self.remaining().char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += idx + 1;
                    return Some(value);
                }
                '\\' => match chars.clone().next() {
                    Some((_, next @ ('"' | '\\' | ']'))) => {
                        chars.next();
                        value.push(next);
                    }
                    _ => value.push('\\'),
                },
                _ => value.push(c),
            }
        }
        None
    }

    fn rest(&self) -> &'a str {
        self.remaining()
    }
}
