//! Sequential modifier - appends a wrapping counter
//!
//! Each message gets ` #N`, where N runs from `first` to `last` and then
//! wraps back to `first`. With padding on, N is left-padded to the width of
//! `last`.

use parking_lot::Mutex;
use syslane_config::SequentialConfig;
use syslane_protocol::SyslogMessage;

use crate::{Modifier, TransformResult};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Bounded, wrapping message counter
#[derive(Debug)]
pub struct SequentialModifier {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    config: SequentialConfig,
    next: u64,
}

impl SequentialModifier {
    /// Create a counter starting at `config.first`
    pub fn new(config: SequentialConfig) -> Self {
        let next = config.first;
        Self {
            state: Mutex::new(State { config, next }),
        }
    }

    /// Value the next message will carry
    pub fn peek(&self) -> u64 {
        self.state.lock().next
    }

    /// Move the counter; values outside `[first, last]` are ignored
    pub fn set_next(&self, value: u64) -> bool {
        let mut state = self.state.lock();
        if value < state.config.first || value > state.config.last {
            return false;
        }
        state.next = value;
        true
    }

    /// Change the lower bound. No-op (returns false) if it would exceed `last`.
    pub fn set_first(&self, first: u64) -> bool {
        let mut state = self.state.lock();
        if !state.config.set_first(first) {
            return false;
        }
        state.next = state.next.max(first);
        true
    }

    /// Change the upper bound. No-op (returns false) if it would fall below
    /// `first`.
    pub fn set_last(&self, last: u64) -> bool {
        let mut state = self.state.lock();
        if !state.config.set_last(last) {
            return false;
        }
        if state.next > last {
            state.next = state.config.first;
        }
        true
    }

    /// Current bounds
    pub fn bounds(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.config.first, state.config.last)
    }

    fn advance(&self) -> String {
        let mut state = self.state.lock();
        let current = state.next;
        state.next = if current >= state.config.last {
            state.config.first
        } else {
            current + 1
        };

        let digits = current.to_string();
        if !state.config.use_padding {
            return digits;
        }
        let width = state.config.last.to_string().len();
        let mut padded: String = std::iter::repeat_n(
            state.config.pad_char,
            width.saturating_sub(digits.len()),
        )
        .collect();
        padded.push_str(&digits);
        padded
    }
}

impl Modifier for SequentialModifier {
    fn modify(&self, message: SyslogMessage) -> TransformResult<SyslogMessage> {
        let number = self.advance();
        let body = format!("{} #{}", message.body(), number);
        Ok(message.with_body(body))
    }

    fn name(&self) -> &'static str {
        "sequential"
    }

    fn strip(&self, message: &SyslogMessage) -> Option<SyslogMessage> {
        let pad_char = self.state.lock().config.pad_char;
        let body = message.body();
        let at = body.rfind(" #")?;
        let number = &body[at + 2..];
        let well_formed = !number.is_empty()
            && number.chars().any(|c| c.is_ascii_digit())
            && number.chars().all(|c| c.is_ascii_digit() || c == pad_char);
        if !well_formed {
            return None;
        }
        Some(message.clone().with_body(body[..at].to_string()))
    }
}
