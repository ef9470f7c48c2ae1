//! Text-case modifier

use syslane_config::TextCase;
use syslane_protocol::SyslogMessage;

use crate::{Modifier, TransformResult};

/// Upper- or lower-cases the message text
#[derive(Debug, Clone, Copy)]
pub struct TextCaseModifier {
    case: TextCase,
}

impl TextCaseModifier {
    pub const fn new(case: TextCase) -> Self {
        Self { case }
    }
}

impl Modifier for TextCaseModifier {
    fn modify(&self, message: SyslogMessage) -> TransformResult<SyslogMessage> {
        let body = match self.case {
            TextCase::Upper => message.body().to_uppercase(),
            TextCase::Lower => message.body().to_lowercase(),
        };
        Ok(message.with_body(body))
    }

    fn name(&self) -> &'static str {
        "text_case"
    }
}
