//! Transmission mode selection.

use crate::domain::{Attachment, MessageContent};
use crate::ports::FileKind;

/// Four mutually exclusive ways to transmit a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionMode<'a> {
    Text,
    TextWithButtons,
    FileWithCaption(&'a Attachment),
    FileWithCaptionAndButtons(&'a Attachment),
}

impl<'a> TransmissionMode<'a> {
    pub fn select(content: &'a MessageContent) -> Self {
        let has_buttons = !content.buttons.is_empty();
        match (&content.attachment, has_buttons) {
            (None, false) => TransmissionMode::Text,
            (None, true) => TransmissionMode::TextWithButtons,
            (Some(a), false) => TransmissionMode::FileWithCaption(a),
            (Some(a), true) => TransmissionMode::FileWithCaptionAndButtons(a),
        }
    }

    pub fn attachment(&self) -> Option<&'a Attachment> {
        match *self {
            TransmissionMode::FileWithCaption(a) | TransmissionMode::FileWithCaptionAndButtons(a) => {
                Some(a)
            }
            _ => None,
        }
    }

    /// Buttons on a file only render when the file is sent as an image.
    pub fn file_kind(&self) -> FileKind {
        match self {
            TransmissionMode::FileWithCaptionAndButtons(_) => FileKind::Image,
            _ => FileKind::AutoDetect,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransmissionMode::Text => "text",
            TransmissionMode::TextWithButtons => "text_with_buttons",
            TransmissionMode::FileWithCaption(_) => "file_with_caption",
            TransmissionMode::FileWithCaptionAndButtons(_) => "file_with_caption_and_buttons",
        }
    }
}
