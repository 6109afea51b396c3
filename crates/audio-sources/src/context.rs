//! Provider contexts
//!
//! Each producer reports what its source is currently doing. The router only
//! uses these for policy decisions (interrupt, resume, incoming detection).
//! Discriminants are fixed; focus selection tables elsewhere index by them.

use serde::{Deserialize, Serialize};

/// What an audio source is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AudioContext {
    /// Disconnected
    #[default]
    Disconnected = 0,
    /// Connected but not receiving an audio stream
    Connected = 1,
    /// Receiving a stream with undefined content (tones, music, video)
    IsStreaming = 2,
    /// Receiving a stream with playing content (music or video)
    IsPlaying = 3,
    /// Receiving a voice assistant response
    IsVaResponse = 4,
    /// Receiving a stream with paused content
    IsPaused = 5,
}

impl AudioContext {
    /// Whether a focused source in this context counts as incoming.
    ///
    /// Contexts ranked above `IsPlaying` qualify: a voice assistant response
    /// and a paused stream.
    pub fn is_incoming(&self) -> bool {
        matches!(self, Self::IsVaResponse | Self::IsPaused)
    }
}

/// What a voice source is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoiceContext {
    #[default]
    Disconnected = 0,
    Connected = 1,
    RingingOutgoing = 2,
    RingingIncoming = 3,
    InCall = 4,
    InCallWithIncoming = 5,
    InCallWithOutgoing = 6,
    InCallWithHeld = 7,
    CallHeld = 8,
    InMultipartyCall = 9,
}

impl VoiceContext {
    /// Whether a focused source in this context counts as incoming.
    ///
    /// Every context with call activity qualifies, i.e. anything ranked above
    /// `Connected`.
    pub fn is_incoming(&self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connected)
    }

    /// Whether there is a call in progress (active, held or multiparty)
    pub fn is_in_call(&self) -> bool {
        matches!(
            self,
            Self::InCall
                | Self::InCallWithIncoming
                | Self::InCallWithOutgoing
                | Self::InCallWithHeld
                | Self::CallHeld
                | Self::InMultipartyCall
        )
    }
}

/// Context of a generic source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceContext {
    Audio(AudioContext),
    Voice(VoiceContext),
}

impl SourceContext {
    /// Whether the source is audio and playing
    pub fn is_audio_playing(&self) -> bool {
        matches!(self, Self::Audio(AudioContext::IsPlaying))
    }

    /// Whether the source is audio and rendering a voice assistant response
    pub fn is_va_response(&self) -> bool {
        matches!(self, Self::Audio(AudioContext::IsVaResponse))
    }

    /// Whether a focused source in this context counts as incoming
    pub fn is_incoming(&self) -> bool {
        match self {
            Self::Audio(context) => context.is_incoming(),
            Self::Voice(context) => context.is_incoming(),
        }
    }
}
