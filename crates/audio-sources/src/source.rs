//! Source identifiers
//!
//! Audio and voice sources are identified by small integers. Index 0 is
//! always the "none" source; the rest are assigned to the producers built
//! into the firmware image (A2DP, USB, line-in, HFP, LE audio).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest number of ids a registry can hold, `NONE` included
pub const MAX_SOURCE_IDS: usize = u8::MAX as usize + 1;

/// Identifier of an audio (media) source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AudioSource(pub u8);

impl AudioSource {
    pub const NONE: Self = Self(0);
    pub const A2DP_1: Self = Self(1);
    pub const A2DP_2: Self = Self(2);
    pub const USB: Self = Self(3);
    pub const LINE_IN: Self = Self(4);
    pub const LE_AUDIO_UNICAST: Self = Self(5);
    pub const LE_AUDIO_BROADCAST: Self = Self(6);

    /// Number of audio source ids known to the default image, `NONE` included
    pub const COUNT: usize = 7;

    /// Whether this is the "none" source
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Whether this is one of the LE audio sources
    pub fn is_le_audio(&self) -> bool {
        *self == Self::LE_AUDIO_UNICAST || *self == Self::LE_AUDIO_BROADCAST
    }

    /// Index into per-source tables
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match *self {
            Self::NONE => "none",
            Self::A2DP_1 => "a2dp_1",
            Self::A2DP_2 => "a2dp_2",
            Self::USB => "usb",
            Self::LINE_IN => "line_in",
            Self::LE_AUDIO_UNICAST => "le_audio_unicast",
            Self::LE_AUDIO_BROADCAST => "le_audio_broadcast",
            _ => "audio",
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Identifier of a voice (call) source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct VoiceSource(pub u8);

impl VoiceSource {
    pub const NONE: Self = Self(0);
    pub const HFP_1: Self = Self(1);
    pub const HFP_2: Self = Self(2);
    pub const USB: Self = Self(3);
    pub const LE_AUDIO_UNICAST: Self = Self(4);

    /// Number of voice source ids known to the default image, `NONE` included
    pub const COUNT: usize = 5;

    /// Whether this is the "none" source
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Whether this is the LE audio voice source
    pub fn is_le_audio(&self) -> bool {
        *self == Self::LE_AUDIO_UNICAST
    }

    /// Index into per-source tables
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match *self {
            Self::NONE => "none",
            Self::HFP_1 => "hfp_1",
            Self::HFP_2 => "hfp_2",
            Self::USB => "usb",
            Self::LE_AUDIO_UNICAST => "le_audio_unicast",
            _ => "voice",
        }
    }
}

impl fmt::Display for VoiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Kind of a generic source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Audio,
    Voice,
}

/// An audio or voice source, as seen by the router
///
/// Two generic sources are the same source only if both kind and id match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericSource {
    Audio(AudioSource),
    Voice(VoiceSource),
}

impl GenericSource {
    /// Kind of this source
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Audio(_) => SourceKind::Audio,
            Self::Voice(_) => SourceKind::Voice,
        }
    }

    /// Raw id within the source's kind
    pub fn id(&self) -> u8 {
        match self {
            Self::Audio(s) => s.0,
            Self::Voice(s) => s.0,
        }
    }

    /// Whether the id is the "none" source of its kind
    pub fn is_none(&self) -> bool {
        self.id() == 0
    }

    /// Whether this is an audio source
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio(_))
    }

    /// Whether this is a voice source
    pub fn is_voice(&self) -> bool {
        matches!(self, Self::Voice(_))
    }

    /// Whether this is one of the LE audio sources
    pub fn is_le_audio(&self) -> bool {
        match self {
            Self::Audio(s) => s.is_le_audio(),
            Self::Voice(s) => s.is_le_audio(),
        }
    }

    /// The audio source, if this is one
    pub fn as_audio(&self) -> Option<AudioSource> {
        match self {
            Self::Audio(s) => Some(*s),
            Self::Voice(_) => None,
        }
    }

    /// The voice source, if this is one
    pub fn as_voice(&self) -> Option<VoiceSource> {
        match self {
            Self::Voice(s) => Some(*s),
            Self::Audio(_) => None,
        }
    }
}

impl Default for GenericSource {
    fn default() -> Self {
        Self::Audio(AudioSource::NONE)
    }
}

impl From<AudioSource> for GenericSource {
    fn from(source: AudioSource) -> Self {
        Self::Audio(source)
    }
}

impl From<VoiceSource> for GenericSource {
    fn from(source: VoiceSource) -> Self {
        Self::Voice(source)
    }
}

impl fmt::Display for GenericSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio(s) => write!(f, "audio:{}", s),
            Self::Voice(s) => write!(f, "voice:{}", s),
        }
    }
}
