//! Pages and symbols understood by the cluster display

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Screen context a package is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Page {
    /// Audio page (single body line)
    #[default]
    Audio,
    /// Telephone page (up to four body lines)
    Telephone,
    /// Any other page owned by the gateway
    Other,
}

// Wire format values
const PAGE_AUDIO: u8 = 0x03;
const PAGE_TELEPHONE: u8 = 0x05;
const PAGE_OTHER: u8 = 0x00;

impl Page {
    /// Parse a page from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            PAGE_AUDIO => Some(Page::Audio),
            PAGE_TELEPHONE => Some(Page::Telephone),
            PAGE_OTHER => Some(Page::Other),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Page::Audio => PAGE_AUDIO,
            Page::Telephone => PAGE_TELEPHONE,
            Page::Other => PAGE_OTHER,
        }
    }

    /// Returns true if the page can show more than one body line
    pub fn is_multiline(&self) -> bool {
        matches!(self, Page::Telephone)
    }
}

/// Small glyphs shown above and below the body text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Symbol {
    #[default]
    None,
    /// |>>
    SkipTrack,
    /// <<|
    PrevTrack,
    /// >>
    FastForward,
    /// <<
    FastRewind,
    /// ▶
    Play,
    /// ◀
    Rewind,
    /// ↑
    UpArrow,
    /// ↓
    DownArrow,
}

const SYMBOL_NONE: u8 = 0x00;
const SYMBOL_SKIP_TRACK: u8 = 0x01;
const SYMBOL_PREV_TRACK: u8 = 0x02;
const SYMBOL_FAST_FORWARD: u8 = 0x03;
const SYMBOL_FAST_REWIND: u8 = 0x04;
const SYMBOL_PLAY: u8 = 0x05;
const SYMBOL_REWIND: u8 = 0x06;
const SYMBOL_UP_ARROW: u8 = 0x09;
const SYMBOL_DOWN_ARROW: u8 = 0x0A;

impl Symbol {
    /// Parse a symbol from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SYMBOL_NONE => Some(Symbol::None),
            SYMBOL_SKIP_TRACK => Some(Symbol::SkipTrack),
            SYMBOL_PREV_TRACK => Some(Symbol::PrevTrack),
            SYMBOL_FAST_FORWARD => Some(Symbol::FastForward),
            SYMBOL_FAST_REWIND => Some(Symbol::FastRewind),
            SYMBOL_PLAY => Some(Symbol::Play),
            SYMBOL_REWIND => Some(Symbol::Rewind),
            SYMBOL_UP_ARROW => Some(Symbol::UpArrow),
            SYMBOL_DOWN_ARROW => Some(Symbol::DownArrow),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Symbol::None => SYMBOL_NONE,
            Symbol::SkipTrack => SYMBOL_SKIP_TRACK,
            Symbol::PrevTrack => SYMBOL_PREV_TRACK,
            Symbol::FastForward => SYMBOL_FAST_FORWARD,
            Symbol::FastRewind => SYMBOL_FAST_REWIND,
            Symbol::Play => SYMBOL_PLAY,
            Symbol::Rewind => SYMBOL_REWIND,
            Symbol::UpArrow => SYMBOL_UP_ARROW,
            Symbol::DownArrow => SYMBOL_DOWN_ARROW,
        }
    }
}
