//! Glyph widths of the cluster display font
//!
//! The cluster renders text in a proportional font. Whether a string fits on
//! the 56 px wide body line can only be decided by summing glyph widths, so
//! the width of every character code is tabulated here.
//!
//! One code is special: sending `~` (0x7E) makes the cluster lock up. The
//! table marks it with [`CRASH_GLYPH_WIDTH`] and every text that leaves this
//! crate goes through [`encode_glyphs`], which refuses it unless the caller
//! picked a [`GlyphPolicy`] that strips or replaces it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width in pixels of the body line on the cluster display
pub const DISPLAY_WIDTH_PX: u32 = 56;

/// Gap in pixels the cluster puts after every glyph
pub const GLYPH_GAP_PX: u32 = 1;

/// Table value marking the glyph that crashes the cluster
pub const CRASH_GLYPH_WIDTH: u8 = 99;

/// Character code of the glyph that crashes the cluster
pub const CRASH_GLYPH: u8 = 0x7E;

/// Pixel width of every character code
#[rustfmt::skip]
static GLYPH_WIDTHS: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 7, 6, 0, 0, 0,
    0, 6, 6, 6, 7, 7, 3, 2,
    7, 7, 0, 0,10,10, 6, 6,
    6, 3, 4, 6, 6, 6, 6, 2,
    5, 5, 6, 6, 3, 5, 2, 6,
    7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 3, 4, 5, 6, 5, 6,

    6, 7, 7, 7, 7, 6, 6, 7,
    7, 3, 5, 7, 6, 7, 0, 0,
    7, 7, 7, 7, 7, 7, 7,11,
    7, 7, 7, 4, 6, 4, 3, 6,
    3, 6, 6, 6, 6, 7, 6, 8,
    6, 3, 5, 6, 3, 9, 7, 7,
    6, 6, 6, 6, 5, 7, 7, 9,
    7, 6, 6, 6, 2, 6,99, 0,

    7, 6, 8, 9, 6, 6, 6, 6,
    7, 6, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,

    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
];

/// Errors raised while turning text into cluster character codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlyphError {
    /// Text contains the glyph that crashes the cluster
    CrashGlyph {
        /// Character index within the text
        index: usize,
    },
    /// Character has no single-byte code
    Unencodable {
        /// Character index within the text
        index: usize,
    },
}

/// What to do with the crash glyph when it shows up in outgoing text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GlyphPolicy {
    /// Refuse the whole text
    #[default]
    Reject,
    /// Drop the glyph
    Strip,
    /// Send this code instead
    Replace(u8),
}

/// Raw table value for a character code
///
/// Printable glyphs are 2–11 px wide, codes without a glyph are 0, and the
/// crash glyph reads [`CRASH_GLYPH_WIDTH`].
pub fn width_of(code: u8) -> u8 {
    GLYPH_WIDTHS[code as usize]
}

/// Returns true if the code must never be sent to the cluster
pub fn is_forbidden(code: u8) -> bool {
    width_of(code) == CRASH_GLYPH_WIDTH
}

/// Map a character onto the cluster's single-byte character set
pub fn encode_char(c: char) -> Option<u8> {
    u8::try_from(u32::from(c)).ok()
}

/// Rendered width of `text` in pixels, gaps included
///
/// Characters without a glyph (and characters outside the single-byte set)
/// take no space.
pub fn text_width(text: &str) -> u32 {
    codes_width(text.chars().filter_map(encode_char))
}

/// Rendered width of the codes `text` is sent as under `policy`
///
/// Fails like the encoder would, so a crash glyph under
/// [`GlyphPolicy::Reject`] is reported as such rather than as a wide glyph.
pub fn text_width_with(text: &str, policy: GlyphPolicy) -> Result<u32, GlyphError> {
    let mut width = 0;
    for code in encode_glyphs(text, policy) {
        width += codes_width(core::iter::once(code?));
    }
    Ok(width)
}

fn codes_width(codes: impl Iterator<Item = u8>) -> u32 {
    codes
        .map(|code| u32::from(width_of(code)))
        .filter(|&width| width > 0)
        .map(|width| width + GLYPH_GAP_PX)
        .sum()
}

/// Returns true if `text` fits on the body line
pub fn can_fit_body_text(text: &str) -> bool {
    text_width(text) <= DISPLAY_WIDTH_PX
}

/// Check that `text` can be sent as-is
pub fn validate(text: &str) -> Result<(), GlyphError> {
    encode_glyphs(text, GlyphPolicy::Reject).try_for_each(|code| code.map(|_| ()))
}

/// Encode `text` into character codes, applying `policy` to the crash glyph
///
/// The iterator yields an error for the first character that cannot be
/// sent; callers stop there.
pub fn encode_glyphs(
    text: &str,
    policy: GlyphPolicy,
) -> impl Iterator<Item = Result<u8, GlyphError>> + '_ {
    text.chars().enumerate().filter_map(move |(index, c)| {
        let code = match encode_char(c) {
            Some(code) => code,
            None => return Some(Err(GlyphError::Unencodable { index })),
        };
        if !is_forbidden(code) {
            return Some(Ok(code));
        }
        match policy {
            GlyphPolicy::Reject => Some(Err(GlyphError::CrashGlyph { index })),
            GlyphPolicy::Strip => None,
            GlyphPolicy::Replace(other) if !is_forbidden(other) => Some(Ok(other)),
            GlyphPolicy::Replace(_) => Some(Err(GlyphError::CrashGlyph { index })),
        }
    })
}
