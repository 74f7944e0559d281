//! Package encoding for the AGW → IC display protocol
//!
//! Layouts (all bytes before the checksum are covered by it):
//! ```text
//! Init   (0x24): PAGE 24 02 60 01 04 00 00 00 13 00 01 UPPER 02 LOWER [FIELD] CS
//! Header (0x29): PAGE 29 00 [FIELD] CS
//! Body   (0x26): PAGE 26 LINES 00 LEN (FMT TEXT.. 00)* CS
//!
//! FIELD = LEN FMT TEXT.. 00    (LEN counts the bytes after itself)
//! FMT   = 0x10 centered, 0x08 left justified
//! ```
//!
//! The init preamble is copied verbatim from gateway traffic; its meaning is
//! unknown, the cluster only needs to see it.

use heapless::Vec;

use crate::glyph::{encode_glyphs, GlyphError};
use crate::page::{Page, Symbol};

pub use crate::glyph::GlyphPolicy;

/// Maximum package size, bounded by the eight-frame transport
pub const MAX_PAYLOAD_SIZE: usize = 55;

/// Maximum number of body lines on the Telephone page
pub const MAX_BODY_LINES: usize = 4;

// Package ids
pub const PKG_INIT: u8 = 0x24;
pub const PKG_BODY: u8 = 0x26;
pub const PKG_HEADER: u8 = 0x29;

// Text format bytes
const FMT_CENTERED: u8 = 0x10;
const FMT_LEFT: u8 = 0x08;

const TEXT_TERMINATOR: u8 = 0x00;

/// Unknown constant block that follows the id of every init package
const INIT_PREAMBLE: [u8; 9] = [0x02, 0x60, 0x01, 0x04, 0x00, 0x00, 0x00, 0x13, 0x00];

// Slot markers in front of the two symbol codes of an init package
const INIT_UPPER_SLOT: u8 = 0x01;
const INIT_LOWER_SLOT: u8 = 0x02;

/// Errors raised while building a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PackageError {
    /// Package would not fit in the 55 byte transport
    PayloadTooLarge,
    /// Text cannot be sent
    Glyph(GlyphError),
    /// Package type is not valid for this page
    WrongPage(Page),
    /// Multi-line body needs between 1 and 4 lines
    LineCount,
    /// Checksum of a received package does not match
    InvalidChecksum,
    /// Package id or page byte not recognised
    Unknown,
}

impl From<GlyphError> for PackageError {
    fn from(e: GlyphError) -> Self {
        PackageError::Glyph(e)
    }
}

/// The package types the gateway sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PackageKind {
    /// Page setup (package 24)
    Init,
    /// Page body text (package 26)
    Body,
    /// Page header text (package 29)
    Header,
}

impl PackageKind {
    /// Parse a package kind from its id byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            PKG_INIT => Some(PackageKind::Init),
            PKG_BODY => Some(PackageKind::Body),
            PKG_HEADER => Some(PackageKind::Header),
            _ => None,
        }
    }

    /// Convert to id byte
    pub fn to_byte(self) -> u8 {
        match self {
            PackageKind::Init => PKG_INIT,
            PackageKind::Body => PKG_BODY,
            PackageKind::Header => PKG_HEADER,
        }
    }
}

/// Package checksum
///
/// The algorithm was inferred from captured traffic. It lives behind a
/// trait so a corrected variant can be dropped in without touching the
/// encoder.
pub trait Checksum {
    /// Checksum over all package bytes that precede it
    fn checksum(bytes: &[u8]) -> u8;
}

/// Checksum used by the factory gateway
///
/// Starts at 0xFF and subtracts both the index and the value of every byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgwChecksum;

impl Checksum for AgwChecksum {
    fn checksum(bytes: &[u8]) -> u8 {
        bytes
            .iter()
            .enumerate()
            .fold(0xFFu8, |cs, (i, &b)| cs.wrapping_sub(i as u8).wrapping_sub(b))
    }
}

/// Bytes of one package, reused between sends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadBuffer {
    bytes: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl PayloadBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Copy an already encoded package into a buffer
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PackageError> {
        let mut buffer = Self::new();
        buffer.extend(bytes)?;
        Ok(buffer)
    }

    /// Drop the previous contents
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Number of bytes currently held
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encoded bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn push(&mut self, byte: u8) -> Result<(), PackageError> {
        self.bytes
            .push(byte)
            .map_err(|_| PackageError::PayloadTooLarge)
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), PackageError> {
        self.bytes
            .extend_from_slice(bytes)
            .map_err(|_| PackageError::PayloadTooLarge)
    }

    /// Reserve a length byte, returning its position for [`Self::close_length`]
    fn open_length(&mut self) -> Result<usize, PackageError> {
        let at = self.bytes.len();
        self.push(0)?;
        Ok(at)
    }

    /// Write the number of bytes added since `at` into the reserved byte
    fn close_length(&mut self, at: usize) {
        let len = self.bytes.len() - at - 1;
        self.bytes[at] = len as u8;
    }
}

/// A package ready to be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Package<'a> {
    /// Set up a page: header text plus the symbols above and below the body
    ///
    /// Must reach the cluster once per page activation, before any header or
    /// body package for that page.
    Init {
        page: Page,
        header: &'a str,
        centered: bool,
        upper: Symbol,
        lower: Symbol,
    },
    /// Replace the header text of a page
    Header {
        page: Page,
        text: &'a str,
        centered: bool,
    },
    /// Replace the single body line of a page
    Body {
        page: Page,
        text: &'a str,
        centered: bool,
    },
    /// Replace the body of the Telephone page with up to four lines
    BodyMultiline { page: Page, lines: &'a [&'a str] },
}

impl<'a> Package<'a> {
    /// Page the package is addressed to
    pub fn page(&self) -> Page {
        match *self {
            Package::Init { page, .. }
            | Package::Header { page, .. }
            | Package::Body { page, .. }
            | Package::BodyMultiline { page, .. } => page,
        }
    }

    /// Package type on the wire
    pub fn kind(&self) -> PackageKind {
        match self {
            Package::Init { .. } => PackageKind::Init,
            Package::Header { .. } => PackageKind::Header,
            Package::Body { .. } | Package::BodyMultiline { .. } => PackageKind::Body,
        }
    }

    /// Encode with the factory checksum into a fresh buffer
    pub fn encode(&self, policy: GlyphPolicy) -> Result<PayloadBuffer, PackageError> {
        let mut buffer = PayloadBuffer::new();
        self.encode_into::<AgwChecksum>(&mut buffer, policy)?;
        Ok(buffer)
    }

    /// Encode into `buffer`, overwriting it
    ///
    /// Returns the package length including the checksum. On error the
    /// buffer contents are meaningless and must not be sent.
    pub fn encode_into<C: Checksum>(
        &self,
        buffer: &mut PayloadBuffer,
        policy: GlyphPolicy,
    ) -> Result<usize, PackageError> {
        buffer.clear();
        buffer.push(self.page().to_byte())?;
        buffer.push(self.kind().to_byte())?;

        match *self {
            Package::Init {
                header,
                centered,
                upper,
                lower,
                ..
            } => {
                buffer.extend(&INIT_PREAMBLE)?;
                buffer.extend(&[INIT_UPPER_SLOT, upper.to_byte()])?;
                buffer.extend(&[INIT_LOWER_SLOT, lower.to_byte()])?;
                push_text_field(buffer, header, centered, policy)?;
            }
            Package::Header { text, centered, .. } => {
                buffer.push(0x00)?;
                push_text_field(buffer, text, centered, policy)?;
            }
            Package::Body { text, centered, .. } => {
                push_body(buffer, &[text], centered, policy)?;
            }
            Package::BodyMultiline { page, lines } => {
                if !page.is_multiline() {
                    return Err(PackageError::WrongPage(page));
                }
                if lines.is_empty() || lines.len() > MAX_BODY_LINES {
                    return Err(PackageError::LineCount);
                }
                push_body(buffer, lines, true, policy)?;
            }
        }

        let checksum = C::checksum(buffer.as_slice());
        buffer.push(checksum)?;
        Ok(buffer.len())
    }
}

/// Check the checksum of a received package and read its page and type
pub fn inspect<C: Checksum>(payload: &[u8]) -> Result<(Page, PackageKind), PackageError> {
    let (&checksum, content) = payload.split_last().ok_or(PackageError::Unknown)?;
    if content.len() < 2 {
        return Err(PackageError::Unknown);
    }
    if C::checksum(content) != checksum {
        return Err(PackageError::InvalidChecksum);
    }
    let page = Page::from_byte(content[0]).ok_or(PackageError::Unknown)?;
    let kind = PackageKind::from_byte(content[1]).ok_or(PackageError::Unknown)?;
    Ok((page, kind))
}

fn format_byte(centered: bool) -> u8 {
    if centered {
        FMT_CENTERED
    } else {
        FMT_LEFT
    }
}

/// FMT TEXT.. 00
fn push_line(
    buffer: &mut PayloadBuffer,
    text: &str,
    centered: bool,
    policy: GlyphPolicy,
) -> Result<(), PackageError> {
    buffer.push(format_byte(centered))?;
    for code in encode_glyphs(text, policy) {
        buffer.push(code?)?;
    }
    buffer.push(TEXT_TERMINATOR)
}

/// LEN FMT TEXT.. 00
fn push_text_field(
    buffer: &mut PayloadBuffer,
    text: &str,
    centered: bool,
    policy: GlyphPolicy,
) -> Result<(), PackageError> {
    let len_at = buffer.open_length()?;
    push_line(buffer, text, centered, policy)?;
    buffer.close_length(len_at);
    Ok(())
}

/// LINES 00 LEN (FMT TEXT.. 00)*
fn push_body(
    buffer: &mut PayloadBuffer,
    lines: &[&str],
    centered: bool,
    policy: GlyphPolicy,
) -> Result<(), PackageError> {
    buffer.push(lines.len() as u8)?;
    buffer.push(0x00)?;
    let len_at = buffer.open_length()?;
    for line in lines {
        push_line(buffer, line, centered, policy)?;
    }
    buffer.close_length(len_at);
    Ok(())
}
