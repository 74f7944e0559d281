//! Remembered page content
//!
//! Keeps a copy of the text we last put on each page so it can be put back
//! after the factory gateway took the page over. Only text is kept; the
//! payload buffer is never reused across operations.

use agwlink_protocol::package::MAX_BODY_LINES;
use agwlink_protocol::{Package, Page, Symbol, MAX_PAYLOAD_SIZE};
use heapless::{String, Vec};

/// Longest text worth remembering (every glyph can take two UTF-8 bytes)
pub const MAX_TEXT_BYTES: usize = 2 * MAX_PAYLOAD_SIZE;

type Text = String<MAX_TEXT_BYTES>;

fn copy_text(text: &str) -> Option<Text> {
    let mut copy = Text::new();
    copy.push_str(text).ok()?;
    Some(copy)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InitContent {
    header: Text,
    centered: bool,
    upper: Symbol,
    lower: Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextContent {
    text: Text,
    centered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyContent {
    Single(TextContent),
    Lines(Vec<Text, MAX_BODY_LINES>),
}

/// Last content sent to one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    init: Option<InitContent>,
    header: Option<TextContent>,
    body: Option<BodyContent>,
}

impl PageContent {
    /// Returns true if nothing was sent to the page yet
    pub fn is_empty(&self) -> bool {
        self.init.is_none() && self.header.is_none() && self.body.is_none()
    }

    /// Remember a package that reached the cluster
    ///
    /// Text too long to copy is forgotten instead of truncated.
    pub fn remember(&mut self, package: &Package) {
        match *package {
            Package::Init {
                header,
                centered,
                upper,
                lower,
                ..
            } => {
                self.init = copy_text(header).map(|header| InitContent {
                    header,
                    centered,
                    upper,
                    lower,
                });
                // A fresh init wipes the page
                self.header = None;
                self.body = None;
            }
            Package::Header { text, centered, .. } => {
                self.header = copy_text(text).map(|text| TextContent { text, centered });
            }
            Package::Body { text, centered, .. } => {
                self.body =
                    copy_text(text).map(|text| BodyContent::Single(TextContent { text, centered }));
            }
            Package::BodyMultiline { lines, .. } => {
                self.body = lines
                    .iter()
                    .map(|line| copy_text(line))
                    .collect::<Option<Vec<Text, MAX_BODY_LINES>>>()
                    .map(BodyContent::Lines);
            }
        }
    }

    /// Call `send` with every remembered package for `page`, init first
    ///
    /// Stops at the first error.
    pub fn replay<E>(
        &self,
        page: Page,
        mut send: impl FnMut(&Package) -> Result<(), E>,
    ) -> Result<(), E> {
        if let Some(init) = &self.init {
            send(&Package::Init {
                page,
                header: &init.header,
                centered: init.centered,
                upper: init.upper,
                lower: init.lower,
            })?;
        }
        if let Some(header) = &self.header {
            send(&Package::Header {
                page,
                text: &header.text,
                centered: header.centered,
            })?;
        }
        match &self.body {
            Some(BodyContent::Single(body)) => send(&Package::Body {
                page,
                text: &body.text,
                centered: body.centered,
            }),
            Some(BodyContent::Lines(lines)) => {
                let refs: Vec<&str, MAX_BODY_LINES> = lines.iter().map(Text::as_str).collect();
                send(&Package::BodyMultiline { page, lines: &refs })
            }
            None => Ok(()),
        }
    }
}

/// Remembered content of every page
#[derive(Debug, Clone, Default)]
pub struct PageContents {
    audio: PageContent,
    telephone: PageContent,
    other: PageContent,
}

impl PageContents {
    pub fn get(&self, page: Page) -> &PageContent {
        match page {
            Page::Audio => &self.audio,
            Page::Telephone => &self.telephone,
            Page::Other => &self.other,
        }
    }

    pub fn get_mut(&mut self, page: Page) -> &mut PageContent {
        match page {
            Page::Audio => &mut self.audio,
            Page::Telephone => &mut self.telephone,
            Page::Other => &mut self.other,
        }
    }
}
