//! Content page layouts.
//!
//! A content page carries two text slots and one image slot. The layout decides
//! which of those slots are shown and how they are arranged on the sheet:
//!
//! | Layout | Arrangement | Slots (reading order) |
//! |---|---|---|
//! | `layout1` | stacked column | text1, image, text2 |
//! | `layout2` | stacked column | image, text1 |
//! | `layout3` | side by side | image \| text1, text2 |
//! | `layout4` | full-bleed image + caption strip | image, text1, text2 |
//!
//! Layouts are a closed set. Switching layout never touches the slot values;
//! a slot the new layout does not use is simply not rendered.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three content slots of a content page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Text1,
    Image,
    Text2,
}

/// Fixed arrangement of slots on a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// Slots stacked top to bottom.
    Stack(&'static [Slot]),
    /// One slot in the left half, the rest stacked in the right half.
    SideBySide {
        left: Slot,
        right: &'static [Slot],
    },
    /// One slot fills the whole sheet, the rest sit in a strip along the bottom edge.
    FullBleed {
        background: Slot,
        caption: &'static [Slot],
    },
}

impl Arrangement {
    /// Slots this arrangement renders, in reading order.
    pub fn slots(&self) -> Vec<Slot> {
        match *self {
            Arrangement::Stack(slots) => slots.to_vec(),
            Arrangement::SideBySide { left, right } => {
                std::iter::once(left).chain(right.iter().copied()).collect()
            }
            Arrangement::FullBleed {
                background,
                caption,
            } => std::iter::once(background)
                .chain(caption.iter().copied())
                .collect(),
        }
    }

    pub fn uses(&self, slot: Slot) -> bool {
        self.slots().contains(&slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Layout1,
    Layout2,
    Layout3,
    Layout4,
}

impl Layout {
    pub const ALL: [Layout; 4] = [
        Layout::Layout1,
        Layout::Layout2,
        Layout::Layout3,
        Layout::Layout4,
    ];

    pub fn arrangement(self) -> Arrangement {
        match self {
            Layout::Layout1 => Arrangement::Stack(&[Slot::Text1, Slot::Image, Slot::Text2]),
            Layout::Layout2 => Arrangement::Stack(&[Slot::Image, Slot::Text1]),
            Layout::Layout3 => Arrangement::SideBySide {
                left: Slot::Image,
                right: &[Slot::Text1, Slot::Text2],
            },
            Layout::Layout4 => Arrangement::FullBleed {
                background: Slot::Image,
                caption: &[Slot::Text1, Slot::Text2],
            },
        }
    }

    /// Identifier used on the wire and in the CLI.
    pub fn id(self) -> &'static str {
        match self {
            Layout::Layout1 => "layout1",
            Layout::Layout2 => "layout2",
            Layout::Layout3 => "layout3",
            Layout::Layout4 => "layout4",
        }
    }

    /// Short human label for layout pickers.
    pub fn label(self) -> &'static str {
        match self {
            Layout::Layout1 => "Text / Image / Text",
            Layout::Layout2 => "Image / Text",
            Layout::Layout3 => "Image | Text",
            Layout::Layout4 => "Free layout",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown layout '{0}' (expected layout1..layout4)")]
pub struct UnknownLayout(pub String);

impl FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .into_iter()
            .find(|l| l.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLayout(s.to_string()))
    }
}
