#![forbid(unsafe_code)]

//! Numeric element, property and event codes.
//!
//! The codes are stable: compiled element-descriptor trees refer to them by
//! number, so every variant keeps the integer it was assigned. Converting an
//! unrecognised integer yields a fatal error rather than a fallback.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ElementKind
// ---------------------------------------------------------------------------

/// What kind of node a builder call creates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Row,
    Column,
    Integer,
    Decimal,
    Boolean,
    Text,
    Image,
    IFrame,
    /// Placeholder that anchors dynamically inserted content.
    Comment,
    CheckBox,
    TextInput,
    ContainerElement,
    Rive,
    Document,
    /// Pseudo-node whose children become siblings in the host.
    Wrapper,
    Code,
    CodeChild,
    /// Custom element with its own tag name.
    WebComponent(String),
    Video,
}

impl ElementKind {
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Row => 0,
            Self::Column => 1,
            Self::Integer => 2,
            Self::Decimal => 3,
            Self::Boolean => 4,
            Self::Text => 5,
            Self::Image => 6,
            Self::IFrame => 7,
            Self::Comment => 8,
            Self::CheckBox => 9,
            Self::TextInput => 10,
            Self::ContainerElement => 11,
            Self::Rive => 12,
            Self::Document => 13,
            Self::Wrapper => 14,
            Self::Code => 15,
            Self::CodeChild => 16,
            Self::WebComponent(_) => 17,
            Self::Video => 18,
        }
    }

    /// Decode a kind from its code. `WebComponent` (17) needs a tag name.
    pub fn from_code(code: i32, tag: Option<&str>) -> Result<Self> {
        Ok(match code {
            0 => Self::Row,
            1 => Self::Column,
            2 => Self::Integer,
            3 => Self::Decimal,
            4 => Self::Boolean,
            5 => Self::Text,
            6 => Self::Image,
            7 => Self::IFrame,
            8 => Self::Comment,
            9 => Self::CheckBox,
            10 => Self::TextInput,
            11 => Self::ContainerElement,
            12 => Self::Rive,
            13 => Self::Document,
            14 => Self::Wrapper,
            15 => Self::Code,
            16 => Self::CodeChild,
            17 => match tag {
                Some(tag) if !tag.is_empty() => Self::WebComponent(tag.to_owned()),
                _ => return Err(Error::UnknownElementKind(code)),
            },
            18 => Self::Video,
            other => return Err(Error::UnknownElementKind(other)),
        })
    }

    /// Kinds rendered as an anchor marker instead of an element.
    #[must_use]
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Comment | Self::Wrapper)
    }

    /// HTML tag for element kinds; `None` for marker kinds.
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        Some(match self {
            Self::Comment | Self::Wrapper => return None,
            Self::Image => "img",
            Self::Video => "video",
            Self::IFrame => "iframe",
            Self::CheckBox | Self::TextInput => "input",
            Self::Rive => "canvas",
            Self::Code => "pre",
            Self::CodeChild => "code",
            Self::WebComponent(tag) => tag.as_str(),
            Self::Row
            | Self::Column
            | Self::Integer
            | Self::Decimal
            | Self::Boolean
            | Self::Text
            | Self::ContainerElement
            | Self::Document => "div",
        })
    }

    /// Classes every node of this kind starts with.
    #[must_use]
    pub fn default_classes(&self) -> &'static [&'static str] {
        match self {
            Self::Column => &["ft_column"],
            Self::Row => &["ft_row"],
            Self::Document => &["ft_column", "ft_full_size"],
            _ => &[],
        }
    }

    /// Attributes every node of this kind starts with. `None` values are
    /// bare attributes.
    #[must_use]
    pub fn default_attributes(&self) -> &'static [(&'static str, Option<&'static str>)] {
        match self {
            Self::IFrame => &[("allowfullscreen", None)],
            Self::CheckBox => &[("type", Some("checkbox"))],
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// PropertyKind
// ---------------------------------------------------------------------------

macro_rules! property_kinds {
    ($($name:ident = $code:literal),+ $(,)?) => {
        /// Which concrete style, attribute or content mutation a property
        /// write performs.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        #[repr(i32)]
        pub enum PropertyKind {
            $($name = $code),+
        }

        impl PropertyKind {
            /// Every kind, in code order.
            pub const ALL: &'static [PropertyKind] = &[$(PropertyKind::$name),+];

            #[must_use]
            pub const fn code(self) -> i32 {
                self as i32
            }

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(PropertyKind::$name => stringify!($name)),+
                }
            }
        }

        impl TryFrom<i32> for PropertyKind {
            type Error = Error;

            fn try_from(code: i32) -> Result<Self> {
                match code {
                    $($code => Ok(PropertyKind::$name),)+
                    other => Err(Error::UnknownPropertyKind(other)),
                }
            }
        }
    };
}

property_kinds! {
    Color = 0,
    IntegerValue = 1,
    StringValue = 2,
    DecimalValue = 3,
    BooleanValue = 4,
    Width = 5,
    Padding = 6,
    Height = 7,
    Id = 8,
    BorderWidth = 9,
    BorderStyle = 10,
    Margin = 11,
    Background = 12,
    PaddingHorizontal = 13,
    PaddingVertical = 14,
    PaddingLeft = 15,
    PaddingRight = 16,
    PaddingTop = 17,
    PaddingBottom = 18,
    MarginHorizontal = 19,
    MarginVertical = 20,
    MarginLeft = 21,
    MarginRight = 22,
    MarginTop = 23,
    MarginBottom = 24,
    Role = 25,
    ZIndex = 26,
    Sticky = 27,
    Top = 28,
    Bottom = 29,
    Left = 30,
    Right = 31,
    Overflow = 32,
    OverflowX = 33,
    OverflowY = 34,
    Spacing = 35,
    Wrap = 36,
    TextTransform = 37,
    TextIndent = 38,
    TextAlign = 39,
    LineClamp = 40,
    Opacity = 41,
    Cursor = 42,
    Resize = 43,
    MinHeight = 44,
    MaxHeight = 45,
    MinWidth = 46,
    MaxWidth = 47,
    WhiteSpace = 48,
    BorderTopWidth = 49,
    BorderBottomWidth = 50,
    BorderLeftWidth = 51,
    BorderRightWidth = 52,
    BorderRadius = 53,
    BorderTopLeftRadius = 54,
    BorderTopRightRadius = 55,
    BorderBottomLeftRadius = 56,
    BorderBottomRightRadius = 57,
    BorderStyleVertical = 58,
    BorderStyleHorizontal = 59,
    BorderLeftStyle = 60,
    BorderRightStyle = 61,
    BorderTopStyle = 62,
    BorderBottomStyle = 63,
    BorderColor = 64,
    BorderLeftColor = 65,
    BorderRightColor = 66,
    BorderTopColor = 67,
    BorderBottomColor = 68,
    AlignSelf = 69,
    Classes = 70,
    Anchor = 71,
    Link = 72,
    Children = 73,
    OpenInNewTab = 74,
    TextStyle = 75,
    Region = 76,
    AlignContent = 77,
    Display = 78,
    Checked = 79,
    Enabled = 80,
    TextInputType = 81,
    Placeholder = 82,
    Multiline = 83,
    DefaultTextInputValue = 84,
    Loading = 85,
    Src = 86,
    YoutubeSrc = 87,
    Code = 88,
    ImageSrc = 89,
    Alt = 90,
    MetaTitle = 91,
    MetaOGTitle = 92,
    MetaTwitterTitle = 93,
    MetaDescription = 94,
    MetaOGDescription = 95,
    MetaTwitterDescription = 96,
    MetaOGImage = 97,
    MetaTwitterImage = 98,
    MetaThemeColor = 99,
    Shadow = 100,
    CodeTheme = 101,
    CodeLanguage = 102,
    CodeShowLineNumber = 103,
    Css = 104,
    Js = 105,
    LinkRel = 106,
    InputMaxLength = 107,
    Favicon = 108,
    Fit = 109,
    VideoSrc = 110,
    Autoplay = 111,
    Poster = 112,
    LoopVideo = 113,
    Controls = 114,
    Muted = 115,
    LinkColor = 116,
    TextShadow = 117,
    Selectable = 118,
    BackdropFilter = 119,
    Mask = 120,
    TextInputValue = 121,
    FetchPriority = 122,
    MetaFacebookDomainVerification = 123,
}

impl From<PropertyKind> for i32 {
    fn from(kind: PropertyKind) -> Self {
        kind.code()
    }
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Events a node can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseEnter,
    MouseLeave,
    ClickOutside,
    /// All listed keys held down at once.
    GlobalKey(Vec<String>),
    /// Listed keys pressed in order.
    GlobalKeySeq(Vec<String>),
    Input,
    Change,
    Blur,
    Focus,
}

impl EventKind {
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Click => 0,
            Self::MouseEnter => 1,
            Self::MouseLeave => 2,
            Self::ClickOutside => 3,
            Self::GlobalKey(_) => 4,
            Self::GlobalKeySeq(_) => 5,
            Self::Input => 6,
            Self::Change => 7,
            Self::Blur => 8,
            Self::Focus => 9,
        }
    }

    /// Decode an event from its code; key events take their key list.
    pub fn from_code(code: i32, keys: Vec<String>) -> Result<Self> {
        Ok(match code {
            0 => Self::Click,
            1 => Self::MouseEnter,
            2 => Self::MouseLeave,
            3 => Self::ClickOutside,
            4 => Self::GlobalKey(keys),
            5 => Self::GlobalKeySeq(keys),
            6 => Self::Input,
            7 => Self::Change,
            8 => Self::Blur,
            9 => Self::Focus,
            other => return Err(Error::UnknownEventKind(other)),
        })
    }
}
