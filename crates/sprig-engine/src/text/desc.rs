use bitflags::bitflags;

bitflags! {
    /// Style flags selecting a face within a font family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontFlags: u8 {
        const BOLD   = 0b01;
        const ITALIC = 0b10;
    }
}

bitflags! {
    /// Text anchoring relative to the position passed to `push_text`.
    ///
    /// Empty means top-left.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextAlign: u8 {
        const CENTER_X = 0b0001;
        const RIGHT    = 0b0010;
        const CENTER_Y = 0b0100;
        const BOTTOM   = 0b1000;
        const CENTER   = Self::CENTER_X.bits() | Self::CENTER_Y.bits();
    }
}

/// Edge treatment of rasterized glyphs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum FontQuality {
    /// Coverage is thresholded to fully on or off.
    Aliased,
    #[default]
    Antialiased,
}

/// Everything that determines a glyph atlas build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontDesc {
    pub family: String,
    /// Requested pixel height.
    pub height: u32,
    pub flags: FontFlags,
    pub quality: FontQuality,
}

impl FontDesc {
    pub fn new(family: impl Into<String>, height: u32) -> Self {
        Self {
            family: family.into(),
            height,
            flags: FontFlags::empty(),
            quality: FontQuality::default(),
        }
    }

    pub fn with_flags(mut self, flags: FontFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_quality(mut self, quality: FontQuality) -> Self {
        self.quality = quality;
        self
    }
}
