//! File list color palettes.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::core::config::color::Color;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumString,
    IntoStaticStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    #[default]
    Default,
    Modern,
    Classic,
    DeepBlue,
    Custom,
}

/// Foreground/background pairs for normal, alternate, selected and cursor rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTheme {
    pub norm_fg: Color,
    pub norm_bg: Color,
    pub alt_fg: Color,
    pub alt_bg: Color,
    pub sel_fg: Color,
    pub sel_bg: Color,
    pub curs_fg: Color,
    pub curs_bg: Color,
}

/// Foreground used for locked tab labels in styled-text mode.
pub const ACCENT: Color = Color::from_rgb8(0x3b, 0x82, 0xf6);

impl ColorTheme {
    pub const fn light() -> Self {
        Self {
            norm_fg: Color::from_rgb8(0x11, 0x18, 0x27),
            norm_bg: Color::from_rgb8(0xff, 0xff, 0xff),
            alt_fg: Color::from_rgb8(0x11, 0x18, 0x27),
            alt_bg: Color::from_rgb8(0xf9, 0xfa, 0xfb),
            sel_fg: Color::from_rgb8(0xff, 0x00, 0x00),
            sel_bg: Color::from_rgb8(0xff, 0xff, 0xff),
            curs_fg: Color::from_rgb8(0xff, 0xff, 0xff),
            curs_bg: Color::from_rgb8(0x3b, 0x82, 0xf6),
        }
    }

    pub const fn classic() -> Self {
        Self {
            norm_fg: Color::from_rgb8(0xff, 0xff, 0xff),
            norm_bg: Color::from_rgb8(0x00, 0x00, 0x44),
            alt_fg: Color::from_rgb8(0xff, 0xff, 0xff),
            alt_bg: Color::from_rgb8(0x00, 0x00, 0x44),
            sel_fg: Color::from_rgb8(0xff, 0xff, 0x00),
            sel_bg: Color::from_rgb8(0x00, 0x00, 0x44),
            curs_fg: Color::from_rgb8(0x00, 0x00, 0x00),
            curs_bg: Color::from_rgb8(0xaa, 0xaa, 0xaa),
        }
    }

    pub const fn deep_blue() -> Self {
        Self {
            norm_fg: Color::from_rgb8(0x00, 0xff, 0xff),
            norm_bg: Color::from_rgb8(0x00, 0x00, 0x80),
            alt_fg: Color::from_rgb8(0x00, 0xff, 0xff),
            alt_bg: Color::from_rgb8(0x00, 0x00, 0x80),
            sel_fg: Color::from_rgb8(0xff, 0xff, 0x00),
            sel_bg: Color::from_rgb8(0x00, 0x00, 0x80),
            curs_fg: Color::from_rgb8(0x00, 0x00, 0x00),
            curs_bg: Color::from_rgb8(0x00, 0x80, 0x80),
        }
    }

    /// Initial values of the user editable palette.
    pub const fn custom_default() -> Self {
        Self {
            norm_fg: Color::from_rgb8(0xff, 0xff, 0xff),
            norm_bg: Color::from_rgb8(0x00, 0x00, 0x44),
            alt_fg: Color::from_rgb8(0xff, 0xff, 0xff),
            alt_bg: Color::from_rgb8(0x00, 0x00, 0x44),
            sel_fg: Color::from_rgb8(0xff, 0x00, 0x00),
            sel_bg: Color::from_rgb8(0x00, 0x00, 0x44),
            curs_fg: Color::from_rgb8(0x00, 0x00, 0x00),
            curs_bg: Color::from_rgb8(0xaa, 0xaa, 0xaa),
        }
    }

    pub fn builtin(mode: ColorMode) -> Option<Self> {
        match mode {
            ColorMode::Default | ColorMode::Modern => Some(Self::light()),
            ColorMode::Classic => Some(Self::classic()),
            ColorMode::DeepBlue => Some(Self::deep_blue()),
            ColorMode::Custom => None,
        }
    }

    /// Colors in storage key order (norm, alt, sel, curs; fg before bg).
    pub fn colors(&self) -> [Color; 8] {
        [
            self.norm_fg,
            self.norm_bg,
            self.alt_fg,
            self.alt_bg,
            self.sel_fg,
            self.sel_bg,
            self.curs_fg,
            self.curs_bg,
        ]
    }

    pub fn colors_mut(&mut self) -> [&mut Color; 8] {
        [
            &mut self.norm_fg,
            &mut self.norm_bg,
            &mut self.alt_fg,
            &mut self.alt_bg,
            &mut self.sel_fg,
            &mut self.sel_bg,
            &mut self.curs_fg,
            &mut self.curs_bg,
        ]
    }
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self::light()
    }
}
