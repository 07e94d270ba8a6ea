use std::collections::HashSet;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, std::hash::Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
}

/// A named colour usable both in the terminal and in the gradient description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub name: &'static str,
    pub color: Color,
}

const fn swatch(name: &'static str, color: Color) -> Swatch {
    Swatch { name, color }
}

/// Ordered colours for chart buckets; lookups wrap around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

impl Palette {
    pub fn new(swatches: Vec<Swatch>) -> Self {
        Self { swatches }
    }

    pub fn get(&self, idx: usize) -> Swatch {
        if self.swatches.is_empty() {
            return swatch("gray", Color::Gray);
        }
        self.swatches[idx % self.swatches.len()]
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    names: HashSet<ThemeName>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.names.contains(theme)
    }

    pub fn palette(&self, theme: &ThemeName) -> Palette {
        let swatches = match theme {
            ThemeName::Dark => vec![
                swatch("tomato", Color::Rgb(255, 99, 71)),
                swatch("orange", Color::Rgb(255, 165, 0)),
                swatch("gold", Color::Rgb(255, 215, 0)),
                swatch("mediumseagreen", Color::Rgb(60, 179, 113)),
                swatch("dodgerblue", Color::Rgb(30, 144, 255)),
            ],
            ThemeName::Light => vec![
                swatch("firebrick", Color::Rgb(178, 34, 34)),
                swatch("darkorange", Color::Rgb(255, 140, 0)),
                swatch("goldenrod", Color::Rgb(218, 165, 32)),
                swatch("seagreen", Color::Rgb(46, 139, 87)),
                swatch("royalblue", Color::Rgb(65, 105, 225)),
            ],
            ThemeName::HighContrast => vec![
                swatch("red", Color::Red),
                swatch("yellow", Color::Yellow),
                swatch("green", Color::Green),
                swatch("cyan", Color::Cyan),
                swatch("magenta", Color::Magenta),
            ],
        };
        Palette::new(swatches)
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let names = [ThemeName::Dark, ThemeName::Light, ThemeName::HighContrast]
            .into_iter()
            .collect();
        Self { names }
    }
}
