//! Class index to display color mapping.

use serde::{Deserialize, Serialize};
use wms_common::{WmsError, WmsResult};

/// Colors for segmentation classes, indexed by class id.
///
/// Classes past the end of the table are drawn as gray levels
/// (`class * 255`, saturating), so the default binary palette renders
/// class 0 black and every other class white.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPalette {
    colors: Vec<[u8; 3]>,
}

impl ClassPalette {
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self { colors }
    }

    /// Black background, white foreground.
    pub fn binary() -> Self {
        Self::new(vec![[0, 0, 0], [255, 255, 255]])
    }

    /// Build a palette from `#rrggbb` strings.
    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> WmsResult<Self> {
        colors
            .iter()
            .map(|c| {
                hex_to_rgb(c.as_ref()).ok_or_else(|| {
                    WmsError::validation("palette", format!("invalid color '{}'", c.as_ref()))
                })
            })
            .collect::<WmsResult<Vec<_>>>()
            .map(Self::new)
    }

    pub fn color(&self, class: u16) -> [u8; 3] {
        match self.colors.get(class as usize) {
            Some(color) => *color,
            None => {
                let level = (u32::from(class) * 255).min(255) as u8;
                [level, level, level]
            }
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ClassPalette {
    fn default() -> Self {
        Self::binary()
    }
}

fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_default() {
        let palette = ClassPalette::default();
        assert_eq!(palette.color(0), [0, 0, 0]);
        assert_eq!(palette.color(1), [255, 255, 255]);
        assert_eq!(palette.color(7), [255, 255, 255]);
    }

    #[test]
    fn test_empty_palette_falls_back_to_gray() {
        let palette = ClassPalette::new(Vec::new());
        assert!(palette.is_empty());
        assert_eq!(palette.color(0), [0, 0, 0]);
        assert_eq!(palette.color(3), [255, 255, 255]);
    }

    #[test]
    fn test_from_hex() {
        let palette = ClassPalette::from_hex(&["#000000", "1f77b4", "#FF7F0E"]).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.color(1), [0x1f, 0x77, 0xb4]);
        assert_eq!(palette.color(2), [0xff, 0x7f, 0x0e]);

        let err = ClassPalette::from_hex(&["#12345"]).unwrap_err();
        assert_eq!(err.field(), Some("palette"));
    }
}
