use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Pixel layout of the raw sensor frame.
///
/// The Bayer variants name the 2x2 colour filter pattern starting at the top left texel.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorFormat {
    GRBG,
    RGGB,
    GBRG,
    BGGR,
    /// Already full colour, sampled as is.
    RGBA,
}

impl SensorFormat {
    pub const ALL: [SensorFormat; 5] = [
        SensorFormat::GRBG,
        SensorFormat::RGGB,
        SensorFormat::GBRG,
        SensorFormat::BGGR,
        SensorFormat::RGBA,
    ];

    /// Name of the entry point loading this format.
    pub fn entry_point(&self) -> &'static str {
        match self {
            SensorFormat::GRBG => "load_GRBG_image",
            SensorFormat::RGGB => "load_RGGB_image",
            SensorFormat::GBRG => "load_GBRG_image",
            SensorFormat::BGGR => "load_BGGR_image",
            SensorFormat::RGBA => "load_RGBA_image",
        }
    }

    /// Offset of the red texel within the 2x2 mosaic, `None` for full colour frames.
    pub fn first_red(&self) -> Option<[f64; 2]> {
        match self {
            SensorFormat::GRBG => Some([1.0, 0.0]),
            SensorFormat::RGGB => Some([0.0, 0.0]),
            SensorFormat::GBRG => Some([0.0, 1.0]),
            SensorFormat::BGGR => Some([1.0, 1.0]),
            SensorFormat::RGBA => None,
        }
    }

    pub fn is_bayer(&self) -> bool {
        self.first_red().is_some()
    }
}

impl Display for SensorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for SensorFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorFormat::ALL
            .into_iter()
            .find(|format| format.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown sensor format {s:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_offsets_cover_the_mosaic() {
        let mut offsets: Vec<[u8; 2]> = SensorFormat::ALL
            .iter()
            .filter_map(|format| format.first_red())
            .map(|[x, y]| [x as u8, y as u8])
            .collect();
        offsets.sort();
        assert_eq!(offsets, vec![[0, 0], [0, 1], [1, 0], [1, 1]]);
    }

    #[test]
    fn parses_names() {
        assert_eq!("bggr".parse::<SensorFormat>(), Ok(SensorFormat::BGGR));
        assert!("rgb".parse::<SensorFormat>().is_err());
    }
}
