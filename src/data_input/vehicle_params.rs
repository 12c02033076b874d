// src/data_input/vehicle_params.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InputError;

pub const DEFAULT_WEIGHT_G: f64 = 250.0;

/// Frame class by prop size, as offered by the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FrameSize {
    #[serde(rename = "65mm")]
    Whoop65,
    #[serde(rename = "75mm")]
    Whoop75,
    #[serde(rename = "85mm")]
    Whoop85,
    #[serde(rename = "2\"")]
    TwoInch,
    #[serde(rename = "2.5\"")]
    TwoHalfInch,
    #[serde(rename = "3\"")]
    ThreeInch,
    #[serde(rename = "3.5\"")]
    ThreeHalfInch,
    #[serde(rename = "4\"")]
    FourInch,
    #[serde(rename = "5\"")]
    FiveInch,
    #[serde(rename = "6\"")]
    SixInch,
    #[serde(rename = "7\"")]
    SevenInch,
}

impl FrameSize {
    pub const ALL: [FrameSize; 11] = [
        FrameSize::Whoop65,
        FrameSize::Whoop75,
        FrameSize::Whoop85,
        FrameSize::TwoInch,
        FrameSize::TwoHalfInch,
        FrameSize::ThreeInch,
        FrameSize::ThreeHalfInch,
        FrameSize::FourInch,
        FrameSize::FiveInch,
        FrameSize::SixInch,
        FrameSize::SevenInch,
    ];

    /// Label as shown in the upload form.
    pub fn label(self) -> &'static str {
        match self {
            FrameSize::Whoop65 => "65mm",
            FrameSize::Whoop75 => "75mm",
            FrameSize::Whoop85 => "85mm",
            FrameSize::TwoInch => "2\"",
            FrameSize::TwoHalfInch => "2.5\"",
            FrameSize::ThreeInch => "3\"",
            FrameSize::ThreeHalfInch => "3.5\"",
            FrameSize::FourInch => "4\"",
            FrameSize::FiveInch => "5\"",
            FrameSize::SixInch => "6\"",
            FrameSize::SevenInch => "7\"",
        }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        FrameSize::FiveInch
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrameSize {
    type Err = InputError;

    /// Accepts the form labels plus `in`/`inch` spellings and bare inch numbers ("5", "5in", "2.5inch").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(' ', "");
        let inches = normalized
            .trim_end_matches('"')
            .trim_end_matches("inch")
            .trim_end_matches("in");

        if let Some(mm) = normalized.strip_suffix("mm") {
            return match mm {
                "65" => Ok(FrameSize::Whoop65),
                "75" => Ok(FrameSize::Whoop75),
                "85" => Ok(FrameSize::Whoop85),
                _ => Err(InputError::UnknownFrameSize(s.to_string())),
            };
        }

        match inches {
            "2" => Ok(FrameSize::TwoInch),
            "2.5" => Ok(FrameSize::TwoHalfInch),
            "3" => Ok(FrameSize::ThreeInch),
            "3.5" => Ok(FrameSize::ThreeHalfInch),
            "4" => Ok(FrameSize::FourInch),
            "5" => Ok(FrameSize::FiveInch),
            "6" => Ok(FrameSize::SixInch),
            "7" => Ok(FrameSize::SevenInch),
            _ => Err(InputError::UnknownFrameSize(s.to_string())),
        }
    }
}

/// Tuning style preset selected by the pilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuningStyle {
    Freestyle,
    Cinematic,
    Racing,
}

impl TuningStyle {
    pub fn name(self) -> &'static str {
        match self {
            TuningStyle::Freestyle => "freestyle",
            TuningStyle::Cinematic => "cinematic",
            TuningStyle::Racing => "racing",
        }
    }
}

impl Default for TuningStyle {
    fn default() -> Self {
        TuningStyle::Freestyle
    }
}

impl fmt::Display for TuningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TuningStyle {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "freestyle" => Ok(TuningStyle::Freestyle),
            "cinematic" => Ok(TuningStyle::Cinematic),
            "racing" => Ok(TuningStyle::Racing),
            _ => Err(InputError::UnknownStyle(s.to_string())),
        }
    }
}

/// Vehicle parameters supplied alongside the log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleParams {
    pub weight_g: f64,
    pub frame_size: FrameSize,
    pub style: TuningStyle,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            weight_g: DEFAULT_WEIGHT_G,
            frame_size: FrameSize::default(),
            style: TuningStyle::default(),
        }
    }
}

impl VehicleParams {
    pub fn new(weight_g: f64, frame_size: FrameSize, style: TuningStyle) -> Result<Self, InputError> {
        if !weight_g.is_finite() || weight_g <= 0.0 {
            return Err(InputError::InvalidWeight(weight_g.to_string()));
        }
        Ok(Self {
            weight_g,
            frame_size,
            style,
        })
    }

    /// Builds parameters from the raw form strings. Empty strings fall back to defaults.
    pub fn from_form(weight: &str, size: &str, style: &str) -> Result<Self, InputError> {
        let weight_g = match weight.trim() {
            "" => DEFAULT_WEIGHT_G,
            w => w
                .parse::<f64>()
                .map_err(|_| InputError::InvalidWeight(w.to_string()))?,
        };
        let frame_size = match size.trim() {
            "" => FrameSize::default(),
            s => s.parse()?,
        };
        Self::new(weight_g, frame_size, style.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_parses_form_labels() {
        for frame in FrameSize::ALL {
            assert_eq!(frame.label().parse::<FrameSize>(), Ok(frame));
        }
        assert_eq!("5in".parse::<FrameSize>(), Ok(FrameSize::FiveInch));
        assert_eq!(" 2.5 inch".parse::<FrameSize>(), Ok(FrameSize::TwoHalfInch));
        assert!("10\"".parse::<FrameSize>().is_err());
        assert!("90mm".parse::<FrameSize>().is_err());
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("Racing".parse::<TuningStyle>(), Ok(TuningStyle::Racing));
        assert_eq!("".parse::<TuningStyle>(), Ok(TuningStyle::Freestyle));
        assert_eq!(
            "smooth".parse::<TuningStyle>(),
            Err(InputError::UnknownStyle("smooth".to_string()))
        );
    }

    #[test]
    fn test_from_form_defaults_and_validation() {
        let params = VehicleParams::from_form("", "", "").unwrap();
        assert_eq!(params, VehicleParams::default());

        let params = VehicleParams::from_form("650", "5\"", "cinematic").unwrap();
        assert_eq!(params.weight_g, 650.0);
        assert_eq!(params.style, TuningStyle::Cinematic);

        assert!(matches!(
            VehicleParams::from_form("-3", "5\"", "racing"),
            Err(InputError::InvalidWeight(_))
        ));
        assert!(matches!(
            VehicleParams::from_form("heavy", "5\"", "racing"),
            Err(InputError::InvalidWeight(_))
        ));
    }
}
