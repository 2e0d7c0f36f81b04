//! Layered (fractal) gradient noise.
//!
//! Composites octaves of Perlin noise. Each octave uses its own generator
//! seeded with `seed + octave`, multiplies frequency by `lacunarity` and
//! amplitude by `gain`. The sum is normalized by the geometric amplitude bound
//! so every fractal type stays within `[-1, 1]`.

use std::fmt;
use std::str::FromStr;

use glam::IVec2;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::error::ParamError;

/// How octaves are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FractalType {
    /// A single octave of plain gradient noise.
    None,
    /// Sum of octaves (fractal Brownian motion).
    #[default]
    Fbm,
    /// Sum of rectified octaves, `|n| * 2 - 1`. Produces rounded, puffy shapes.
    Billow,
    /// Sum of inverted rectified octaves, `1 - |n|`. Produces sharp ridges.
    RigidMulti,
}

impl FractalType {
    const NAMES: &'static str = "none, fbm, billow, rigid_multi";
}

impl FromStr for FractalType {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "fbm" => Ok(Self::Fbm),
            "billow" => Ok(Self::Billow),
            "rigid_multi" | "rigidmulti" | "ridged" => Ok(Self::RigidMulti),
            _ => Err(ParamError::UnknownVariant {
                kind: "fractal type",
                value: s.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

impl fmt::Display for FractalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Fbm => "fbm",
            Self::Billow => "billow",
            Self::RigidMulti => "rigid_multi",
        };
        f.write_str(name)
    }
}

/// Configuration for a [`FractalNoise`] field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalParams {
    /// Seed of the first octave. Octave `i` uses `seed + i`.
    pub seed: u32,
    /// Frequency of the first octave, in cycles per input unit.
    pub frequency: f64,
    /// Number of octaves. Ignored (treated as 1) for [`FractalType::None`].
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub gain: f64,
    /// Octave combination mode.
    pub fractal_type: FractalType,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            seed: 1337,
            frequency: 0.1,
            octaves: 3,
            lacunarity: 2.0,
            gain: 0.5,
            fractal_type: FractalType::Fbm,
        }
    }
}

impl FractalParams {
    /// Check that the parameters describe a usable noise field.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(ParamError::out_of_range(
                "frequency",
                format!("must be finite and positive, got {}", self.frequency),
            ));
        }
        if self.octaves == 0 || self.octaves > 16 {
            return Err(ParamError::out_of_range(
                "octaves",
                format!("must be in 1..=16, got {}", self.octaves),
            ));
        }
        if !self.lacunarity.is_finite() || !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(ParamError::out_of_range(
                "lacunarity/gain",
                "must be finite, gain must be positive",
            ));
        }
        Ok(())
    }

    fn effective_octaves(&self) -> u32 {
        match self.fractal_type {
            FractalType::None => 1,
            _ => self.octaves.max(1),
        }
    }
}

/// Normalizing bound for `octaves` octaves with amplitude falloff `gain`:
/// the reciprocal of the geometric amplitude sum.
pub fn fractal_bounding(gain: f64, octaves: u32) -> f64 {
    let mut amp = 1.0;
    let mut sum = 0.0;
    for _ in 0..octaves.max(1) {
        sum += amp;
        amp *= gain;
    }
    1.0 / sum
}

/// Seeded fractal gradient noise over the plane.
#[derive(Clone, Debug)]
pub struct FractalNoise {
    octaves: Vec<Perlin>,
    params: FractalParams,
    bounding: f64,
}

impl FractalNoise {
    /// Build the per-octave generators for `params`.
    pub fn new(params: FractalParams) -> Self {
        let count = params.effective_octaves();
        let octaves = (0..count)
            .map(|i| Perlin::new(params.seed.wrapping_add(i)))
            .collect();
        let bounding = fractal_bounding(params.gain, count);
        Self {
            octaves,
            params,
            bounding,
        }
    }

    /// Sample the field at `(x, y)`. The result lies in `[-1, 1]`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut x = x * self.params.frequency;
        let mut y = y * self.params.frequency;

        let value = match self.params.fractal_type {
            FractalType::None => self.octaves[0].get([x, y]),
            fractal_type => {
                let mut sum = 0.0;
                let mut amplitude = 1.0;
                for octave in &self.octaves {
                    let n = octave.get([x, y]);
                    let shaped = match fractal_type {
                        FractalType::Billow => n.abs() * 2.0 - 1.0,
                        FractalType::RigidMulti => 1.0 - n.abs(),
                        _ => n,
                    };
                    sum += shaped * amplitude;

                    x *= self.params.lacunarity;
                    y *= self.params.lacunarity;
                    amplitude *= self.params.gain;
                }
                let normalized = sum * self.bounding;
                if fractal_type == FractalType::RigidMulti {
                    // Rectified sum lives in [0, 1]; stretch to the common range.
                    normalized * 2.0 - 1.0
                } else {
                    normalized
                }
            }
        };

        value.clamp(-1.0, 1.0)
    }

    /// Sample remapped to `[0, 1]`.
    pub fn sample01(&self, x: f64, y: f64) -> f64 {
        ((self.sample(x, y) + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Sample at an integer lattice index (e.g. a cell index), remapped to `[0, 1]`.
    pub fn sample_index01(&self, index: IVec2) -> f64 {
        self.sample01(index.x as f64, index.y as f64)
    }

    /// Normalizing bound in use (reciprocal of the amplitude sum).
    pub fn bounding(&self) -> f64 {
        self.bounding
    }

    /// Parameters this field was built from.
    pub fn params(&self) -> &FractalParams {
        &self.params
    }
}
