//! Windowed resampling kernels.
//!
//! Five fixed kernels are available, each a weight function plus its support
//! (half-width in source pixels at unit scale). They are `'static` constants
//! and can be shared freely.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResampleError;

/// A resampling kernel: weight function and support radius.
#[derive(Clone, Copy)]
pub struct FilterKernel {
    pub weight: fn(f64) -> f64,
    pub support: f64,
}

impl fmt::Debug for FilterKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterKernel")
            .field("support", &self.support)
            .finish_non_exhaustive()
    }
}

fn box_weight(x: f64) -> f64 {
    if x > -0.5 && x <= 0.5 {
        1.0
    } else {
        0.0
    }
}

fn bilinear_weight(x: f64) -> f64 {
    let x = x.abs();
    if x < 1.0 {
        1.0 - x
    } else {
        0.0
    }
}

fn hamming_weight(x: f64) -> f64 {
    let x = x.abs();
    if x == 0.0 {
        return 1.0;
    }
    if x >= 1.0 {
        return 0.0;
    }
    let x = x * PI;
    // Window constants are single precision.
    x.sin() / x * (0.54f32 as f64 + 0.46f32 as f64 * x.cos())
}

fn bicubic_weight(x: f64) -> f64 {
    const A: f64 = -0.5;
    let x = x.abs();
    if x < 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        (((x - 5.0) * x + 8.0) * x - 4.0) * A
    } else {
        0.0
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let x = x * PI;
    x.sin() / x
}

fn lanczos_weight(x: f64) -> f64 {
    if (-3.0..3.0).contains(&x) {
        sinc(x) * sinc(x / 3.0)
    } else {
        0.0
    }
}

pub const BOX: FilterKernel = FilterKernel {
    weight: box_weight,
    support: 0.5,
};

pub const BILINEAR: FilterKernel = FilterKernel {
    weight: bilinear_weight,
    support: 1.0,
};

pub const HAMMING: FilterKernel = FilterKernel {
    weight: hamming_weight,
    support: 1.0,
};

pub const BICUBIC: FilterKernel = FilterKernel {
    weight: bicubic_weight,
    support: 2.0,
};

pub const LANCZOS: FilterKernel = FilterKernel {
    weight: lanczos_weight,
    support: 3.0,
};

// =============================================================================
// Filter Selection
// =============================================================================

/// Resampling filter selector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Box,
    Bilinear,
    Hamming,
    Bicubic,
    #[default]
    Lanczos,
}

impl Filter {
    /// All filters, in id order.
    pub const ALL: [Filter; 5] = [
        Filter::Lanczos,
        Filter::Bilinear,
        Filter::Bicubic,
        Filter::Box,
        Filter::Hamming,
    ];

    /// The kernel this filter resamples with.
    pub fn kernel(self) -> &'static FilterKernel {
        match self {
            Filter::Box => &BOX,
            Filter::Bilinear => &BILINEAR,
            Filter::Hamming => &HAMMING,
            Filter::Bicubic => &BICUBIC,
            Filter::Lanczos => &LANCZOS,
        }
    }

    /// Legacy numeric filter id.
    pub fn id(self) -> u8 {
        match self {
            Filter::Lanczos => 1,
            Filter::Bilinear => 2,
            Filter::Bicubic => 3,
            Filter::Box => 4,
            Filter::Hamming => 5,
        }
    }

    /// Resolve a legacy numeric filter id.
    ///
    /// Id 0 (nearest neighbour) has no windowed kernel and is rejected.
    pub fn from_id(id: u8) -> Result<Self, ResampleError> {
        Filter::ALL
            .into_iter()
            .find(|f| f.id() == id)
            .ok_or(ResampleError::UnsupportedFilter(id))
    }

    pub fn name(self) -> &'static str {
        match self {
            Filter::Box => "box",
            Filter::Bilinear => "bilinear",
            Filter::Hamming => "hamming",
            Filter::Bicubic => "bicubic",
            Filter::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Filter::ALL
            .into_iter()
            .find(|f| f.name() == lower)
            .ok_or_else(|| format!("unknown resampling filter '{}'", s))
    }
}

// =============================================================================
// Tests
// =============================================================================
