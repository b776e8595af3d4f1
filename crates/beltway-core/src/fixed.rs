//! Decimal fixed-point distance used for every position and gap on a belt.
//!
//! Distances are measured in tiles with exactly three fractional digits and
//! stored as a signed count of thousandths. Addition and subtraction are
//! exact, so item positions never drift no matter how many ticks run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// A distance along a belt lane, in tiles, with three decimal digits.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LineDist(i64);

impl LineDist {
    /// Number of raw units in one tile.
    pub const SCALE: i64 = 1000;

    pub const ZERO: LineDist = LineDist(0);
    pub const ONE: LineDist = LineDist(Self::SCALE);
    pub const MAX: LineDist = LineDist(i64::MAX);

    /// Build from a raw count of thousandths of a tile.
    #[inline]
    pub const fn from_thousandths(raw: i64) -> Self {
        Self(raw)
    }

    /// Build from a whole number of tiles.
    #[inline]
    pub const fn from_tiles(tiles: i64) -> Self {
        Self(tiles * Self::SCALE)
    }

    /// Convert an f64 to a distance, rounding to the nearest thousandth.
    /// Use only for initialization, never in the sim loop.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        Self((v * Self::SCALE as f64).round() as i64)
    }

    /// Convert to f64. Use only for display, never in the sim loop.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Raw thousandths.
    #[inline]
    pub const fn to_thousandths(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[inline]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl Add for LineDist {
    type Output = LineDist;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for LineDist {
    type Output = LineDist;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for LineDist {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for LineDist {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for LineDist {
    type Output = LineDist;

    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for LineDist {
    fn sum<I: Iterator<Item = LineDist>>(iter: I) -> Self {
        iter.fold(LineDist::ZERO, |acc, d| acc + d)
    }
}

impl fmt::Display for LineDist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let raw = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", raw / 1000, raw % 1000)
    }
}
