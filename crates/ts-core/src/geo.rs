//! Ground-plane geometry.
//!
//! The simulation lives on the horizontal `x/z` plane of the game world
//! (`y` is up and never simulated).  `Vec2` uses `f32` like the rest of the
//! workspace; a city here is a few hundred units across, far inside f32's
//! exact range.
//!
//! Headings are yaw angles in radians measured from `+z` toward `+x`, so a
//! heading `h` faces `(sin h, cos h)`.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A point or direction on the ground plane.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, z: 0.0 };

    #[inline]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Unit vector facing `heading` (yaw from `+z` toward `+x`).
    #[inline]
    pub fn from_heading(heading: f32) -> Self {
        Self { x: heading.sin(), z: heading.cos() }
    }

    /// Yaw of this direction; inverse of [`from_heading`](Self::from_heading).
    #[inline]
    pub fn heading(self) -> f32 {
        self.x.atan2(self.z)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.z * self.z
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    #[inline]
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (self - other).length_squared()
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.z * other.z
    }

    /// The `y` component of the 3-D cross product `self × other`.
    ///
    /// Positive when `other` is rotated from `self` in the `+z → +x`
    /// sense (the same sense in which headings grow); route instructions
    /// call that a right turn.
    #[inline]
    pub fn cross(self, other: Vec2) -> f32 {
        self.z * other.x - self.x * other.z
    }

    /// Unit-length copy, or `None` for a (near) zero vector.
    #[inline]
    pub fn try_normalize(self) -> Option<Vec2> {
        let len = self.length();
        if len > f32::EPSILON && len.is_finite() {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    /// Unit-length copy, falling back to `fallback` for a zero vector.
    #[inline]
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        self.try_normalize().unwrap_or(fallback)
    }

    #[inline]
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }

    /// Closest point to `self` on the segment `a..b`.
    pub fn closest_on_segment(self, a: Vec2, b: Vec2) -> Vec2 {
        let seg = b - a;
        let len2 = seg.length_squared();
        if len2 == 0.0 {
            return a;
        }
        let t = ((self - a).dot(seg) / len2).clamp(0.0, 1.0);
        a + seg * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.z -= rhs.z;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.z * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.z)
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.z)
    }
}

// ── Aabb ──────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle on the ground plane.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    #[inline]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Rectangle of the given full `width` (x) and `depth` (z) around `center`.
    #[inline]
    pub fn from_center(center: Vec2, width: f32, depth: f32) -> Self {
        let half = Vec2::new(width * 0.5, depth * 0.5);
        Self { min: center - half, max: center + half }
    }

    /// Square `[-half, half]²` around the origin.
    #[inline]
    pub fn square(half: f32) -> Self {
        Self::new(Vec2::new(-half, -half), Vec2::new(half, half))
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn depth(&self) -> f32 {
        self.max.z - self.min.z
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        self.contains_with_margin(p, 0.0)
    }

    /// Containment in the rectangle grown by `margin` on every side.
    #[inline]
    pub fn contains_with_margin(&self, p: Vec2, margin: f32) -> bool {
        p.x >= self.min.x - margin
            && p.x <= self.max.x + margin
            && p.z >= self.min.z - margin
            && p.z <= self.max.z + margin
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.z.min(other.min.z)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.z.max(other.max.z)),
        }
    }

    /// Copy grown by `amount` on every side.
    pub fn expanded(&self, amount: f32) -> Aabb {
        let d = Vec2::new(amount, amount);
        Aabb { min: self.min - d, max: self.max + d }
    }

    /// `p` clamped into the rectangle.
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.z.clamp(self.min.z, self.max.z))
    }
}
