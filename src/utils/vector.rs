use std::ops::{Add, Mul, Sub};

/// Lightweight 2D vector for document pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the vector.
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Shortest distance from `self` to the segment `a..b`.
    pub fn distance_to_segment(self, a: Vec2, b: Vec2) -> f32 {
        let ab = b - a;
        let len_sq = ab.dot(ab);
        if len_sq == 0.0 {
            return distance(self, a);
        }
        let t = ((self - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        distance(self, a + ab * t)
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

/// Convenience helper to measure the distance between two positions.
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (a - b).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(Vec2::new(5.0, 3.0).distance_to_segment(a, b), 3.0);
        assert_eq!(Vec2::new(-4.0, 3.0).distance_to_segment(a, b), 5.0);
        assert_eq!(Vec2::new(13.0, 4.0).distance_to_segment(a, b), 5.0);
        assert_eq!(Vec2::new(3.0, 4.0).distance_to_segment(a, a), 5.0);
    }
}
