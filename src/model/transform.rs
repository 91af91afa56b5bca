use glam::Mat4;
use rand::Rng;

use crate::color::{ColorPool, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub color: Rgba,
    pub strength: f64,
}

/// One `{ ... }` block: an affine matrix plus color operators.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub matrix: Mat4,
    /// Added to the hue, in degrees.
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
    pub alpha: f64,
    /// `color <rgba>`; wins over every other color operator.
    pub absolute: Option<Rgba>,
    /// `color random`
    pub random_color: bool,
    pub blend: Option<Blend>,
}

impl Default for Transformation {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            hue: 0.0,
            saturation: 1.0,
            brightness: 1.0,
            alpha: 1.0,
            absolute: None,
            random_color: false,
            blend: None,
        }
    }
}

impl Transformation {
    /// Post-multiply `op` onto the block's matrix, so the operator written
    /// last is the first one applied to a point.
    pub fn then(&mut self, op: Mat4) {
        self.matrix *= op;
    }

    fn alters_hsv(&self) -> bool {
        self.hue != 0.0
            || self.saturation != 1.0
            || self.brightness != 1.0
            || self.blend.is_some_and(|b| b.strength != 0.0)
    }

    /// Apply this block to an inherited matrix and color.
    ///
    /// Color precedence: absolute override, HSV shift/scale, alpha scale,
    /// random pool draw, blend.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        matrix: Mat4,
        color: Rgba,
        pool: &ColorPool,
        rng: &mut R,
    ) -> (Mat4, Rgba) {
        let matrix = matrix * self.matrix;

        if let Some(absolute) = self.absolute {
            return (matrix, absolute);
        }

        let mut color = color;
        if self.alters_hsv() {
            let mut hsv = color.to_hsv();
            hsv.h = (hsv.h + self.hue).rem_euclid(360.0);
            hsv.s = (hsv.s * self.saturation).clamp(0.0, 1.0);
            hsv.v = (hsv.v * self.brightness).clamp(0.0, 1.0);
            color = Rgba::from_hsv(hsv, color.a);
        }

        if self.alpha != 1.0 {
            color.a = (color.a as f64 * self.alpha).clamp(0.0, 255.0).round() as u8;
        }

        if self.random_color {
            color = pool.draw(rng);
        }

        if let Some(blend) = self.blend {
            color = color.blend(blend.color, blend.strength);
        }

        (matrix, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn run(t: &Transformation, color: Rgba) -> Rgba {
        let mut rng = Pcg64::seed_from_u64(0);
        t.apply(Mat4::IDENTITY, color, &ColorPool::default(), &mut rng).1
    }

    #[test]
    fn test_matrix_accumulates_on_input() {
        let mut t = Transformation::default();
        t.then(Mat4::from_translation(Vec3::new(2.0, 3.0, 0.0)));
        let mut rng = Pcg64::seed_from_u64(0);
        let pool = ColorPool::default();

        let (once, _) = t.apply(Mat4::IDENTITY, Rgba::RED, &pool, &mut rng);
        let (twice, _) = t.apply(once, Rgba::RED, &pool, &mut rng);
        assert_eq!(twice.w_axis.truncate(), Vec3::new(4.0, 6.0, 0.0));
    }

    #[test]
    fn test_hue_shift_wraps() {
        let t = Transformation {
            hue: 240.0,
            ..Default::default()
        };
        // red (0°) + 240° = blue
        assert_eq!(run(&t, Rgba::RED), Rgba::rgb(0, 0, 255));

        let t = Transformation {
            hue: 480.0,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::RED), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn test_scales_clamp_to_unit_range() {
        let t = Transformation {
            brightness: 0.5,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::RED), Rgba::rgb(128, 0, 0));

        let t = Transformation {
            brightness: 4.0,
            saturation: 4.0,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::rgb(128, 64, 64)), Rgba::rgb(255, 0, 0));

        let t = Transformation {
            saturation: 0.0,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::RED), Rgba::WHITE);
    }

    #[test]
    fn test_alpha_scale() {
        let t = Transformation {
            alpha: 0.5,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::RED).a, 128);

        let t = Transformation {
            alpha: 3.0,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::new(255, 0, 0, 100)).a, 255);
    }

    #[test]
    fn test_absolute_color_short_circuits() {
        let t = Transformation {
            absolute: Some(Rgba::rgb(1, 2, 3)),
            hue: 90.0,
            alpha: 0.1,
            random_color: true,
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::RED), Rgba::rgb(1, 2, 3));
    }

    #[test]
    fn test_random_color_comes_from_pool() {
        let t = Transformation {
            random_color: true,
            ..Default::default()
        };
        let pool = ColorPool::List(vec![Rgba::rgb(9, 9, 9)]);
        let mut rng = Pcg64::seed_from_u64(1);
        let (_, c) = t.apply(Mat4::IDENTITY, Rgba::RED, &pool, &mut rng);
        assert_eq!(c, Rgba::rgb(9, 9, 9));
    }

    #[test]
    fn test_blend_applies_last() {
        let t = Transformation {
            blend: Some(Blend {
                color: Rgba::rgb(0, 0, 255),
                strength: 1.0,
            }),
            ..Default::default()
        };
        assert_eq!(run(&t, Rgba::RED), Rgba::rgb(0, 0, 255));
    }
}
