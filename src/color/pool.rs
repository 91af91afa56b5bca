use rand::Rng;

use super::{Hsv, Rgba};

/// Strategy used to answer `color random`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColorPool {
    /// Random hue at full saturation and value.
    RandomHue,
    /// Each channel uniform in `0..=255`.
    #[default]
    RandomRgb,
    /// Uniform grey level.
    Greyscale,
    /// Uniform pick from a fixed, non-empty list.
    List(Vec<Rgba>),
}

impl ColorPool {
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgba {
        match self {
            ColorPool::RandomHue => Rgba::from_hsv(
                Hsv {
                    h: rng.random::<f64>() * 360.0,
                    s: 1.0,
                    v: 1.0,
                },
                0xff,
            ),
            ColorPool::RandomRgb => Rgba::rgb(rng.random(), rng.random(), rng.random()),
            ColorPool::Greyscale => {
                let level = rng.random();
                Rgba::rgb(level, level, level)
            }
            ColorPool::List(colors) if colors.is_empty() => Rgba::WHITE,
            ColorPool::List(colors) => colors[rng.random_range(0..colors.len())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn test_greyscale_is_grey() {
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..100 {
            let c = ColorPool::Greyscale.draw(&mut rng);
            assert!(c.r == c.g && c.g == c.b);
            assert_eq!(c.a, 0xff);
        }
    }

    #[test]
    fn test_random_hue_is_saturated() {
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..100 {
            let hsv = ColorPool::RandomHue.draw(&mut rng).to_hsv();
            assert!(hsv.s > 0.99 && hsv.v > 0.99, "{hsv:?}");
        }
    }

    #[test]
    fn test_list_only_yields_members() {
        let list = vec![Rgba::RED, Rgba::rgb(0, 0, 255)];
        let pool = ColorPool::List(list.clone());
        let mut rng = Pcg64::seed_from_u64(9);
        let mut seen = [false; 2];
        for _ in 0..200 {
            let c = pool.draw(&mut rng);
            let i = list.iter().position(|l| *l == c).expect("member of list");
            seen[i] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_same_seed_same_colors() {
        let mut a = Pcg64::seed_from_u64(42);
        let mut b = Pcg64::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(
                ColorPool::RandomRgb.draw(&mut a),
                ColorPool::RandomRgb.draw(&mut b)
            );
        }
    }
}
