use rand::Rng;

use super::Rule;

/// All variants that share one rule name.
#[derive(Debug, Clone, Default)]
pub struct WeightedRule {
    variants: Vec<Rule>,
    normalized: bool,
}

impl WeightedRule {
    pub fn add(&mut self, rule: Rule) {
        self.variants.push(rule);
        self.normalized = false;
    }

    pub fn variants(&self) -> &[Rule] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Divide every weight by the group total. Running it twice is a no-op.
    pub fn normalize(&mut self) {
        if self.normalized {
            return;
        }
        let total: f64 = self.variants.iter().map(|r| r.weight).sum();
        if total > 0.0 {
            for rule in &mut self.variants {
                rule.weight /= total;
            }
        }
        self.normalized = true;
    }

    /// Roulette-wheel selection with one uniform draw from `rng`.
    ///
    /// Read-only: an unnormalized group scales the draw by its total
    /// instead of rewriting the weights.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Rule> {
        let last = self.variants.last()?;
        let total: f64 = if self.normalized {
            1.0
        } else {
            self.variants.iter().map(|r| r.weight).sum()
        };

        let draw = rng.random::<f64>() * total;
        let mut acc = 0.0;
        for rule in &self.variants {
            acc += rule.weight;
            if acc > draw {
                return Some(rule);
            }
        }
        // float round-off in the cumulative sum
        Some(last)
    }
}
