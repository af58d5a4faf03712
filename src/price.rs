//! Daily price change source.
//!
//! There is no real price feed yet. [`RandomPriceProvider`] stands in for one
//! so the summary logic never depends on where the number comes from.

use rand::{Rng, rng};

/// Source of a symbol's daily change percentage.
pub trait PriceProvider {
    fn daily_change(&self, symbol: &str) -> f64;
}

impl<T: PriceProvider + ?Sized> PriceProvider for Box<T> {
    fn daily_change(&self, symbol: &str) -> f64 {
        (**self).daily_change(symbol)
    }
}

/// Placeholder provider sampling uniformly in `[-5.0, 5.0]`.
#[derive(Debug, Default)]
pub struct RandomPriceProvider;

impl PriceProvider for RandomPriceProvider {
    fn daily_change(&self, _symbol: &str) -> f64 {
        rng().random_range(-5.0..=5.0)
    }
}

/// Returns the same change for every symbol.
#[derive(Debug)]
pub struct FixedPriceProvider(pub f64);

impl PriceProvider for FixedPriceProvider {
    fn daily_change(&self, _symbol: &str) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_change_stays_in_range() {
        let provider = RandomPriceProvider;
        for _ in 0..1000 {
            let change = provider.daily_change("AAPL");
            assert!((-5.0..=5.0).contains(&change), "out of range: {change}");
        }
    }

    #[test]
    fn test_fixed_change() {
        assert_eq!(FixedPriceProvider(-2.5).daily_change("MSFT"), -2.5);
        let boxed: Box<dyn PriceProvider> = Box::new(FixedPriceProvider(1.0));
        assert_eq!(boxed.daily_change("MSFT"), 1.0);
    }
}
