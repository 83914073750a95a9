use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{RollOutcome, RollRequest};

/// Source of uniform die faces in `1..=sides`.
pub trait DieSource {
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Die source backed by a `rand` generator.
pub struct RngDieSource<R> {
    rng: R,
}

impl<R: Rng> RngDieSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngDieSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DieSource for RngDieSource<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Always lands on the same face, clamped to the die.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedDieSource(pub u32);

impl DieSource for FixedDieSource {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.0.clamp(1, sides.max(1))
    }
}

/// Rolls `request.count` dice in order and applies the modifier to their sum.
///
/// The final sum is not clamped and may be negative.
pub fn evaluate(request: &RollRequest, source: &mut dyn DieSource) -> RollOutcome {
    let dice: Vec<u32> = (0..request.count).map(|_| source.roll_die(request.sides)).collect();
    let raw_sum: i64 = dice.iter().map(|&face| i64::from(face)).sum();
    let final_sum = request.modifier.map_or(raw_sum, |modifier| modifier.apply(raw_sum));

    RollOutcome { dice, raw_sum, final_sum }
}

#[cfg(test)]
mod tests {
    use super::{evaluate, DieSource, FixedDieSource, RngDieSource};
    use crate::roll::{Modifier, ModifierSign, RollRequest};

    struct ScriptedSource {
        faces: Vec<u32>,
        calls: Vec<u32>,
    }

    impl DieSource for ScriptedSource {
        fn roll_die(&mut self, sides: u32) -> u32 {
            self.calls.push(sides);
            self.faces.remove(0)
        }
    }

    #[test]
    fn seeded_rolls_respect_request_shape() {
        let mut source = RngDieSource::seeded(7);
        let modifiers = [
            None,
            Some(Modifier { sign: ModifierSign::Plus, value: 5 }),
            Some(Modifier { sign: ModifierSign::Minus, value: 3 }),
        ];

        for count in [1_u32, 2, 10, 100] {
            for sides in [4_u32, 6, 20, 100] {
                for modifier in modifiers {
                    let request = RollRequest { count, sides, modifier };
                    let outcome = evaluate(&request, &mut source);

                    assert_eq!(outcome.dice.len(), count as usize);
                    assert!(outcome.dice.iter().all(|&face| (1..=sides).contains(&face)));
                    assert_eq!(
                        outcome.raw_sum,
                        outcome.dice.iter().map(|&face| i64::from(face)).sum::<i64>()
                    );

                    let expected = match modifier {
                        None => outcome.raw_sum,
                        Some(Modifier { sign: ModifierSign::Plus, value }) => {
                            outcome.raw_sum + i64::from(value)
                        }
                        Some(Modifier { sign: ModifierSign::Minus, value }) => {
                            outcome.raw_sum - i64::from(value)
                        }
                    };
                    assert_eq!(outcome.final_sum, expected);
                }
            }
        }
    }

    #[test]
    fn same_seed_gives_same_dice() {
        let request = RollRequest { count: 20, sides: 20, modifier: None };
        let first = evaluate(&request, &mut RngDieSource::seeded(42));
        let second = evaluate(&request, &mut RngDieSource::seeded(42));
        assert_eq!(first, second);
    }

    #[test]
    fn preserves_roll_order() {
        let mut source = ScriptedSource { faces: vec![3, 1, 4], calls: Vec::new() };
        let request = RollRequest { count: 3, sides: 8, modifier: None };

        let outcome = evaluate(&request, &mut source);

        assert_eq!(outcome.dice, vec![3, 1, 4]);
        assert_eq!(source.calls, vec![8, 8, 8]);
    }

    #[test]
    fn large_penalty_can_go_negative() {
        let request = RollRequest {
            count: 2,
            sides: 6,
            modifier: Some(Modifier { sign: ModifierSign::Minus, value: 50 }),
        };

        let outcome = evaluate(&request, &mut FixedDieSource(1));

        assert_eq!(outcome.raw_sum, 2);
        assert_eq!(outcome.final_sum, -48);
    }

    #[test]
    fn fixed_source_clamps_to_die() {
        let mut source = FixedDieSource(50);
        assert_eq!(source.roll_die(6), 6);
        assert_eq!(FixedDieSource(0).roll_die(6), 1);
    }
}
