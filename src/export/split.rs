//! Seeded train/validation split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::model::pair::TrainingExample;

/// Shuffle `examples` with `seed` and split off `floor(n * ratio)` for validation.
///
/// Returns `(training, validation)`. The same input, ratio and seed always
/// give the same split.
pub fn split_dataset(
    mut examples: Vec<TrainingExample>,
    ratio: f64,
    seed: u64,
) -> (Vec<TrainingExample>, Vec<TrainingExample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    examples.shuffle(&mut rng);

    let validation_count = validation_count(examples.len(), ratio);
    let training = examples.split_off(validation_count);
    (training, examples)
}

fn validation_count(total: usize, ratio: f64) -> usize {
    let ratio = ratio.clamp(0.0, 1.0);
    ((total as f64 * ratio).floor() as usize).min(total)
}
