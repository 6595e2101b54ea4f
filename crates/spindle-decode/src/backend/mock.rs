//! Random-logit backend for running the engine without a model.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::InferenceBackend;

/// Id the mock drifts toward after [`EOS_DRIFT_AFTER`] calls.
pub const MOCK_EOS_TOKEN_ID: u32 = 2;
const EOS_DRIFT_AFTER: usize = 10;
const EOS_DRIFT_PER_CALL: f32 = 0.5;
const COMMON_TOKEN_BIAS: f32 = 1.0;
const COMMON_TOKEN_COUNT: usize = 100;
const LOGIT_STD_DEV: f32 = 2.0;

struct MockState {
    rng: StdRng,
    calls: usize,
}

/// Produces Gaussian logits with a bias toward low ids.
///
/// After ten calls the end-of-sequence logit grows by 0.5 per call, so an
/// unbounded generation still terminates.
pub struct MockBackend {
    vocab_size: usize,
    max_context_length: usize,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(vocab_size: usize, max_context_length: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            vocab_size,
            max_context_length,
            state: Mutex::new(MockState { rng, calls: 0 }),
        }
    }

    /// Number of forward passes since construction or the last [`reset`](Self::reset).
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    pub fn reset(&self) {
        self.lock().calls = 0;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InferenceBackend for MockBackend {
    fn forward(&self, token_ids: &[u32], attention_mask: &[u32]) -> Result<Array1<f32>> {
        if token_ids.len() != attention_mask.len() {
            return Err(anyhow!(
                "attention mask length {} does not match {} input ids",
                attention_mask.len(),
                token_ids.len()
            ));
        }

        let mut state = self.lock();
        state.calls += 1;

        let mut logits: Array1<f32> = (0..self.vocab_size)
            .map(|_| {
                let z: f32 = state.rng.sample(StandardNormal);
                z * LOGIT_STD_DEV
            })
            .collect();

        let common = COMMON_TOKEN_COUNT.min(self.vocab_size);
        logits
            .slice_mut(ndarray::s![..common])
            .mapv_inplace(|x| x + COMMON_TOKEN_BIAS);

        let eos = MOCK_EOS_TOKEN_ID as usize;
        if state.calls > EOS_DRIFT_AFTER && eos < self.vocab_size {
            logits[eos] += (state.calls - EOS_DRIFT_AFTER) as f32 * EOS_DRIFT_PER_CALL;
        }

        Ok(logits)
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn max_context_length(&self) -> usize {
        self.max_context_length
    }
}
