// Host stand-in for the board's ADC: noisy readings around a per-channel midpoint.
use super::{ADC_MAX, RawReader, SensorKind};
use crate::errors::SampleError;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

pub struct SimulatedAdc {
    rng: Mutex<StdRng>,
    profiles: HashMap<String, Normal<f64>>,
}

impl SimulatedAdc {
    /// `seed` makes a run reproducible; `None` seeds from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { rng: Mutex::new(rng), profiles: HashMap::new() }
    }

    /// Give `channel` a noise profile suited to what is wired to it.
    pub fn register(&mut self, channel: &str, kind: SensorKind) -> Result<(), SampleError> {
        let (mean, std_dev) = match kind {
            // ~25 °C with a little wander
            SensorKind::Thermistor => (2048.0, 20.0),
            SensorKind::Level => (1800.0, 400.0),
        };
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| SampleError::Hardware(format!("bad noise profile: {e}")))?;
        self.profiles.insert(channel.to_string(), normal);
        Ok(())
    }
}

impl RawReader for SimulatedAdc {
    fn read_raw(&self, channel: &str) -> Result<u16, SampleError> {
        let mut rng = self.rng.lock();
        let raw = match self.profiles.get(channel) {
            Some(normal) => normal.sample(&mut *rng).round().clamp(0.0, f64::from(ADC_MAX)) as u16,
            None => rng.random_range(0..=ADC_MAX),
        };
        Ok(raw)
    }
}
