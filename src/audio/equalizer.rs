use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::error::{MusicError, MusicResult};

/// Número de bandas del ecualizador
pub const BAND_COUNT: usize = 15;

const MIN_GAIN: f32 = -0.25;
const MAX_GAIN: f32 = 1.0;
const SAMPLE_RATE: u32 = 48_000;

/// Coeficientes por banda para 48kHz (beta, alpha, gamma)
const COEFFICIENTS_48000: [(f32, f32, f32); BAND_COUNT] = [
    (9.9847546664e-01, 7.6226668143e-04, 1.9984647656e+00),
    (9.9756184654e-01, 1.2190767289e-03, 1.9975344645e+00),
    (9.9616261379e-01, 1.9186931041e-03, 1.9960947369e+00),
    (9.9391578543e-01, 3.0421072865e-03, 1.9937449618e+00),
    (9.9028307215e-01, 4.8584639242e-03, 1.9898465702e+00),
    (9.8485897264e-01, 7.5705136795e-03, 1.9837962543e+00),
    (9.7588512657e-01, 1.2057436715e-02, 1.9731772447e+00),
    (9.6228521814e-01, 1.8857390928e-02, 1.9556164694e+00),
    (9.4080933132e-01, 2.9595334338e-02, 1.9242054384e+00),
    (9.0702059196e-01, 4.6489704022e-02, 1.8653476166e+00),
    (8.5868004289e-01, 7.0659978553e-02, 1.7600401337e+00),
    (7.8409610788e-01, 1.0795194606e-01, 1.5450725522e+00),
    (6.8332861002e-01, 1.5833569499e-01, 1.1426447155e+00),
    (5.5267518228e-01, 2.2366240886e-01, 4.0186190803e-01),
    (4.1811888447e-01, 2.9094055777e-01, -7.0905944223e-01),
];

/// Formato PCM que entrega el decodificador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioDataFormat {
    pub channels: usize,
    pub sample_rate: u32,
}

impl AudioDataFormat {
    pub const DISCORD_PCM: AudioDataFormat = AudioDataFormat {
        channels: 2,
        sample_rate: SAMPLE_RATE,
    };
}

/// Filtro sobre PCM i16 intercalado
pub trait PcmFilter: Send {
    fn process(&mut self, samples: &mut [i16]);

    fn reset(&mut self);
}

/// Presets del comando de ecualizador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualizerPreset {
    Flat,
    Outside,
    Bass,
}

impl EqualizerPreset {
    pub fn parse(name: &str) -> MusicResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "reset" | "normal" | "flat" => Ok(Self::Flat),
            "outside" => Ok(Self::Outside),
            "bass" => Ok(Self::Bass),
            other => Err(MusicError::UnknownPreset(other.to_string())),
        }
    }

    pub fn gains(self) -> [f32; BAND_COUNT] {
        match self {
            Self::Flat => [0.0; BAND_COUNT],
            // -0.25 * 2.5 queda recortado al mínimo
            Self::Outside => [MIN_GAIN * 2.5; BAND_COUNT],
            Self::Bass => {
                let mut gains = [MIN_GAIN; BAND_COUNT];
                gains[..3].fill(0.6);
                gains
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Flat => "normal",
            Self::Outside => "outside",
            Self::Bass => "bass",
        }
    }
}

/// Fábrica de filtros: guarda las ganancias y crea un ecualizador por track.
///
/// Los filtros creados comparten las ganancias, así que `set_gain` afecta
/// también al track que está sonando.
#[derive(Debug, Default)]
pub struct EqualizerFactory {
    gains: Arc<RwLock<[f32; BAND_COUNT]>>,
}

impl EqualizerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(preset: EqualizerPreset) -> Self {
        let factory = Self::new();
        factory.apply_preset(preset);
        factory
    }

    pub fn is_compatible(format: AudioDataFormat) -> bool {
        format.sample_rate == SAMPLE_RATE && (1..=2).contains(&format.channels)
    }

    /// Cadena de filtros para un track; vacía si el formato no es compatible
    pub fn build_chain(&self, format: AudioDataFormat) -> Vec<Box<dyn PcmFilter>> {
        if Self::is_compatible(format) {
            vec![Box::new(EqualizerFilter::new(
                format.channels,
                Arc::clone(&self.gains),
            ))]
        } else {
            Vec::new()
        }
    }

    pub fn set_gain(&self, band: usize, gain: f32) -> MusicResult<()> {
        if band >= BAND_COUNT {
            return Err(MusicError::InvalidBand(band));
        }
        self.gains.write()[band] = gain.clamp(MIN_GAIN, MAX_GAIN);
        Ok(())
    }

    pub fn gain(&self, band: usize) -> Option<f32> {
        self.gains.read().get(band).copied()
    }

    pub fn gains(&self) -> [f32; BAND_COUNT] {
        *self.gains.read()
    }

    pub fn apply_preset(&self, preset: EqualizerPreset) {
        let mut gains = self.gains.write();
        for (slot, gain) in gains.iter_mut().zip(preset.gains()) {
            *slot = gain.clamp(MIN_GAIN, MAX_GAIN);
        }
        info!("🎛️ Preset de ecualizador aplicado: {}", preset.name());
    }

    pub fn reset(&self) {
        self.apply_preset(EqualizerPreset::Flat);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BandState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandState {
    fn process(&mut self, sample: f32, (beta, alpha, gamma): (f32, f32, f32)) -> f32 {
        let result = alpha * (sample - self.x2) + gamma * self.y1 - beta * self.y2;

        self.x2 = self.x1;
        self.x1 = sample;
        self.y2 = self.y1;

        if !result.is_finite() {
            self.y1 = 0.0;
            return 0.0;
        }

        self.y1 = result;
        result
    }
}

/// Banco de filtros paralelos de 15 bandas
pub struct EqualizerFilter {
    channels: usize,
    gains: Arc<RwLock<[f32; BAND_COUNT]>>,
    // [canal][banda]
    states: Vec<[BandState; BAND_COUNT]>,
}

impl EqualizerFilter {
    fn new(channels: usize, gains: Arc<RwLock<[f32; BAND_COUNT]>>) -> Self {
        Self {
            channels,
            gains,
            states: vec![[BandState::default(); BAND_COUNT]; channels],
        }
    }
}

impl PcmFilter for EqualizerFilter {
    fn process(&mut self, samples: &mut [i16]) {
        let gains = *self.gains.read();

        for frame in samples.chunks_exact_mut(self.channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                let input = *sample as f32 / 32768.0;
                let mut result = input * 0.25;

                for (band, state) in self.states[channel].iter_mut().enumerate() {
                    let filtered = state.process(input, COEFFICIENTS_48000[band]);
                    result += filtered * gains[band];
                }

                let output = (result * 4.0).clamp(-1.0, 1.0);
                *sample = (output * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            }
        }
    }

    fn reset(&mut self) {
        for channel in &mut self.states {
            *channel = [BandState::default(); BAND_COUNT];
        }
    }
}
