// Utilitaires DSP - Gain, hygiène audio et smoothing
//
// Fonctions partagées par les players de boucle et le bus de sortie.

/// Volume minimal d'une piste (dB)
pub const MIN_TRACK_DB: f32 = -40.0;
/// Volume maximal d'une piste (dB)
pub const MAX_TRACK_DB: f32 = 6.0;

/// Flush denormals to zero (anti-dénormaux)
///
/// Seuil: 1e-15 (largement sous le bruit numérique à 32-bit float)
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Conversion dB -> gain linéaire
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Clamp d'un volume de piste dans [-40, +6] dB (NaN -> 0 dB)
#[inline]
pub fn clamp_track_db(db: f32) -> f32 {
    if db.is_nan() {
        0.0
    } else {
        db.clamp(MIN_TRACK_DB, MAX_TRACK_DB)
    }
}

/// Smoother 1-pole (filtre passe-bas du 1er ordre)
///
/// Évite les clics quand un player change de gain (mute, solo, volume).
///
/// Formule: y[n] = y[n-1] + α * (x[n] - y[n-1])
#[derive(Debug, Clone)]
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// Crée un nouveau smoother
    ///
    /// * `time_constant_ms` - Temps pour atteindre ~63% de la cible
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = time_constant_ms * 0.001 * sample_rate;
        let coefficient = 1.0 / time_constant_samples.max(1.0);

        Self {
            current: initial_value,
            coefficient: coefficient.min(1.0),
        }
    }

    /// Avance d'un sample vers la cible
    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    /// Reset à une nouvelle valeur (sans smoothing)
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}
