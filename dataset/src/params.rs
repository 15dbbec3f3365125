use std::f64::consts::{FRAC_PI_2, TAU};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::{Bounds, GenerationConfig, LightConfig, MaterialConfig},
    error::Result,
};

/// Point light placed on a sphere around the part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub strength_w: u32,
    pub radius: u32,
    /// `[0, 2π)`
    pub azimuth_rad: f64,
    /// Angle from the zenith, `[0, π/2]`. Never below the horizon.
    pub elevation_rad: f64,
}

impl Light {
    pub fn position(&self) -> [f64; 3] {
        let r = self.radius as f64;
        let (sin_el, cos_el) = self.elevation_rad.sin_cos();
        let (sin_az, cos_az) = self.azimuth_rad.sin_cos();
        [r * sin_el * cos_az, r * sin_el * sin_az, r * cos_el]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub diffuse_rgb: [f64; 3],
    pub metallic: f64,
    pub specular: f64,
    pub roughness: f64,
}

/// Everything randomized for one rendered sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleParameters {
    pub lights: Vec<Light>,
    pub material: Material,
    /// XYZ euler angles, each in `[0, 2π)`.
    pub rotation_euler: [f64; 3],
}

impl SampleParameters {
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }
}

/// Draws [`SampleParameters`] from validated ranges. The random source is
/// passed in, so a seeded rng gives reproducible samples.
#[derive(Debug, Clone)]
pub struct ParameterGenerator {
    lights: LightConfig,
    material: MaterialConfig,
}

impl ParameterGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        config.validate_ranges()?;
        Ok(Self {
            lights: config.lights.clone(),
            material: config.material.clone(),
        })
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> SampleParameters {
        let count = uniform_u32(rng, self.lights.count);
        let lights = (0..count).map(|_| self.light(rng)).collect();

        let m = &self.material;
        let material = Material {
            diffuse_rgb: [
                uniform_f64(rng, m.diffuse),
                uniform_f64(rng, m.diffuse),
                uniform_f64(rng, m.diffuse),
            ],
            metallic: uniform_f64(rng, m.metallic),
            specular: uniform_f64(rng, m.specular),
            roughness: uniform_f64(rng, m.roughness),
        };

        let rotation_euler = [
            rng.random_range(0.0..TAU),
            rng.random_range(0.0..TAU),
            rng.random_range(0.0..TAU),
        ];

        SampleParameters {
            lights,
            material,
            rotation_euler,
        }
    }

    fn light<R: Rng + ?Sized>(&self, rng: &mut R) -> Light {
        Light {
            strength_w: uniform_u32(rng, self.lights.strength),
            radius: uniform_u32(rng, self.lights.radius),
            azimuth_rad: rng.random_range(0.0..TAU),
            elevation_rad: rng.random_range(0.0..=FRAC_PI_2),
        }
    }
}

fn uniform_u32<R: Rng + ?Sized>(rng: &mut R, b: Bounds<u32>) -> u32 {
    rng.random_range(b.min..=b.max)
}

fn uniform_f64<R: Rng + ?Sized>(rng: &mut R, b: Bounds<f64>) -> f64 {
    if b.min == b.max {
        return b.min;
    }
    rng.random_range(b.min..=b.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use rand::{SeedableRng, rngs::SmallRng};

    fn config() -> GenerationConfig {
        GenerationConfig::new("bricks.txt", "parts", "out")
    }

    #[test]
    fn same_seed_same_parameters() {
        let generator = ParameterGenerator::new(&config()).unwrap();
        let mut a = SmallRng::seed_from_u64(7);
        let mut b = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(generator.generate(&mut a), generator.generate(&mut b));
        }
    }

    #[test]
    fn values_stay_in_range() {
        let mut cfg = config();
        cfg.material.metallic = Bounds::new(0.2, 0.4);
        cfg.material.diffuse = Bounds::new(0.5, 0.6);
        let generator = ParameterGenerator::new(&cfg).unwrap();
        let mut rng = SmallRng::seed_from_u64(99);

        for _ in 0..2000 {
            let p = generator.generate(&mut rng);
            assert!((1..=3).contains(&p.light_count()));
            for l in &p.lights {
                assert!((500..=2000).contains(&l.strength_w));
                assert!((3..=10).contains(&l.radius));
                assert!((0.0..TAU).contains(&l.azimuth_rad));
                assert!((0.0..=FRAC_PI_2).contains(&l.elevation_rad));
                assert!(l.position()[2] >= 0.0);
            }
            assert!(p.material.diffuse_rgb.iter().all(|c| (0.5..=0.6).contains(c)));
            assert!((0.2..=0.4).contains(&p.material.metallic));
            for v in [p.material.specular, p.material.roughness] {
                assert!((0.0..=1.0).contains(&v));
            }
            assert!(p.rotation_euler.iter().all(|a| (0.0..TAU).contains(a)));
        }
    }

    #[test]
    fn fixed_light_count_and_degenerate_ranges() {
        let mut cfg = config();
        cfg.lights.count = Bounds::new(2, 2);
        cfg.lights.strength = Bounds::new(1000, 1000);
        cfg.material.roughness = Bounds::new(0.3, 0.3);
        let generator = ParameterGenerator::new(&cfg).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            let p = generator.generate(&mut rng);
            assert_eq!(p.light_count(), 2);
            assert!(p.lights.iter().all(|l| l.strength_w == 1000));
            assert_eq!(p.material.roughness, 0.3);
        }
    }

    #[test]
    fn zero_lights_is_allowed() {
        let mut cfg = config();
        cfg.lights.count = Bounds::new(0, 0);
        let generator = ParameterGenerator::new(&cfg).unwrap();
        let p = generator.generate(&mut SmallRng::seed_from_u64(3));
        assert!(p.lights.is_empty());
    }

    #[test]
    fn inverted_range_fails_construction() {
        let mut cfg = config();
        cfg.lights.count = Bounds::new(4, 1);
        assert!(matches!(
            ParameterGenerator::new(&cfg),
            Err(DatasetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn light_position_follows_polar_convention() {
        let zenith = Light {
            strength_w: 1,
            radius: 5,
            azimuth_rad: 1.0,
            elevation_rad: 0.0,
        };
        let [x, y, z] = zenith.position();
        assert!(x.abs() < 1e-12 && y.abs() < 1e-12);
        assert!((z - 5.0).abs() < 1e-12);

        let horizon = Light {
            elevation_rad: FRAC_PI_2,
            azimuth_rad: 0.0,
            ..zenith
        };
        let [x, _, z] = horizon.position();
        assert!((x - 5.0).abs() < 1e-12);
        assert!(z.abs() < 1e-12);
    }
}
