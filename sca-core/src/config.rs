use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Parameters of the growth simulation, fixed for the lifetime of a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seeds placed on the surface of the sampling region.
    pub seed_count: usize,
    /// Attractors rejection-sampled inside the sampling region.
    pub attractor_count: usize,
    /// Radius of the sampling ball (disc when `planar`) around the origin.
    pub region_radius: f32,
    /// An assigned attractor this close to its tip is consumed.
    pub dead_zone_radius: f32,
    /// Distance a child is placed from its parent.
    pub growth_step: f32,
    /// Attractors farther than this from every tip are ignored.
    pub max_attraction_radius: f32,
    /// Per-tip chance of spawning a lateral child next to the primary one.
    pub split_probability: f32,
    /// Rotation of the lateral child away from the primary heading.
    pub branch_angle_degrees: f32,
    /// Half-angle of the cone a tip attracts through. `None` disables gating.
    pub view_cone_degrees: Option<f32>,
    /// Keep everything on the z = 0 plane.
    pub planar: bool,
    /// Seed for the simulation RNG. `None` draws from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_count: 1,
            attractor_count: 200,
            region_radius: 1.0,
            dead_zone_radius: 0.04,
            growth_step: 0.02,
            max_attraction_radius: 0.4,
            split_probability: 0.4,
            branch_angle_degrees: 90.0,
            view_cone_degrees: None,
            planar: true,
            rng_seed: None,
        }
    }
}

impl Config {
    /// Full validation used when the field samples its own seeds and
    /// attractors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed_count == 0 {
            return Err(ConfigError::ZeroSeeds);
        }
        if self.attractor_count == 0 {
            return Err(ConfigError::ZeroAttractors);
        }
        positive("region_radius", self.region_radius)?;
        self.validate_growth()
    }

    /// Validates the growth parameters only. Counts and sampling region are
    /// irrelevant when seeds and attractors are supplied by the caller.
    pub fn validate_growth(&self) -> Result<(), ConfigError> {
        non_negative("dead_zone_radius", self.dead_zone_radius)?;
        positive("growth_step", self.growth_step)?;
        positive("max_attraction_radius", self.max_attraction_radius)?;

        if !(0.0..=1.0).contains(&self.split_probability) {
            return Err(invalid(
                "split_probability",
                self.split_probability,
                "must lie in [0, 1]",
            ));
        }
        if !self.branch_angle_degrees.is_finite() {
            return Err(invalid(
                "branch_angle_degrees",
                self.branch_angle_degrees,
                "must be finite",
            ));
        }
        if let Some(cone) = self.view_cone_degrees
            && !(cone > 0.0 && cone <= 180.0)
        {
            return Err(invalid("view_cone_degrees", cone, "must lie in (0, 180]"));
        }
        Ok(())
    }

    /// Cosine of the view-cone half-angle, if gating is enabled.
    pub fn view_cone_cos(&self) -> Option<f32> {
        self.view_cone_degrees.map(|deg| deg.to_radians().cos())
    }
}

fn invalid(field: &'static str, value: f32, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        field,
        value,
        reason,
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and positive"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and non-negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn zero_counts_are_rejected() {
        let cfg = Config {
            seed_count: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSeeds));

        let cfg = Config {
            attractor_count: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroAttractors));
        // Counts do not matter for explicit setups.
        assert_eq!(cfg.validate_growth(), Ok(()));
    }

    #[test]
    fn negative_radii_and_steps_are_rejected() {
        for cfg in [
            Config {
                dead_zone_radius: -0.1,
                ..Config::default()
            },
            Config {
                growth_step: -0.02,
                ..Config::default()
            },
            Config {
                growth_step: 0.0,
                ..Config::default()
            },
            Config {
                max_attraction_radius: -1.0,
                ..Config::default()
            },
            Config {
                region_radius: f32::NAN,
                ..Config::default()
            },
        ] {
            assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })), "{cfg:?}");
        }
    }

    #[test]
    fn probability_and_cone_ranges_are_enforced() {
        let cfg = Config {
            split_probability: 1.5,
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate_growth(),
            Err(ConfigError::Invalid {
                field: "split_probability",
                ..
            })
        ));

        let cfg = Config {
            view_cone_degrees: Some(0.0),
            ..Config::default()
        };
        assert!(cfg.validate_growth().is_err());

        let cfg = Config {
            view_cone_degrees: Some(180.0),
            ..Config::default()
        };
        assert_eq!(cfg.validate_growth(), Ok(()));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "growth_step": 0.1, "planar": false }"#).unwrap();

        assert_eq!(cfg.growth_step, 0.1);
        assert!(!cfg.planar);
        assert_eq!(cfg.seed_count, Config::default().seed_count);
    }
}
