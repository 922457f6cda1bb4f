//! Layout tuning knobs.
//!
//! Every group deserializes from camelCase JSON and falls back to its defaults for missing
//! fields, so a config file only needs to mention what it overrides.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Seed shared by the flocking preview and the background simulation.
    pub seed: u64,
    pub physics: PhysicsConfig,
    pub boids: BoidConfig,
    pub budget: BudgetConfig,
    pub interpolation: InterpolationConfig,
    pub overlap: OverlapConfig,
    pub links: LinkAnimationConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            physics: PhysicsConfig::default(),
            boids: BoidConfig::default(),
            budget: BudgetConfig::default(),
            interpolation: InterpolationConfig::default(),
            overlap: OverlapConfig::default(),
            links: LinkAnimationConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig {
                    message: format!("{name} must be a positive number, got {v}"),
                })
            }
        }
        fn non_negative(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig {
                    message: format!("{name} must be a non-negative number, got {v}"),
                })
            }
        }

        let p = &self.physics;
        positive("physics.timeStep", p.time_step)?;
        non_negative("physics.theta", p.theta)?;
        non_negative("physics.springLength", p.spring_length)?;
        non_negative("physics.springCoeff", p.spring_coeff)?;
        non_negative("physics.dragCoeff", p.drag_coeff)?;
        positive("physics.maxVelocity", p.max_velocity)?;
        if !p.gravity.is_finite() {
            return Err(Error::InvalidConfig {
                message: format!("physics.gravity must be finite, got {}", p.gravity),
            });
        }

        let b = &self.boids;
        positive("boids.maxSpeed", b.max_speed)?;
        positive("boids.maxForce", b.max_force)?;
        positive("boids.neighborRadius", b.neighbor_radius)?;
        positive("boids.arriveRadius", b.arrive_radius)?;
        non_negative("boids.damping", b.damping)?;

        if self.budget.max_layout_iterations == 0 {
            return Err(Error::InvalidConfig {
                message: "budget.maxLayoutIterations must be at least 1".to_string(),
            });
        }
        if let Some(ms) = self.budget.max_layout_time_ms {
            positive("budget.maxLayoutTimeMs", ms)?;
        }
        positive("budget.sliceMs", self.budget.slice_ms)?;

        non_negative("overlap.padding", self.overlap.padding)?;
        if self.overlap.sweeps_per_pass == 0 {
            return Err(Error::InvalidConfig {
                message: "overlap.sweepsPerPass must be at least 1".to_string(),
            });
        }

        if self.links.max_animations == 0 {
            return Err(Error::InvalidConfig {
                message: "links.maxAnimations must be at least 1".to_string(),
            });
        }
        non_negative("links.speedScale", self.links.speed_scale)?;
        Ok(())
    }
}

/// Force-directed simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub time_step: f64,
    /// Negative values repel.
    pub gravity: f64,
    /// Barnes-Hut opening ratio: a cell is summarized when `cell size / distance < theta`.
    pub theta: f64,
    pub spring_length: f64,
    pub spring_coeff: f64,
    pub drag_coeff: f64,
    pub max_velocity: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            time_step: 10.0,
            gravity: -5.0,
            theta: 0.8,
            spring_length: 20.0,
            spring_coeff: 0.01,
            drag_coeff: 0.9,
            max_velocity: 1.0,
        }
    }
}

/// Flocking preview parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoidConfig {
    pub max_speed: f64,
    pub max_force: f64,
    pub neighbor_radius: f64,
    /// Extra gap kept between neighboring boxes.
    pub padding: f64,
    pub separation_weight: f64,
    pub cohesion_weight: f64,
    pub alignment_weight: f64,
    /// Pull towards the desired position fed from the background layout.
    pub desire_weight: f64,
    /// Distance under which boids slow down when approaching their desired position.
    pub arrive_radius: f64,
    pub wander: f64,
    pub damping: f64,
    /// Initial scatter around the box center.
    pub jitter: f64,
}

impl Default for BoidConfig {
    fn default() -> Self {
        Self {
            max_speed: 8.0,
            max_force: 1.0,
            neighbor_radius: 60.0,
            padding: 2.0,
            separation_weight: 1.5,
            cohesion_weight: 0.02,
            alignment_weight: 0.05,
            desire_weight: 0.25,
            arrive_radius: 100.0,
            wander: 0.05,
            damping: 0.92,
            jitter: 10.0,
        }
    }
}

/// Ceilings for the hidden simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetConfig {
    pub max_layout_iterations: u32,
    /// `None` disables the time ceiling.
    pub max_layout_time_ms: Option<f64>,
    /// Wall-clock slice spent on simulation steps per tick.
    pub slice_ms: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_layout_iterations: 2000,
            max_layout_time_ms: Some(2000.0),
            slice_ms: 10.0,
        }
    }
}

impl BudgetConfig {
    pub fn max_layout_time(&self) -> Option<Duration> {
        self.max_layout_time_ms.map(millis)
    }

    pub fn slice(&self) -> Duration {
        millis(self.slice_ms)
    }
}

fn millis(ms: f64) -> Duration {
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterpolationConfig {
    /// Ticks taken to move from the preview to the final positions.
    pub frames: u32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self { frames: 60 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlapConfig {
    pub passes: u32,
    /// Upper bound on pairwise sweeps inside one pass; a pass stops early once a sweep is clean.
    pub sweeps_per_pass: u32,
    pub padding: f64,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            passes: 3,
            sweeps_per_pass: 10,
            padding: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkAnimationConfig {
    pub max_animations: usize,
    pub seed: u64,
    /// Scale of the gaussian used to pick per-link durations, in frames.
    pub speed_scale: f64,
}

impl Default for LinkAnimationConfig {
    fn default() -> Self {
        Self {
            max_animations: 20,
            seed: 42,
            speed_scale: 10.0,
        }
    }
}
