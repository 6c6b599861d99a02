//! Scenes: named sequences of routines started by trigger payloads

use super::color::Palette;
use super::routines::*;
use super::supervisor::{AnimationContext, Step};
use super::zone::{Zone, ZoneMap};
use crate::infrastructure::config::SceneStepConfig;
use std::time::Duration;
use thiserror::Error;

/// A configured scene that cannot be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("scene '{scene}' step {step}: {reason}")]
pub struct SceneError {
    pub scene: String,
    /// 1-based position of the step
    pub step: usize,
    #[source]
    pub reason: StepError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("unknown zone '{0}'")]
    UnknownZone(String),

    #[error("'{routine}' needs a {field}")]
    MissingColor { routine: String, field: &'static str },

    #[error("unknown color '{0}'")]
    UnknownColor(String),

    #[error("unknown routine '{0}'")]
    UnknownRoutine(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneStep {
    pub zone: Zone,
    pub routine: Routine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub steps: Vec<SceneStep>,
}

impl Scene {
    /// Resolve configured steps against the palette and zones
    pub fn resolve(
        name: &str,
        steps: &[SceneStepConfig],
        palette: &Palette,
        zones: &ZoneMap,
    ) -> Result<Scene, SceneError> {
        let steps = steps
            .iter()
            .enumerate()
            .map(|(n, step)| {
                resolve_step(step, palette, zones).map_err(|reason| SceneError {
                    scene: name.to_string(),
                    step: n + 1,
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Scene {
            name: name.to_string(),
            steps,
        })
    }

    /// Run every step in order; with `notify` set, bracket the run with
    /// `{scene}#start` and `{scene}#end` messages
    ///
    /// The end message is only sent when the scene ran to completion.
    pub fn run(&self, ctx: &AnimationContext, notify: Option<&NotifyTarget>) -> Step {
        if let Some(target) = notify {
            ctx.send(target.envelope(&self.name, "start"));
        }
        for step in &self.steps {
            step.routine.run(ctx, step.zone)?;
        }
        if let Some(target) = notify {
            ctx.send(target.envelope(&self.name, "end"));
        }
        Ok(())
    }
}

/// Sender and destination for scene notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub device: String,
    pub destination: String,
}

impl NotifyTarget {
    pub fn envelope(&self, topic: &str, value: &str) -> String {
        roomsockets::protocol::format(&self.device, &[self.destination.as_str()], topic, value)
    }
}

fn resolve_step(step: &SceneStepConfig, palette: &Palette, zones: &ZoneMap) -> Result<SceneStep, StepError> {
    let zone = zones
        .get(&step.zone)
        .ok_or_else(|| StepError::UnknownZone(step.zone.clone()))?;

    let color = |value: &Option<String>, field: &'static str| -> Result<_, StepError> {
        let text = value.as_deref().ok_or_else(|| StepError::MissingColor {
            routine: step.routine.clone(),
            field,
        })?;
        palette
            .resolve(text)
            .ok_or_else(|| StepError::UnknownColor(text.to_string()))
    };
    let delay = |default: Duration| step.delay_ms.map_or(default, Duration::from_millis);

    let routine = match step.routine.as_str() {
        "solid" => Routine::Solid(color(&step.color, "color")?),
        "clear" => Routine::Clear,
        "fill" | "fill_end" => Routine::Fill {
            color: color(&step.color, "color")?,
            delay: delay(FILL_DELAY),
            direction: if step.routine == "fill" {
                Direction::FromStart
            } else {
                Direction::FromEnd
            },
        },
        "pulse" => Routine::Pulse {
            color: color(&step.color, "color")?,
            count: step.count.unwrap_or(PULSE_COUNT),
            speed: delay(PULSE_SPEED),
            step: PULSE_STEP,
        },
        "blink" => Routine::Blink {
            color: color(&step.color, "color")?,
            count: step.count.unwrap_or(BLINK_COUNT),
            delay: delay(BLINK_DELAY),
        },
        "transition" => Routine::Transition {
            from: color(&step.color, "color")?,
            to: color(&step.to, "target color")?,
            speed: delay(TRANSITION_SPEED),
            step: TRANSITION_STEP,
        },
        "rainbow" => Routine::Rainbow {
            cycles: step.count,
            delay: delay(RAINBOW_DELAY),
        },
        "wait" => Routine::Wait(delay(Duration::ZERO)),
        other => return Err(StepError::UnknownRoutine(other.to_string())),
    };

    Ok(SceneStep { zone, routine })
}
