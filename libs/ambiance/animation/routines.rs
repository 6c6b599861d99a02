//! Cancellable LED routines
//!
//! Every routine writes through [`AnimationContext`], which checks the stop
//! token before each pixel and wakes sleeps early, so `?` is all a routine
//! needs to bail out between steps.

use super::color::{wheel, Palette, Rgb};
use super::supervisor::{AnimationContext, Step};
use super::zone::Zone;
use std::time::Duration;

pub const FILL_DELAY: Duration = Duration::from_millis(50);
pub const PULSE_SPEED: Duration = Duration::from_millis(2);
pub const PULSE_STEP: u8 = 20;
pub const PULSE_COUNT: u32 = 3;
pub const BLINK_DELAY: Duration = Duration::from_millis(500);
pub const BLINK_COUNT: u32 = 5;
pub const TRANSITION_SPEED: Duration = Duration::from_millis(10);
pub const TRANSITION_STEP: u8 = 5;
pub const RAINBOW_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FromStart,
    FromEnd,
}

pub fn solid(ctx: &AnimationContext, zone: Zone, color: Rgb) -> Step {
    ctx.fill(zone, color)
}

pub fn clear(ctx: &AnimationContext, zone: Zone) -> Step {
    ctx.fill(zone, Rgb::BLACK)
}

/// Light the zone one pixel at a time
pub fn fill(ctx: &AnimationContext, zone: Zone, color: Rgb, delay: Duration, direction: Direction) -> Step {
    let order: Box<dyn Iterator<Item = usize>> = match direction {
        Direction::FromStart => Box::new(zone.range()),
        Direction::FromEnd => Box::new(zone.reversed()),
    };
    for i in order {
        ctx.set_pixel(i, color)?;
        ctx.show()?;
        ctx.sleep(delay)?;
    }
    Ok(())
}

/// Intensities 0 → 255 → 0 in `step` increments, peak included once
fn ramp(step: u8) -> Vec<u8> {
    let step = step.max(1) as usize;
    let mut levels: Vec<u8> = (0..=255u16).step_by(step).map(|v| v as u8).collect();
    if levels.last() != Some(&255) {
        levels.push(255);
    }
    let down: Vec<u8> = levels.iter().rev().skip(1).copied().collect();
    levels.extend(down);
    levels
}

/// Breathe the zone in and out `count` times
pub fn pulse(ctx: &AnimationContext, zone: Zone, color: Rgb, count: u32, speed: Duration, step: u8) -> Step {
    for _ in 0..count {
        for intensity in ramp(step) {
            ctx.fill(zone, color.scale(intensity))?;
            ctx.sleep(speed)?;
        }
    }
    Ok(())
}

pub fn blink(ctx: &AnimationContext, zone: Zone, color: Rgb, count: u32, delay: Duration) -> Step {
    for _ in 0..count {
        ctx.fill(zone, color)?;
        ctx.sleep(delay)?;
        ctx.fill(zone, Rgb::BLACK)?;
        ctx.sleep(delay)?;
    }
    Ok(())
}

/// Pulse while the hue slides from `from` to `to`, ending lit in `to`
pub fn color_transition_pulse(
    ctx: &AnimationContext,
    zone: Zone,
    from: Rgb,
    to: Rgb,
    speed: Duration,
    step: u8,
) -> Step {
    let step = step.max(1);
    let mut amount: u16 = 0;
    for intensity in ramp(step) {
        let color = from.mix(to, amount.min(255) as u8);
        ctx.fill(zone, color.scale(intensity))?;
        ctx.sleep(speed)?;
        amount += step as u16 / 2 + 1;
    }
    ctx.fill(zone, to)
}

/// Cycle the color wheel across the zone; `None` runs until stopped
pub fn rainbow(ctx: &AnimationContext, zone: Zone, cycles: Option<u32>, delay: Duration) -> Step {
    let len = zone.len().max(1);
    let mut cycle = 0;
    while cycles.map_or(true, |n| cycle < n) {
        for offset in 0..=255u16 {
            for (n, i) in zone.range().enumerate() {
                let pos = (n * 256 / len) as u16 + offset;
                ctx.set_pixel(i, wheel((pos & 255) as u8))?;
            }
            ctx.show()?;
            ctx.sleep(delay)?;
        }
        cycle += 1;
    }
    Ok(())
}

/// A routine with its parameters resolved, ready to run on a zone
#[derive(Debug, Clone, PartialEq)]
pub enum Routine {
    Solid(Rgb),
    Clear,
    Fill {
        color: Rgb,
        delay: Duration,
        direction: Direction,
    },
    Pulse {
        color: Rgb,
        count: u32,
        speed: Duration,
        step: u8,
    },
    Blink {
        color: Rgb,
        count: u32,
        delay: Duration,
    },
    Transition {
        from: Rgb,
        to: Rgb,
        speed: Duration,
        step: u8,
    },
    Rainbow {
        cycles: Option<u32>,
        delay: Duration,
    },
    /// Hold the current frame
    Wait(Duration),
}

impl Routine {
    pub fn run(&self, ctx: &AnimationContext, zone: Zone) -> Step {
        match *self {
            Routine::Solid(color) => solid(ctx, zone, color),
            Routine::Clear => clear(ctx, zone),
            Routine::Fill {
                color,
                delay,
                direction,
            } => fill(ctx, zone, color, delay, direction),
            Routine::Pulse {
                color,
                count,
                speed,
                step,
            } => pulse(ctx, zone, color, count, speed, step),
            Routine::Blink { color, count, delay } => blink(ctx, zone, color, count, delay),
            Routine::Transition { from, to, speed, step } => {
                color_transition_pulse(ctx, zone, from, to, speed, step)
            }
            Routine::Rainbow { cycles, delay } => rainbow(ctx, zone, cycles, delay),
            Routine::Wait(duration) => ctx.sleep(duration),
        }
    }

    /// Parse the value of an `animate#` command
    ///
    /// Accepts `rainbow`, `clear`, `<kind>:<color>` for solid, fill,
    /// fill_end, pulse and blink, and `transition:<from>:<to>`.
    pub fn parse(text: &str, palette: &Palette) -> Option<Routine> {
        let mut parts = text.trim().split(':');
        let kind = parts.next()?.trim().to_ascii_lowercase();
        let mut color = || parts.next().and_then(|c| palette.resolve(c));

        let routine = match kind.as_str() {
            "rainbow" => Routine::Rainbow {
                cycles: None,
                delay: RAINBOW_DELAY,
            },
            "clear" | "off" => Routine::Clear,
            "solid" => Routine::Solid(color()?),
            "fill" | "fill_end" => Routine::Fill {
                color: color()?,
                delay: FILL_DELAY,
                direction: if kind == "fill" {
                    Direction::FromStart
                } else {
                    Direction::FromEnd
                },
            },
            "pulse" => Routine::Pulse {
                color: color()?,
                count: PULSE_COUNT,
                speed: PULSE_SPEED,
                step: PULSE_STEP,
            },
            "blink" => Routine::Blink {
                color: color()?,
                count: BLINK_COUNT,
                delay: BLINK_DELAY,
            },
            "transition" => {
                let from = color()?;
                let to = color()?;
                Routine::Transition {
                    from,
                    to,
                    speed: TRANSITION_SPEED,
                    step: TRANSITION_STEP,
                }
            }
            _ => return None,
        };
        Some(routine)
    }
}
