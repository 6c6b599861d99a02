pub mod color;
pub mod routines;
pub mod scene;
pub mod supervisor;
pub mod zone;

pub use color::{wheel, Palette, Rgb};
pub use routines::{Direction, Routine};
pub use scene::{NotifyTarget, Scene, SceneError, SceneStep, StepError};
pub use supervisor::{
    AnimationContext, AnimationState, AnimationSupervisor, CancelToken, Interrupted, SharedStrip, Step,
};
pub use zone::{Zone, ZoneMap, GLOBAL_ZONE};
