//! Device controller
//!
//! Owns one node's route manager, animation supervisor and hardware, and
//! runs the cooperative tick loop: maintain routes, poll one frame per
//! route, dispatch message-route payloads to the topic table, poll inputs
//! once. Animations run on their own threads and talk back through the
//! outbox, so nothing in the loop waits on them except a replacement
//! start, which lasts until the old routine notices its stop.

use super::bindings::InputBindings;
use super::relays::{parse_switch, topic_for, RelayBank};
use crate::animation::{
    AnimationSupervisor, NotifyTarget, Palette, Rgb, Routine, Scene, SharedStrip, Zone, ZoneMap, GLOBAL_ZONE,
};
use crate::infrastructure::config::NodeConfig;
use crate::infrastructure::hardware::{HostRelays, InputSource, LoggingStrip, NoInputs, RelayDriver};
use crate::infrastructure::shutdown::ShutdownManager;
use parking_lot::Mutex;
use roomsockets::{
    builder, ConnectionState, DispatchOutcome, FixedDelay, HostLink, LogicError, NetworkLink, Outbox, RouteManager,
    TopicHandler, TopicMatch, TopicMessage, TopicRouter, MESSAGE_ROUTE,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long shutdown waits for the running animation to exit
const ANIMATION_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Hardware handles a controller is built on
pub struct Hardware {
    pub strip: SharedStrip,
    pub relays: Box<dyn RelayDriver>,
    pub inputs: Box<dyn InputSource>,
    pub link: Arc<dyn NetworkLink>,
}

impl Hardware {
    /// Host stand-ins: logging strip, in-memory relays, no inputs, OS network
    pub fn host(config: &NodeConfig) -> Self {
        Self {
            strip: Arc::new(Mutex::new(LoggingStrip::new(config.led.count))),
            relays: Box::new(HostRelays::new(config.relays.len())),
            inputs: Box::new(NoInputs),
            link: Arc::new(HostLink),
        }
    }

    pub fn with_inputs(mut self, inputs: Box<dyn InputSource>) -> Self {
        self.inputs = inputs;
        self
    }
}

/// Everything a topic handler may touch
pub struct DeviceContext {
    device: String,
    palette: Palette,
    zones: ZoneMap,
    scenes: BTreeMap<String, Arc<Scene>>,
    notify: Option<NotifyTarget>,
    supervisor: AnimationSupervisor,
    relays: RelayBank,
    outbox: Outbox,
}

impl DeviceContext {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn zones(&self) -> &ZoneMap {
        &self.zones
    }

    pub fn supervisor(&self) -> &AnimationSupervisor {
        &self.supervisor
    }

    pub fn relays(&self) -> &RelayBank {
        &self.relays
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Replace the running animation with `routine` on `zone`
    pub fn start_routine(&self, name: impl Into<String>, routine: Routine, zone: Zone) -> Result<u64, LogicError> {
        self.supervisor
            .start_animation(name, move |ctx| routine.run(ctx, zone))
    }

    /// Replace the running animation with a configured scene
    pub fn start_scene(&self, name: &str) -> Result<u64, LogicError> {
        let scene = self
            .scenes
            .get(name)
            .cloned()
            .ok_or_else(|| LogicError::UnknownTopic(name.to_string()))?;
        let notify = self.notify.clone();
        self.supervisor
            .start_animation(scene.name.clone(), move |ctx| scene.run(ctx, notify.as_ref()))
    }
}

fn reject(message: &TopicMessage<'_>, reason: impl Into<String>) -> LogicError {
    LogicError::Handler {
        topic: message.topic.to_string(),
        reason: reason.into(),
    }
}

/// What one tick did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub handled: usize,
    pub unmatched: usize,
    pub failed: usize,
    /// Routes that failed during this tick
    pub route_failures: usize,
    /// Input events that produced an outbound message
    pub inputs_sent: usize,
}

pub struct DeviceController {
    manager: RouteManager,
    router: TopicRouter<DeviceContext>,
    ctx: DeviceContext,
    inputs: Box<dyn InputSource>,
    bindings: InputBindings,
    tick_interval: Duration,
}

impl DeviceController {
    pub fn new(config: &NodeConfig, hardware: Hardware) -> anyhow::Result<Self> {
        config.validate()?;
        let device = config.device_name.clone();

        let relays = RelayBank::new(
            device.clone(),
            config.notify.clone(),
            config.relays.clone(),
            hardware.relays,
        );

        let mut manager_builder = builder()
            .hub(&config.hub.host, config.hub.port)
            .device(device.clone())
            .route_suffixes(config.routes.clone())
            .retry_queue_capacity(config.retry_queue_capacity)
            .max_frame_len(config.max_frame_len)
            .reconnect_strategy(FixedDelay::new(config.reconnect_interval()))
            .link(hardware.link)
            .output_sync(Arc::new(relays.clone()));
        if let Some(greeting) = &config.greeting {
            manager_builder = manager_builder.greeting(greeting.clone());
        }
        let manager = manager_builder.build()?;

        let outbox = manager.outbox();
        let supervisor = AnimationSupervisor::new(hardware.strip).with_outbox(outbox.clone());
        let scenes = config
            .resolve_scenes()?
            .into_iter()
            .map(|(name, scene)| (name, Arc::new(scene)))
            .collect();

        let ctx = DeviceContext {
            device: device.clone(),
            palette: config.palette(),
            zones: config.zones(),
            scenes,
            notify: config.notify.clone().map(|destination| NotifyTarget {
                device: device.clone(),
                destination,
            }),
            supervisor,
            relays,
            outbox,
        };

        let mut router = TopicRouter::new();
        register_builtin_topics(&mut router, ctx.relays.count());
        for (fragment, scene) in &config.triggers {
            let scene = scene.clone();
            router.on(TopicMatch::contains(fragment.clone()), move |ctx: &mut DeviceContext, _msg| {
                ctx.start_scene(&scene).map(|_| ())
            });
        }
        info!("[{}] {} topic handlers registered", device, router.len());

        Ok(Self {
            manager,
            router,
            ctx,
            inputs: hardware.inputs,
            bindings: InputBindings::from_config(config),
            tick_interval: config.tick_interval(),
        })
    }

    /// Device-specific handlers go after the built-ins
    pub fn router_mut(&mut self) -> &mut TopicRouter<DeviceContext> {
        &mut self.router
    }

    pub fn context(&self) -> &DeviceContext {
        &self.ctx
    }

    pub fn manager(&self) -> &RouteManager {
        &self.manager
    }

    pub fn supervisor(&self) -> &AnimationSupervisor {
        &self.ctx.supervisor
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Open every route; true when all came up
    pub async fn start(&mut self) -> bool {
        info!("[{}] Starting", self.ctx.device);
        self.manager.start().await
    }

    pub async fn tick(&mut self) -> TickSummary {
        let report = self.manager.tick().await;
        let mut summary = TickSummary {
            route_failures: report.failures.len(),
            ..TickSummary::default()
        };

        for message in &report.messages {
            if message.route != MESSAGE_ROUTE {
                debug!("[{}] Not dispatching '{}' from {}", self.ctx.device, message.text, message.route);
                continue;
            }
            match self.router.dispatch(&mut self.ctx, &message.route, &message.text) {
                DispatchOutcome::Handled => summary.handled += 1,
                DispatchOutcome::Unmatched => summary.unmatched += 1,
                DispatchOutcome::Failed(_) => summary.failed += 1,
            }
        }

        if let Some(event) = self.inputs.poll() {
            debug!("[{}] Input: {:?}", self.ctx.device, event);
            if let Some(text) = self.bindings.envelope_for(&event) {
                self.manager.send(&text).await;
                summary.inputs_sent += 1;
            }
        }

        summary
    }

    /// Tick until shutdown, then close everything
    pub async fn run(&mut self, shutdown: &ShutdownManager) -> anyhow::Result<()> {
        if !self.start().await {
            warn!("[{}] Started degraded, retrying in the background", self.ctx.device);
        }

        while shutdown.is_running() {
            self.tick().await;
            shutdown.interruptible_sleep(self.tick_interval).await;
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop the animation and close every route
    pub async fn shutdown(&mut self) {
        if self.ctx.supervisor.request_stop() && !self.ctx.supervisor.wait_idle(ANIMATION_STOP_TIMEOUT) {
            warn!("[{}] Animation did not stop in time", self.ctx.device);
        }
        self.manager.shutdown().await;
        info!("[{}] Stopped", self.ctx.device);
    }
}

/// `led#on|off`, `color#`, `animate#`, `scene#`, `stop` and `relayN#`
fn register_builtin_topics(router: &mut TopicRouter<DeviceContext>, relay_count: usize) {
    router
        .on(TopicMatch::exact("led"), |ctx: &mut DeviceContext, msg| {
            let routine = match msg.value.and_then(parse_switch) {
                Some(true) => Routine::Solid(Rgb::WHITE),
                Some(false) => Routine::Clear,
                None => return Err(reject(msg, "expected on or off")),
            };
            ctx.start_routine("led", routine, global(ctx)).map(|_| ())
        })
        .on(TopicMatch::exact("color"), |ctx: &mut DeviceContext, msg| {
            let color = msg
                .value
                .and_then(|v| ctx.palette.resolve(v))
                .ok_or_else(|| reject(msg, "unknown color"))?;
            ctx.start_routine("color", Routine::Solid(color), global(ctx)).map(|_| ())
        })
        .on(TopicMatch::exact("animate"), |ctx: &mut DeviceContext, msg| {
            let value = msg.value.unwrap_or_default();
            let routine = Routine::parse(value, &ctx.palette).ok_or_else(|| reject(msg, "unknown routine"))?;
            ctx.start_routine(value, routine, global(ctx)).map(|_| ())
        })
        .on(TopicMatch::exact("scene"), |ctx: &mut DeviceContext, msg| {
            let name = msg.value.ok_or_else(|| reject(msg, "missing scene name"))?;
            ctx.start_scene(name).map(|_| ())
        })
        .on(TopicMatch::exact("stop"), |ctx: &mut DeviceContext, _msg| {
            ctx.supervisor.stop_current();
            Ok(())
        });

    for number in 1..=relay_count {
        router.on_handler(TopicMatch::exact(topic_for(number)), RelayHandler { number });
    }
}

/// `relayN#true|false`: switch relay N and announce its new state
struct RelayHandler {
    number: usize,
}

impl TopicHandler<DeviceContext> for RelayHandler {
    fn handle(&mut self, ctx: &mut DeviceContext, msg: &TopicMessage<'_>) -> Result<(), LogicError> {
        let on = msg
            .value
            .and_then(parse_switch)
            .ok_or_else(|| reject(msg, "expected true or false"))?;
        let announcement = ctx.relays.set(self.number, on)?;
        ctx.outbox.send(announcement);
        Ok(())
    }
}

fn global(ctx: &DeviceContext) -> Zone {
    ctx.zones.get(GLOBAL_ZONE).unwrap_or_else(|| ctx.zones.global())
}
