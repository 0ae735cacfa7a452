use std::collections::BTreeMap;

use super::effects::{Breath, EyeBlink};
use super::expression::{Expression, ExpressionManager};
use super::moc::{Canvas, Drawable, ModelCore};
use super::motion::{Motion, MotionPlayer, MotionPriority};
use super::parameter::{ParameterInfo, ParameterTable};
use super::settings::{EYE_BLINK_GROUP, IDLE_MOTION_GROUP, LIP_SYNC_GROUP, Layout, ModelSettings};
use crate::config::BridgeConfig;
use crate::error::{Live2DError, Result};

/// Expression name that clears the active expression instead of selecting one.
pub const NEUTRAL_EXPRESSION: &str = "neutral";

/// Everything that changes while a model is live: parameters, expression, motion,
/// lip sync. Owns the core and feeds it each update.
pub struct ModelRuntime {
    name: String,
    settings: ModelSettings,
    core: Box<dyn ModelCore>,
    params: ParameterTable,
    expressions: ExpressionManager,
    motions: BTreeMap<String, Vec<Motion>>,
    player: MotionPlayer,
    eye_blink: Option<EyeBlink>,
    breath: Option<Breath>,
    auto_idle: bool,
    lip_sync_ids: Vec<String>,
    lip_sync: f32,
    current_expression: Option<String>,
    elapsed: f64,
}

impl ModelRuntime {
    pub fn new(
        name: String,
        settings: ModelSettings,
        core: Box<dyn ModelCore>,
        expressions: Vec<Expression>,
        motions: BTreeMap<String, Vec<Motion>>,
        config: &BridgeConfig,
    ) -> Self {
        let mut params = ParameterTable::new(core.parameters());

        // Ids the assets drive but the core never declared still get a slot.
        let mut referenced: Vec<&str> = Vec::new();
        referenced.extend(settings.groups.iter().flat_map(|g| g.ids.iter().map(String::as_str)));
        referenced.extend(
            expressions
                .iter()
                .flat_map(|e| e.parameters.iter().map(|p| p.id.as_str())),
        );
        referenced.extend(
            motions
                .values()
                .flatten()
                .flat_map(|m| m.curves.iter())
                .filter(|c| c.target == super::motion::CurveTarget::Parameter)
                .map(|c| c.id.as_str()),
        );
        for id in referenced {
            params.ensure(ParameterInfo::unbounded(id));
        }

        let lip_sync_ids = settings.group_ids(LIP_SYNC_GROUP).to_vec();
        let eye_blink = config
            .eye_blink_interval
            .map(|interval| EyeBlink::new(settings.group_ids(EYE_BLINK_GROUP).to_vec(), interval));
        let breath = config.breath.then(Breath::standard);

        let mut runtime = Self {
            name,
            settings,
            core,
            params,
            expressions: ExpressionManager::new(expressions),
            motions,
            player: MotionPlayer::default(),
            eye_blink,
            breath,
            auto_idle: config.auto_idle,
            lip_sync_ids,
            lip_sync: 0.0,
            current_expression: None,
            elapsed: 0.0,
        };
        runtime.start_idle();
        runtime.core.update(&runtime.params);
        runtime
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn layout(&self) -> Layout {
        self.settings.layout.clone().unwrap_or_default()
    }

    pub fn canvas(&self) -> Canvas {
        self.core.canvas()
    }

    pub fn drawables(&self) -> &[Drawable] {
        self.core.drawables()
    }

    pub fn parameters(&self) -> &ParameterTable {
        &self.params
    }

    pub fn parameter(&self, id: &str) -> Option<f32> {
        self.params.get(id)
    }

    pub fn expression_names(&self) -> Vec<String> {
        self.expressions.names().map(str::to_string).collect()
    }

    pub fn current_expression(&self) -> Option<&str> {
        self.current_expression.as_deref()
    }

    pub fn lip_sync(&self) -> f32 {
        self.lip_sync
    }

    /// Opacity the current motion sets for the whole model, 1 otherwise.
    pub fn model_opacity(&self) -> f32 {
        self.player.model_opacity().unwrap_or(1.0).clamp(0.0, 1.0)
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn current_motion(&self) -> Option<(&str, usize)> {
        self.player.current()
    }

    /// Selects an expression by name; [`NEUTRAL_EXPRESSION`] fades the current one out.
    pub fn set_expression(&mut self, name: &str) -> Result<()> {
        if name == NEUTRAL_EXPRESSION && !self.expressions.contains(name) {
            self.expressions.set(None)?;
        } else {
            self.expressions.set(Some(name))?;
        }
        self.current_expression = Some(name.to_string());
        Ok(())
    }

    /// Stores the value clamped to [0, 1] (NaN becomes 0) and returns what was stored.
    pub fn set_lip_sync(&mut self, value: f32) -> f32 {
        self.lip_sync = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.lip_sync
    }

    /// Returns false when a higher-priority motion keeps playing.
    pub fn start_motion(&mut self, group: &str, index: usize, priority: MotionPriority) -> Result<bool> {
        if self.motion(group, index).is_none() {
            return Err(Live2DError::InvalidMotion {
                group: group.to_string(),
                index,
            });
        }
        Ok(self.player.start(group, index, priority))
    }

    fn motion(&self, group: &str, index: usize) -> Option<&Motion> {
        self.motions.get(group).and_then(|m| m.get(index))
    }

    fn start_idle(&mut self) {
        if self.auto_idle && self.motion(IDLE_MOTION_GROUP, 0).is_some() {
            self.player.start(IDLE_MOTION_GROUP, 0, MotionPriority::Idle);
        }
    }

    fn step_motion(&mut self, delta_time: f32) {
        let motions = &self.motions;
        self.player.update(
            delta_time,
            |group, index| motions.get(group).and_then(|m| m.get(index)),
            &mut self.params,
        );
    }

    /// One animation step: motion, blink, expression, breath, lip sync, then the core.
    pub fn update(&mut self, delta_time: f32) {
        self.elapsed += delta_time as f64;
        self.params.reset_to_defaults();

        if self.player.is_finished() {
            self.start_idle();
        }
        let was_playing = !self.player.is_finished();
        self.step_motion(delta_time);
        if was_playing && self.player.is_finished() {
            // The motion that just ended wrote nothing this step.
            self.start_idle();
            self.step_motion(0.0);
        }

        if let Some(blink) = self.eye_blink.as_mut() {
            blink.update(delta_time, &mut self.params);
        }

        self.expressions.update(delta_time);
        self.expressions.apply(&mut self.params);

        if let Some(breath) = self.breath.as_mut() {
            breath.update(delta_time, &mut self.params);
        }

        for id in &self.lip_sync_ids {
            self.params.set(id, self.lip_sync);
        }

        self.core.update(&self.params);
    }
}
