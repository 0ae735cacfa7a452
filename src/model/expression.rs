use serde::{Deserialize, Serialize};
use std::path::Path;

use super::parameter::ParameterTable;
use crate::error::{Live2DError, Result};

const DEFAULT_FADE_TIME: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExpressionBlend {
    #[default]
    Add,
    Multiply,
    Overwrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpressionParameter {
    pub id: String,
    pub value: f32,
    #[serde(default)]
    pub blend: ExpressionBlend,
}

/// `*.exp3.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpressionFile {
    #[serde(default)]
    pub fade_in_time: Option<f32>,
    #[serde(default)]
    pub fade_out_time: Option<f32>,
    #[serde(default)]
    pub parameters: Vec<ExpressionParameter>,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub name: String,
    pub fade_in: f32,
    pub fade_out: f32,
    pub parameters: Vec<ExpressionParameter>,
}

impl Expression {
    pub fn from_file(name: &str, path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|err| Live2DError::read_failed(path, err))?;
        let file: ExpressionFile =
            serde_json::from_slice(&data).map_err(|source| Live2DError::ModelParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_parsed(name, file))
    }

    pub fn from_parsed(name: &str, file: ExpressionFile) -> Self {
        Self {
            name: name.to_string(),
            fade_in: file.fade_in_time.unwrap_or(DEFAULT_FADE_TIME).max(0.0),
            fade_out: file.fade_out_time.unwrap_or(DEFAULT_FADE_TIME).max(0.0),
            parameters: file.parameters,
        }
    }

    pub fn apply(&self, params: &mut ParameterTable, weight: f32) {
        for p in &self.parameters {
            match p.blend {
                ExpressionBlend::Add => params.add(&p.id, p.value, weight),
                ExpressionBlend::Multiply => params.multiply(&p.id, p.value, weight),
                ExpressionBlend::Overwrite => params.blend_to(&p.id, p.value, weight),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    FadingIn,
    Holding,
    FadingOut,
}

#[derive(Debug, Clone)]
struct ActiveExpression {
    index: usize,
    weight: f32,
    phase: Phase,
}

/// Cross-fades between expressions. Several may be live while one fades out.
#[derive(Debug, Clone, Default)]
pub struct ExpressionManager {
    expressions: Vec<Expression>,
    active: Vec<ActiveExpression>,
}

impl ExpressionManager {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Self {
            expressions,
            active: Vec::new(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.expressions.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.expressions.iter().any(|e| e.name == name)
    }

    /// Starts fading `name` in and everything else out. `None` fades all out.
    pub fn set(&mut self, name: Option<&str>) -> Result<()> {
        let index = match name {
            Some(name) => Some(
                self.expressions
                    .iter()
                    .position(|e| e.name == name)
                    .ok_or_else(|| Live2DError::InvalidExpression {
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };

        for entry in &mut self.active {
            if Some(entry.index) != index {
                entry.phase = Phase::FadingOut;
            }
        }

        if let Some(index) = index {
            match self.active.iter_mut().find(|e| e.index == index) {
                Some(entry) if entry.phase == Phase::FadingOut => entry.phase = Phase::FadingIn,
                Some(_) => {}
                None => self.active.push(ActiveExpression {
                    index,
                    weight: 0.0,
                    phase: Phase::FadingIn,
                }),
            }
        }
        Ok(())
    }

    pub fn update(&mut self, delta_time: f32) {
        for entry in &mut self.active {
            let expr = &self.expressions[entry.index];
            match entry.phase {
                Phase::FadingIn => {
                    entry.weight = step_weight(entry.weight, delta_time, expr.fade_in, 1.0);
                    if entry.weight >= 1.0 {
                        entry.phase = Phase::Holding;
                    }
                }
                Phase::FadingOut => {
                    entry.weight = step_weight(entry.weight, delta_time, expr.fade_out, -1.0);
                }
                Phase::Holding => {}
            }
        }
        self.active
            .retain(|e| !(e.phase == Phase::FadingOut && e.weight <= 0.0));
    }

    pub fn apply(&self, params: &mut ParameterTable) {
        for entry in &self.active {
            self.expressions[entry.index].apply(params, entry.weight);
        }
    }

    pub fn weight_of(&self, name: &str) -> f32 {
        self.active
            .iter()
            .find(|e| self.expressions[e.index].name == name)
            .map(|e| e.weight)
            .unwrap_or(0.0)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

fn step_weight(weight: f32, dt: f32, fade: f32, direction: f32) -> f32 {
    if fade <= 0.0 {
        return if direction > 0.0 { 1.0 } else { 0.0 };
    }
    (weight + direction * dt / fade).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parameter::ParameterInfo;

    fn smile() -> Expression {
        let file: ExpressionFile = serde_json::from_str(
            r#"{
                "Type": "Live2D Expression",
                "FadeInTime": 0.5,
                "FadeOutTime": 0.25,
                "Parameters": [
                    {"Id": "ParamEyeLSmile", "Value": 1.0},
                    {"Id": "ParamMouthForm", "Value": 1.0, "Blend": "Overwrite"},
                    {"Id": "ParamEyeLOpen", "Value": 0.5, "Blend": "Multiply"}
                ]
            }"#,
        )
        .unwrap();
        Expression::from_parsed("smile", file)
    }

    fn params() -> ParameterTable {
        ParameterTable::new(&[
            ParameterInfo::new("ParamEyeLSmile", 0.0, 1.0, 0.0),
            ParameterInfo::new("ParamMouthForm", -1.0, 1.0, -1.0),
            ParameterInfo::new("ParamEyeLOpen", 0.0, 1.0, 1.0),
        ])
    }

    #[test]
    fn blend_defaults_to_add() {
        let e = smile();
        assert_eq!(e.parameters[0].blend, ExpressionBlend::Add);
        assert_eq!(e.parameters[1].blend, ExpressionBlend::Overwrite);
        assert_eq!(e.fade_in, 0.5);
    }

    #[test]
    fn full_weight_applies_each_blend_mode() {
        let mut p = params();
        smile().apply(&mut p, 1.0);
        assert_eq!(p.get("ParamEyeLSmile"), Some(1.0));
        assert_eq!(p.get("ParamMouthForm"), Some(1.0));
        assert_eq!(p.get("ParamEyeLOpen"), Some(0.5));
    }

    #[test]
    fn fade_in_is_monotonic_and_reaches_one() {
        let mut m = ExpressionManager::new(vec![smile()]);
        m.set(Some("smile")).unwrap();

        let mut last = 0.0;
        for _ in 0..10 {
            m.update(0.1);
            let w = m.weight_of("smile");
            assert!(w >= last);
            last = w;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn clearing_fades_out_and_drops_entry() {
        let mut m = ExpressionManager::new(vec![smile()]);
        m.set(Some("smile")).unwrap();
        m.update(1.0);
        m.set(None).unwrap();
        m.update(0.1);
        assert!(m.weight_of("smile") < 1.0);
        m.update(1.0);
        assert!(m.is_idle());
    }

    #[test]
    fn unknown_expression_is_rejected() {
        let mut m = ExpressionManager::new(vec![smile()]);
        let err = m.set(Some("angry")).unwrap_err();
        assert!(matches!(err, Live2DError::InvalidExpression { .. }));
        assert!(m.is_idle());
    }
}
