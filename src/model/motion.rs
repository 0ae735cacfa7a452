// Motion playback for *.motion3.json curves.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

use super::parameter::ParameterTable;
use crate::error::{Live2DError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionFile {
    pub version: u32,
    pub meta: MotionMeta,
    #[serde(default)]
    pub curves: Vec<MotionCurveFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionMeta {
    pub duration: f32,
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(rename = "Loop", default)]
    pub looping: bool,
    #[serde(default)]
    pub fade_in_time: Option<f32>,
    #[serde(default)]
    pub fade_out_time: Option<f32>,
}

fn default_fps() -> f32 {
    30.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionCurveFile {
    pub target: String,
    pub id: String,
    pub segments: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub time: f32,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Linear(Point, Point),
    Bezier(Point, Point, Point, Point),
    Stepped(Point, Point),
    InverseStepped(Point, Point),
}

impl Segment {
    fn start(&self) -> Point {
        match self {
            Segment::Linear(p0, _)
            | Segment::Bezier(p0, ..)
            | Segment::Stepped(p0, _)
            | Segment::InverseStepped(p0, _) => *p0,
        }
    }

    fn end(&self) -> Point {
        match self {
            Segment::Linear(_, p1)
            | Segment::Bezier(.., p1)
            | Segment::Stepped(_, p1)
            | Segment::InverseStepped(_, p1) => *p1,
        }
    }

    fn evaluate(&self, time: f32) -> f32 {
        let (p0, p1) = (self.start(), self.end());
        let span = p1.time - p0.time;
        let t = if span > 0.0 {
            ((time - p0.time) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self {
            Segment::Linear(..) => p0.value + (p1.value - p0.value) * t,
            // Control points are assumed evenly spaced in time.
            Segment::Bezier(a, b, c, d) => {
                let lerp = |x: f32, y: f32| x + (y - x) * t;
                let ab = lerp(a.value, b.value);
                let bc = lerp(b.value, c.value);
                let cd = lerp(c.value, d.value);
                lerp(lerp(ab, bc), lerp(bc, cd))
            }
            Segment::Stepped(..) => p0.value,
            Segment::InverseStepped(..) => p1.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurveTarget {
    Parameter,
    PartOpacity,
    Model,
}

#[derive(Debug, Clone)]
pub struct MotionCurve {
    pub target: CurveTarget,
    pub id: String,
    pub segments: Vec<Segment>,
}

impl MotionCurve {
    pub fn parse(raw: &MotionCurveFile) -> std::result::Result<Self, String> {
        let target = match raw.target.as_str() {
            "Parameter" => CurveTarget::Parameter,
            "PartOpacity" => CurveTarget::PartOpacity,
            "Model" => CurveTarget::Model,
            other => return Err(format!("unknown curve target '{other}'")),
        };
        Ok(Self {
            target,
            id: raw.id.clone(),
            segments: parse_segments(&raw.segments)?,
        })
    }

    pub fn evaluate(&self, time: f32) -> f32 {
        let Some(first) = self.segments.first() else {
            return 0.0;
        };
        if time <= first.start().time {
            return first.start().value;
        }
        match self.segments.iter().find(|s| s.end().time > time) {
            Some(segment) => segment.evaluate(time),
            None => self.segments.last().map(|s| s.end().value).unwrap_or(0.0),
        }
    }
}

/// Flat layout: `t0, v0, (type, points...)*` where each point is `t, v`.
fn parse_segments(raw: &[f32]) -> std::result::Result<Vec<Segment>, String> {
    if raw.len() < 2 {
        return Err("curve has no base point".into());
    }
    let point = |i: usize| -> std::result::Result<Point, String> {
        match (raw.get(i), raw.get(i + 1)) {
            (Some(&time), Some(&value)) => Ok(Point { time, value }),
            _ => Err(format!("truncated segment data at {i}")),
        }
    };

    let mut segments = Vec::new();
    let mut last = point(0)?;
    let mut i = 2;
    while i < raw.len() {
        let kind = raw[i] as i32;
        i += 1;
        let segment = match kind {
            0 => {
                let p1 = point(i)?;
                i += 2;
                Segment::Linear(last, p1)
            }
            1 => {
                let (c1, c2, p1) = (point(i)?, point(i + 2)?, point(i + 4)?);
                i += 6;
                Segment::Bezier(last, c1, c2, p1)
            }
            2 => {
                let p1 = point(i)?;
                i += 2;
                Segment::Stepped(last, p1)
            }
            3 => {
                let p1 = point(i)?;
                i += 2;
                Segment::InverseStepped(last, p1)
            }
            other => return Err(format!("unknown segment type {other}")),
        };
        last = segment.end();
        segments.push(segment);
    }
    Ok(segments)
}

#[derive(Debug, Clone)]
pub struct Motion {
    pub duration: f32,
    pub looping: bool,
    pub fade_in: f32,
    pub fade_out: f32,
    pub curves: Vec<MotionCurve>,
}

impl Motion {
    pub fn from_file(path: &Path, fade_in: Option<f32>, fade_out: Option<f32>) -> Result<Self> {
        let data = std::fs::read(path).map_err(|err| Live2DError::read_failed(path, err))?;
        let file: MotionFile =
            serde_json::from_slice(&data).map_err(|source| Live2DError::ModelParse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_parsed(file, fade_in, fade_out).map_err(|reason| Live2DError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Fade times from the settings file take precedence over the motion's own.
    pub fn from_parsed(
        file: MotionFile,
        fade_in: Option<f32>,
        fade_out: Option<f32>,
    ) -> std::result::Result<Self, String> {
        let curves = file
            .curves
            .iter()
            .map(MotionCurve::parse)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            duration: file.meta.duration.max(0.0),
            looping: file.meta.looping,
            fade_in: fade_in.or(file.meta.fade_in_time).unwrap_or(1.0).max(0.0),
            fade_out: fade_out.or(file.meta.fade_out_time).unwrap_or(1.0).max(0.0),
            curves,
        })
    }

    /// Writes every curve at `time`, blended by `weight`. Returns the model opacity curve if any.
    pub fn apply(&self, params: &mut ParameterTable, time: f32, weight: f32) -> Option<f32> {
        let mut opacity = None;
        for curve in &self.curves {
            let value = curve.evaluate(time);
            match curve.target {
                CurveTarget::Parameter => params.blend_to(&curve.id, value, weight),
                CurveTarget::Model if curve.id == "Opacity" => opacity = Some(value),
                CurveTarget::Model | CurveTarget::PartOpacity => {}
            }
        }
        opacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MotionPriority {
    Idle = 1,
    Normal = 2,
    Force = 3,
}

#[derive(Debug, Clone)]
struct Playing {
    group: String,
    index: usize,
    priority: MotionPriority,
    elapsed: f32,
}

/// Plays one motion at a time; higher priorities interrupt lower ones.
#[derive(Debug, Default)]
pub struct MotionPlayer {
    playing: Option<Playing>,
    model_opacity: Option<f32>,
}

impl MotionPlayer {
    /// Returns false when a motion of higher priority is still playing.
    pub fn start(&mut self, group: &str, index: usize, priority: MotionPriority) -> bool {
        if let Some(current) = &self.playing {
            if current.priority > priority {
                return false;
            }
        }
        self.playing = Some(Playing {
            group: group.to_string(),
            index,
            priority,
            elapsed: 0.0,
        });
        true
    }

    pub fn current(&self) -> Option<(&str, usize)> {
        self.playing.as_ref().map(|p| (p.group.as_str(), p.index))
    }

    pub fn is_finished(&self) -> bool {
        self.playing.is_none()
    }

    pub fn model_opacity(&self) -> Option<f32> {
        self.model_opacity
    }

    /// Advances the current motion and writes it into `params`.
    pub fn update<'a>(
        &mut self,
        delta_time: f32,
        lookup: impl Fn(&str, usize) -> Option<&'a Motion>,
        params: &mut ParameterTable,
    ) {
        let Some(playing) = self.playing.as_mut() else {
            return;
        };
        let Some(motion) = lookup(&playing.group, playing.index) else {
            self.playing = None;
            return;
        };

        playing.elapsed += delta_time;
        if !motion.looping && playing.elapsed >= motion.duration {
            self.playing = None;
            self.model_opacity = None;
            return;
        }

        let time = if motion.looping && motion.duration > 0.0 {
            playing.elapsed % motion.duration
        } else {
            playing.elapsed
        };
        let weight = motion_weight(motion, playing.elapsed);
        self.model_opacity = motion.apply(params, time, weight);
    }
}

fn ease_sine(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    0.5 - 0.5 * (t * PI).cos()
}

fn motion_weight(motion: &Motion, elapsed: f32) -> f32 {
    let fade_in = if motion.fade_in > 0.0 {
        ease_sine(elapsed / motion.fade_in)
    } else {
        1.0
    };
    let fade_out = if !motion.looping && motion.fade_out > 0.0 {
        ease_sine((motion.duration - elapsed) / motion.fade_out)
    } else {
        1.0
    };
    fade_in * fade_out
}
