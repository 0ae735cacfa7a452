// Procedural idle effects layered on top of motions.

use std::f32::consts::TAU;

use super::parameter::ParameterTable;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlinkState {
    Interval,
    Closing,
    Closed,
    Opening,
}

/// Periodic eye blink. Multiplies the eye-open parameters so motion-closed eyes stay closed.
#[derive(Debug, Clone)]
pub struct EyeBlink {
    ids: Vec<String>,
    interval: f32,
    closing: f32,
    closed: f32,
    opening: f32,
    state: BlinkState,
    state_time: f32,
}

impl EyeBlink {
    pub fn new(ids: Vec<String>, interval: f32) -> Self {
        Self {
            ids,
            interval: interval.max(0.1),
            closing: 0.1,
            closed: 0.05,
            opening: 0.15,
            state: BlinkState::Interval,
            state_time: 0.0,
        }
    }

    /// Eye openness for the current state, 1 = fully open.
    pub fn openness(&self) -> f32 {
        match self.state {
            BlinkState::Interval => 1.0,
            BlinkState::Closing => 1.0 - (self.state_time / self.closing).min(1.0),
            BlinkState::Closed => 0.0,
            BlinkState::Opening => (self.state_time / self.opening).min(1.0),
        }
    }

    pub fn update(&mut self, delta_time: f32, params: &mut ParameterTable) {
        if self.ids.is_empty() {
            return;
        }
        self.state_time += delta_time;
        loop {
            let (limit, next) = match self.state {
                BlinkState::Interval => (self.interval, BlinkState::Closing),
                BlinkState::Closing => (self.closing, BlinkState::Closed),
                BlinkState::Closed => (self.closed, BlinkState::Opening),
                BlinkState::Opening => (self.opening, BlinkState::Interval),
            };
            if self.state_time < limit {
                break;
            }
            self.state_time -= limit;
            self.state = next;
        }

        let openness = self.openness();
        for id in &self.ids {
            params.multiply(id, openness, 1.0);
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreathParameter {
    pub id: String,
    pub offset: f32,
    pub peak: f32,
    pub cycle: f32,
    pub weight: f32,
}

/// Sine sway added to the head, body and breath parameters.
#[derive(Debug, Clone)]
pub struct Breath {
    parameters: Vec<BreathParameter>,
    time: f32,
}

impl Breath {
    pub fn new(parameters: Vec<BreathParameter>) -> Self {
        Self {
            parameters,
            time: 0.0,
        }
    }

    pub fn standard() -> Self {
        let p = |id: &str, offset, peak, cycle| BreathParameter {
            id: id.to_string(),
            offset,
            peak,
            cycle,
            weight: 0.5,
        };
        Self::new(vec![
            p("ParamAngleX", 0.0, 15.0, 6.5345),
            p("ParamAngleY", 0.0, 8.0, 3.5345),
            p("ParamAngleZ", 0.0, 10.0, 5.5345),
            p("ParamBodyAngleX", 0.0, 4.0, 15.5345),
            p("ParamBreath", 0.5, 0.5, 3.2345),
        ])
    }

    pub fn update(&mut self, delta_time: f32, params: &mut ParameterTable) {
        self.time += delta_time;
        for p in &self.parameters {
            let value = p.offset + p.peak * (TAU * self.time / p.cycle).sin();
            params.add(&p.id, value, p.weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parameter::ParameterInfo;

    fn eyes() -> ParameterTable {
        ParameterTable::new(&[
            ParameterInfo::new("ParamEyeLOpen", 0.0, 1.0, 1.0),
            ParameterInfo::new("ParamEyeROpen", 0.0, 1.0, 1.0),
        ])
    }

    #[test]
    fn blink_cycle_closes_then_reopens() {
        let mut blink = EyeBlink::new(
            vec!["ParamEyeLOpen".into(), "ParamEyeROpen".into()],
            1.0,
        );
        let mut params = eyes();

        blink.update(0.5, &mut params);
        assert_eq!(params.get("ParamEyeLOpen"), Some(1.0));

        // interval (1.0) + closing (0.1) elapsed: fully closed
        params.reset_to_defaults();
        blink.update(0.62, &mut params);
        assert_eq!(params.get("ParamEyeLOpen"), Some(0.0));
        assert_eq!(params.get("ParamEyeROpen"), Some(0.0));

        params.reset_to_defaults();
        blink.update(0.5, &mut params);
        assert_eq!(blink.openness(), 1.0);
    }

    #[test]
    fn blink_without_ids_is_inert() {
        let mut blink = EyeBlink::new(Vec::new(), 1.0);
        let mut params = eyes();
        blink.update(1.12, &mut params);
        assert_eq!(params.get("ParamEyeLOpen"), Some(1.0));
    }

    #[test]
    fn breath_oscillates_around_offset() {
        let mut breath = Breath::new(vec![BreathParameter {
            id: "ParamBreath".into(),
            offset: 0.5,
            peak: 0.5,
            cycle: 4.0,
            weight: 1.0,
        }]);
        let mut params = ParameterTable::new(&[ParameterInfo::new("ParamBreath", 0.0, 1.0, 0.0)]);

        breath.update(1.0, &mut params);
        assert!((params.get("ParamBreath").unwrap() - 1.0).abs() < 1e-5);

        params.reset_to_defaults();
        breath.update(2.0, &mut params);
        assert!(params.get("ParamBreath").unwrap().abs() < 1e-5);
    }
}
