use std::collections::HashMap;

/// Static description of one model parameter as the core reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub id: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParameterInfo {
    /// Reversed bounds are swapped and a NaN bound leaves that side open.
    pub fn new(id: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        let min = if min.is_nan() { f32::NEG_INFINITY } else { min };
        let max = if max.is_nan() { f32::INFINITY } else { max };
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            id: id.into(),
            min,
            max,
            default,
        }
    }

    /// Parameter referenced by an asset but unknown to the core: no range limit.
    pub fn unbounded(id: impl Into<String>) -> Self {
        Self::new(id, f32::NEG_INFINITY, f32::INFINITY, 0.0)
    }

    pub fn clamp(&self, value: f32) -> f32 {
        // Tolerates reversed or NaN bounds set through the public fields.
        value.max(self.min.min(self.max)).min(self.max.max(self.min))
    }
}

/// Current value of every parameter, in the order the core declared them.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    infos: Vec<ParameterInfo>,
    values: Vec<f32>,
    index: HashMap<String, usize>,
}

impl ParameterTable {
    pub fn new(infos: &[ParameterInfo]) -> Self {
        let mut table = Self::default();
        for info in infos {
            table.ensure(info.clone());
        }
        table
    }

    /// Registers a parameter unless its id is already present. Returns its index.
    pub fn ensure(&mut self, info: ParameterInfo) -> usize {
        if let Some(&idx) = self.index.get(&info.id) {
            return idx;
        }
        let idx = self.infos.len();
        self.index.insert(info.id.clone(), idx);
        self.values.push(info.default);
        self.infos.push(info);
        idx
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn info(&self, idx: usize) -> Option<&ParameterInfo> {
        self.infos.get(idx)
    }

    pub fn get(&self, id: &str) -> Option<f32> {
        self.index_of(id).map(|idx| self.values[idx])
    }

    pub fn value(&self, idx: usize) -> f32 {
        self.values[idx]
    }

    pub fn set(&mut self, id: &str, value: f32) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                self.set_at(idx, value);
                true
            }
            None => false,
        }
    }

    pub fn set_at(&mut self, idx: usize, value: f32) {
        self.values[idx] = self.infos[idx].clamp(value);
    }

    /// `current + delta * weight`
    pub fn add(&mut self, id: &str, delta: f32, weight: f32) {
        if let Some(idx) = self.index_of(id) {
            let v = self.values[idx] + delta * weight;
            self.set_at(idx, v);
        }
    }

    /// `current * (1 + (factor - 1) * weight)`
    pub fn multiply(&mut self, id: &str, factor: f32, weight: f32) {
        if let Some(idx) = self.index_of(id) {
            let v = self.values[idx] * (1.0 + (factor - 1.0) * weight);
            self.set_at(idx, v);
        }
    }

    /// `current * (1 - weight) + value * weight`
    pub fn blend_to(&mut self, id: &str, value: f32, weight: f32) {
        if let Some(idx) = self.index_of(id) {
            let v = self.values[idx] * (1.0 - weight) + value * weight;
            self.set_at(idx, v);
        }
    }

    pub fn reset_to_defaults(&mut self) {
        for (value, info) in self.values.iter_mut().zip(&self.infos) {
            *value = info.default;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.infos
            .iter()
            .zip(&self.values)
            .map(|(info, v)| (info.id.as_str(), *v))
    }
}
