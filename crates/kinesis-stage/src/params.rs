//! Material parameter storage
//!
//! A parameter set holds the uniforms an effect declared, with storage
//! allocated once at declaration. Updates write into that storage.

use std::collections::HashMap;

use crate::{UniformKind, UniformValue};

/// Storage for one declared parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Scalar(f32),
    Vec2([f32; 2]),
    Buffer(Box<[f32]>),
}

impl Parameter {
    pub fn buffer(len: usize) -> Self {
        Parameter::Buffer(vec![0.0; len].into_boxed_slice())
    }

    /// Owned storage initialized from a uniform value
    pub fn from_value(value: UniformValue<'_>) -> Self {
        match value {
            UniformValue::Scalar(v) => Parameter::Scalar(v),
            UniformValue::Vec2(v) => Parameter::Vec2(v),
            UniformValue::Buffer(b) => Parameter::Buffer(b.into()),
        }
    }

    pub fn kind(&self) -> UniformKind {
        match self {
            Parameter::Scalar(_) => UniformKind::Scalar,
            Parameter::Vec2(_) => UniformKind::Vec2,
            Parameter::Buffer(b) => UniformKind::Buffer(b.len()),
        }
    }

    /// Borrow as a uniform value
    pub fn as_value(&self) -> UniformValue<'_> {
        match self {
            Parameter::Scalar(v) => UniformValue::Scalar(*v),
            Parameter::Vec2(v) => UniformValue::Vec2(*v),
            Parameter::Buffer(b) => UniformValue::Buffer(b),
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Parameter::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            Parameter::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[f32]> {
        match self {
            Parameter::Buffer(b) => Some(b),
            _ => None,
        }
    }
}

/// Named parameters of a material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: HashMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare or redeclare a parameter
    pub fn declare(&mut self, name: impl Into<String>, param: Parameter) {
        self.params.insert(name.into(), param);
    }

    pub fn with(mut self, name: impl Into<String>, param: Parameter) -> Self {
        self.declare(name, param);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.params.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn scalar(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(Parameter::as_scalar)
    }

    pub fn vec2(&self, name: &str) -> Option<[f32; 2]> {
        self.get(name).and_then(Parameter::as_vec2)
    }

    pub fn buffer(&self, name: &str) -> Option<&[f32]> {
        self.get(name).and_then(Parameter::as_buffer)
    }
}

/// Anything that exposes a parameter set to the stage adapter
pub trait Material {
    fn parameters(&self) -> &ParameterSet;
    fn parameters_mut(&mut self) -> &mut ParameterSet;
}

impl Material for ParameterSet {
    fn parameters(&self) -> &ParameterSet {
        self
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        self
    }
}
