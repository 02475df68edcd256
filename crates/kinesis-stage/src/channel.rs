//! Uniform channels and partial updates

use std::borrow::Cow;

use kinesis_signal::JOINT_BUFFER_LEN;

/// The common channel set shared by every effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Pointer,
    PointerVelocity,
    Joints,
    BodySpeed,
    Expand,
    Accent,
    MusicReactivity,
    MotionReactivity,
    Time,
    Delta,
}

impl Channel {
    /// All common channels in bundle order
    pub fn all() -> &'static [Channel] {
        &[
            Channel::Pointer,
            Channel::PointerVelocity,
            Channel::Joints,
            Channel::BodySpeed,
            Channel::Expand,
            Channel::Accent,
            Channel::MusicReactivity,
            Channel::MotionReactivity,
            Channel::Time,
            Channel::Delta,
        ]
    }

    /// Uniform name as declared in shader source
    pub fn name(self) -> &'static str {
        match self {
            Channel::Pointer => "pointer",
            Channel::PointerVelocity => "pointerVelocity",
            Channel::Joints => "joints",
            Channel::BodySpeed => "bodySpeed",
            Channel::Expand => "expand",
            Channel::Accent => "accent",
            Channel::MusicReactivity => "musicReactivity",
            Channel::MotionReactivity => "motionReactivity",
            Channel::Time => "time",
            Channel::Delta => "delta",
        }
    }

    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::all().iter().copied().find(|c| c.name() == name)
    }

    pub fn kind(self) -> UniformKind {
        match self {
            Channel::Pointer | Channel::PointerVelocity => UniformKind::Vec2,
            Channel::Joints => UniformKind::Buffer(JOINT_BUFFER_LEN),
            _ => UniformKind::Scalar,
        }
    }
}

/// Shape of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Scalar,
    Vec2,
    /// Fixed-length float array
    Buffer(usize),
}

impl UniformKind {
    pub fn name(self) -> &'static str {
        match self {
            UniformKind::Scalar => "scalar",
            UniformKind::Vec2 => "vec2",
            UniformKind::Buffer(_) => "buffer",
        }
    }

    /// Same shape, ignoring buffer length
    pub fn same_shape(self, other: UniformKind) -> bool {
        matches!(
            (self, other),
            (UniformKind::Scalar, UniformKind::Scalar)
                | (UniformKind::Vec2, UniformKind::Vec2)
                | (UniformKind::Buffer(_), UniformKind::Buffer(_))
        )
    }
}

/// A uniform value borrowed for one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    Scalar(f32),
    Vec2([f32; 2]),
    Buffer(&'a [f32]),
}

impl UniformValue<'_> {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Buffer(b) => UniformKind::Buffer(b.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            UniformValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

/// A partial set of channel values, applied in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformUpdate<'a> {
    entries: Vec<(Cow<'static, str>, UniformValue<'a>)>,
}

impl<'a> UniformUpdate<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn set(&mut self, name: impl Into<Cow<'static, str>>, value: UniformValue<'a>) -> &mut Self {
        self.entries.push((name.into(), value));
        self
    }

    pub fn set_channel(&mut self, channel: Channel, value: UniformValue<'a>) -> &mut Self {
        self.set(channel.name(), value)
    }

    pub fn scalar(mut self, name: impl Into<Cow<'static, str>>, value: f32) -> Self {
        self.set(name, UniformValue::Scalar(value));
        self
    }

    pub fn vec2(mut self, name: impl Into<Cow<'static, str>>, value: [f32; 2]) -> Self {
        self.set(name, UniformValue::Vec2(value));
        self
    }

    pub fn buffer(mut self, name: impl Into<Cow<'static, str>>, value: &'a [f32]) -> Self {
        self.set(name, UniformValue::Buffer(value));
        self
    }

    /// Last value set for a name
    pub fn get(&self, name: &str) -> Option<&UniformValue<'a>> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue<'a>)> {
        self.entries.iter().map(|(n, v)| (n.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
