//! Schema normalization for JSON motion recordings.
//!
//! Recordings arrive as a top-level object holding one record list. The key
//! of that list identifies the schema variant; each variant decodes its own
//! record shape and maps it onto [`MotionSample`].

use crate::ingest::types::{MotionSample, Vec3};
use crate::ingest::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Recognized recording layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSchema {
    /// Headset plus tracked controllers
    HeadControllers,
    /// Headset plus optical hand tracking
    HeadHands,
}

impl MotionSchema {
    /// Variants in detection priority order.
    pub const ALL: [MotionSchema; 2] = [MotionSchema::HeadControllers, MotionSchema::HeadHands];

    /// Top-level key holding this variant's record list.
    pub fn record_key(&self) -> &'static str {
        match self {
            MotionSchema::HeadControllers => "headControllersMotionRecordList",
            MotionSchema::HeadHands => "headHandsMotionRecordList",
        }
    }

    /// Find the first variant whose record list is present in the document.
    pub fn detect(document: &Value) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|schema| document.get(schema.record_key()).is_some())
    }

    /// Decode this variant's record list into canonical samples.
    ///
    /// Records without a timestamp cannot be placed on the time axis and are
    /// skipped; the number skipped is returned alongside the samples.
    fn decode(&self, records: &Value) -> Result<(Vec<MotionSample>, usize), IngestError> {
        let decoded: Vec<Option<MotionSample>> = match self {
            MotionSchema::HeadControllers => {
                Vec::<ControllerRecord>::deserialize(records)?
                    .into_iter()
                    .map(ControllerRecord::into_sample)
                    .collect()
            }
            MotionSchema::HeadHands => Vec::<HandRecord>::deserialize(records)?
                .into_iter()
                .map(HandRecord::into_sample)
                .collect(),
        };

        let total = decoded.len();
        let samples: Vec<MotionSample> = decoded.into_iter().flatten().collect();
        let skipped = total - samples.len();
        Ok((samples, skipped))
    }
}

/// A vector object whose components may individually be missing or null.
#[derive(Debug, Default, Deserialize)]
struct RawVec3 {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
}

impl RawVec3 {
    fn complete(&self) -> Option<Vec3> {
        Some(Vec3::new(self.x?, self.y?, self.z?))
    }
}

fn vec3(raw: Option<RawVec3>) -> Option<Vec3> {
    raw.as_ref().and_then(RawVec3::complete)
}

/// Decodes the vectors of one record. Whole vectors need all three axes;
/// the present axes of an incomplete one are kept as column values.
#[derive(Default)]
struct VectorReader {
    partial: Vec<(Column, f64)>,
}

impl VectorReader {
    fn read(&mut self, channel: Channel, raw: Option<RawVec3>) -> Option<Vec3> {
        let raw = raw?;
        let complete = raw.complete();
        if complete.is_none() {
            let axes = [(Axis::X, raw.x), (Axis::Y, raw.y), (Axis::Z, raw.z)];
            self.partial.extend(
                axes.into_iter()
                    .filter_map(|(axis, value)| Some((Column::new(channel, axis), value?))),
            );
        }
        complete
    }
}

/// Session ids are usually strings, but numeric ids occur in older exports.
fn session_label(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Record layout of the controller-based variant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControllerRecord {
    id: Option<Value>,
    time_stamp: Option<f64>,
    head_position: Option<RawVec3>,
    head_rotation: Option<RawVec3>,
    #[serde(alias = "leftControllerPosition")]
    left_hand_position: Option<RawVec3>,
    #[serde(alias = "leftControllerRotation")]
    left_hand_rotation: Option<RawVec3>,
    #[serde(alias = "rightControllerPosition")]
    right_hand_position: Option<RawVec3>,
    #[serde(alias = "rightControllerRotation")]
    right_hand_rotation: Option<RawVec3>,
    left_wrist_position: Option<RawVec3>,
    right_wrist_position: Option<RawVec3>,
    linear_velocity: Option<RawVec3>,
    angular_velocity: Option<RawVec3>,
}

impl ControllerRecord {
    fn into_sample(self) -> Option<MotionSample> {
        let timestamp = self.time_stamp?;
        let mut vectors = VectorReader::default();
        Some(MotionSample {
            timestamp,
            session_id: session_label(self.id),
            head_position: vectors.read(Channel::HeadPosition, self.head_position),
            head_rotation: vectors.read(Channel::HeadRotation, self.head_rotation),
            left_hand_position: vectors.read(Channel::LeftHandPosition, self.left_hand_position),
            left_hand_rotation: vectors.read(Channel::LeftHandRotation, self.left_hand_rotation),
            right_hand_position: vectors.read(Channel::RightHandPosition, self.right_hand_position),
            right_hand_rotation: vectors.read(Channel::RightHandRotation, self.right_hand_rotation),
            left_wrist_position: vec3(self.left_wrist_position),
            right_wrist_position: vec3(self.right_wrist_position),
            linear_velocity: vectors.read(Channel::LinearVelocity, self.linear_velocity),
            angular_velocity: vectors.read(Channel::AngularVelocity, self.angular_velocity),
            partial: vectors.partial,
        })
    }
}

/// Record layout of the hand-tracking variant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandRecord {
    id: Option<Value>,
    time_stamp: Option<f64>,
    head_position: Option<RawVec3>,
    head_rotation: Option<RawVec3>,
    left_hand_position: Option<RawVec3>,
    left_hand_rotation: Option<RawVec3>,
    right_hand_position: Option<RawVec3>,
    right_hand_rotation: Option<RawVec3>,
    left_wrist_position: Option<RawVec3>,
    right_wrist_position: Option<RawVec3>,
    linear_velocity: Option<RawVec3>,
    angular_velocity: Option<RawVec3>,
}

impl HandRecord {
    fn into_sample(self) -> Option<MotionSample> {
        let timestamp = self.time_stamp?;
        let mut vectors = VectorReader::default();
        Some(MotionSample {
            timestamp,
            session_id: session_label(self.id),
            head_position: vectors.read(Channel::HeadPosition, self.head_position),
            head_rotation: vectors.read(Channel::HeadRotation, self.head_rotation),
            left_hand_position: vectors.read(Channel::LeftHandPosition, self.left_hand_position),
            left_hand_rotation: vectors.read(Channel::LeftHandRotation, self.left_hand_rotation),
            right_hand_position: vectors.read(Channel::RightHandPosition, self.right_hand_position),
            right_hand_rotation: vectors.read(Channel::RightHandRotation, self.right_hand_rotation),
            left_wrist_position: vec3(self.left_wrist_position),
            right_wrist_position: vec3(self.right_wrist_position),
            linear_velocity: vectors.read(Channel::LinearVelocity, self.linear_velocity),
            angular_velocity: vectors.read(Channel::AngularVelocity, self.angular_velocity),
            partial: vectors.partial,
        })
    }
}

/// A normalized recording: samples sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct MotionTable {
    schema: Option<MotionSchema>,
    session_id: Option<String>,
    samples: Vec<MotionSample>,
}

impl MotionTable {
    /// Build a table from already-decoded samples.
    ///
    /// Samples with a non-finite timestamp are dropped, the rest are sorted.
    /// The session id is taken from the earliest sample.
    pub fn from_samples(samples: Vec<MotionSample>) -> Self {
        let before = samples.len();
        let mut samples: Vec<MotionSample> = samples
            .into_iter()
            .filter(|s| s.timestamp.is_finite())
            .collect();
        if samples.len() < before {
            tracing::warn!(
                dropped = before - samples.len(),
                "Dropped samples with non-finite timestamps"
            );
        }

        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        let session_id = samples.first().and_then(|s| s.session_id.clone());

        Self {
            schema: None,
            session_id,
            samples,
        }
    }

    /// Parse a JSON recording.
    pub fn from_json_str(input: &str) -> Result<Self, IngestError> {
        let document: Value = serde_json::from_str(input)?;
        Self::from_json_value(&document)
    }

    /// Normalize an already-parsed JSON recording.
    pub fn from_json_value(document: &Value) -> Result<Self, IngestError> {
        let schema =
            MotionSchema::detect(document).ok_or_else(|| IngestError::SchemaNotRecognized {
                expected: MotionSchema::ALL.iter().map(|s| s.record_key()).collect(),
            })?;

        let (samples, skipped) = schema.decode(&document[schema.record_key()])?;
        if skipped > 0 {
            tracing::warn!(skipped, ?schema, "Skipped records without a timestamp");
        }

        let mut table = Self::from_samples(samples);
        table.schema = Some(schema);
        tracing::debug!(
            ?schema,
            samples = table.len(),
            session = table.session_id().unwrap_or("<none>"),
            "Normalized motion recording"
        );
        Ok(table)
    }

    /// Schema variant this table was decoded from, if it came from JSON.
    pub fn schema(&self) -> Option<MotionSchema> {
        self.schema
    }

    /// Ground-truth label of the recording.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// All samples in timestamp order.
    pub fn samples(&self) -> &[MotionSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last timestamp.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.timestamp, self.samples.last()?.timestamp))
    }

    /// Samples whose timestamp lies in `[start, end)`.
    pub fn range(&self, start: f64, end: f64) -> &[MotionSample] {
        let lo = self.samples.partition_point(|s| s.timestamp < start);
        let hi = self.samples.partition_point(|s| s.timestamp < end);
        &self.samples[lo..hi.max(lo)]
    }
}

/// A tracked body channel carrying three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    HeadPosition,
    HeadRotation,
    LeftHandPosition,
    LeftHandRotation,
    RightHandPosition,
    RightHandRotation,
    LinearVelocity,
    AngularVelocity,
}

impl Channel {
    const ALL: [Channel; 8] = [
        Channel::HeadPosition,
        Channel::HeadRotation,
        Channel::LeftHandPosition,
        Channel::LeftHandRotation,
        Channel::RightHandPosition,
        Channel::RightHandRotation,
        Channel::LinearVelocity,
        Channel::AngularVelocity,
    ];

    fn name(&self) -> &'static str {
        match self {
            Channel::HeadPosition => "headPosition",
            Channel::HeadRotation => "headRotation",
            Channel::LeftHandPosition => "leftHandPosition",
            Channel::LeftHandRotation => "leftHandRotation",
            Channel::RightHandPosition => "rightHandPosition",
            Channel::RightHandRotation => "rightHandRotation",
            Channel::LinearVelocity => "linearVelocity",
            Channel::AngularVelocity => "angularVelocity",
        }
    }

    fn read(&self, sample: &MotionSample) -> Option<Vec3> {
        match self {
            Channel::HeadPosition => sample.head_position,
            Channel::HeadRotation => sample.head_rotation,
            Channel::LeftHandPosition => sample.left_hand_position,
            Channel::LeftHandRotation => sample.left_hand_rotation,
            Channel::RightHandPosition => sample.right_hand_position,
            Channel::RightHandRotation => sample.right_hand_rotation,
            Channel::LinearVelocity => sample.linear_velocity,
            Channel::AngularVelocity => sample.angular_velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// One scalar column of the canonical table, e.g. `headPosition.x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column {
    pub channel: Channel,
    pub axis: Axis,
}

impl Column {
    pub const fn new(channel: Channel, axis: Axis) -> Self {
        Self { channel, axis }
    }

    /// Head position and rotation, the columns gesture models are trained on.
    pub const HEAD_POSE: [Column; 6] = [
        Column::new(Channel::HeadPosition, Axis::X),
        Column::new(Channel::HeadPosition, Axis::Y),
        Column::new(Channel::HeadPosition, Axis::Z),
        Column::new(Channel::HeadRotation, Axis::X),
        Column::new(Channel::HeadRotation, Axis::Y),
        Column::new(Channel::HeadRotation, Axis::Z),
    ];

    /// Value of this column in a sample, or `None` when it was not reported.
    pub fn value(&self, sample: &MotionSample) -> Option<f64> {
        let Some(v) = self.channel.read(sample) else {
            return sample
                .partial
                .iter()
                .find(|(column, _)| column == self)
                .map(|&(_, value)| value);
        };
        Some(match self.axis {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.channel.name(), self.axis.name())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (channel, axis) = s
            .split_once('.')
            .ok_or_else(|| format!("column '{s}' must look like 'headPosition.x'"))?;
        let channel = Channel::ALL
            .into_iter()
            .find(|c| c.name() == channel)
            .ok_or_else(|| format!("unknown channel '{channel}'"))?;
        let axis = match axis {
            "x" => Axis::X,
            "y" => Axis::Y,
            "z" => Axis::Z,
            other => return Err(format!("unknown axis '{other}'")),
        };
        Ok(Column::new(channel, axis))
    }
}

impl TryFrom<String> for Column {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Column> for String {
    fn from(column: Column) -> Self {
        column.to_string()
    }
}
