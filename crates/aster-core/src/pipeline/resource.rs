// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serialized pipeline descriptions and the loader turning them into live
//! pipelines.
//!
//! The descriptor is the asset form of a pipeline: pass records (factory
//! type name + instance name + config) and pin-to-pin edges, bincode-coded
//! into the binary blob the resource manager stores. The
//! [`PassFactoryRegistry`] replaces the reflection lookup a C++ engine
//! would use: type names map to constructor closures.

use log::error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::gal::TextureFormat;
use crate::math::LinearRgba;

use super::error::PipelineError;
use super::pass::RenderPipelinePass;
use super::passes::{BlurPass, DepthPrePass, OpaqueForwardPass, SourcePass, TargetPass, TonemapPass};
use super::render_pipeline::RenderPipeline;

/// One serialized pass instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassRecord {
    /// The factory type name (e.g. `"TonemapPass"`).
    pub type_name: String,
    /// The instance name, unique within the pipeline.
    pub name: String,
    /// Pass-specific configuration values. Stored as a JSON string inside
    /// the binary blob: `serde_json::Value` cannot be decoded from a
    /// non-self-describing format like bincode.
    #[serde(default, with = "config_codec")]
    pub config: BTreeMap<String, serde_json::Value>,
}

mod config_codec {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, serde_json::Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let json = serde_json::to_string(map).map_err(S::Error::custom)?;
        serializer.serialize_str(&json)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, serde_json::Value>, D::Error> {
        let json = String::deserialize(deserializer)?;
        serde_json::from_str(&json).map_err(D::Error::custom)
    }
}

impl PassRecord {
    /// Creates a record without configuration.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            config: BTreeMap::new(),
        }
    }

    /// Reads and deserializes one config value.
    pub fn config_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.config.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                error!(
                    "Pass '{}': config value '{key}' has the wrong shape: {err}",
                    self.name
                );
                None
            }
        }
    }
}

/// One serialized pin-to-pin edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// The producing pass.
    pub from_pass: String,
    /// The producing pin.
    pub from_pin: String,
    /// The consuming pass.
    pub to_pass: String,
    /// The consuming pin.
    pub to_pin: String,
}

/// The serialized form of a render pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPipelineResourceDescriptor {
    /// The pipeline name.
    pub name: String,
    /// The asset id.
    pub id: Uuid,
    /// The passes, in authoring order.
    pub passes: Vec<PassRecord>,
    /// The edges of the pin graph.
    pub connections: Vec<ConnectionRecord>,
}

impl RenderPipelineResourceDescriptor {
    /// Encodes the descriptor into the binary blob format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|err| PipelineError::SerializationFailed(err.to_string()))
    }

    /// Decodes a descriptor from the binary blob format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(descriptor, _)| descriptor)
            .map_err(|err| PipelineError::DeserializationFailed(err.to_string()))
    }
}

/// A constructor turning a [`PassRecord`] into a live pass.
pub type PassConstructorFn =
    Box<dyn Fn(&PassRecord) -> Result<Box<dyn RenderPipelinePass>, PipelineError> + Send + Sync>;

/// Maps pass type names to constructors.
pub struct PassFactoryRegistry {
    constructors: HashMap<String, PassConstructorFn>,
}

impl std::fmt::Debug for PassFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassFactoryRegistry")
            .field("registered", &self.constructors.len())
            .finish()
    }
}

impl PassFactoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Creates a registry with every built-in pass type registered.
    pub fn with_default_passes() -> Self {
        let mut registry = Self::new();
        registry.register("SourcePass", |record| {
            let mut pass = SourcePass::new(&record.name);
            if let Some(format) = record.config_value::<TextureFormat>("format") {
                pass = pass.with_format(format);
            }
            if let Some(clear) = record.config_value::<Option<LinearRgba>>("clear") {
                pass = pass.with_clear(clear);
            }
            Ok(Box::new(pass))
        });
        registry.register("TargetPass", |record| {
            Ok(Box::new(TargetPass::new(&record.name)))
        });
        registry.register("DepthPrePass", |record| {
            let mut pass = DepthPrePass::new(&record.name);
            if let Some(format) = record.config_value::<TextureFormat>("format") {
                pass = pass.with_format(format);
            }
            Ok(Box::new(pass))
        });
        registry.register("OpaqueForwardPass", |record| {
            Ok(Box::new(OpaqueForwardPass::new(&record.name)))
        });
        registry.register("TonemapPass", |record| {
            let mut pass = TonemapPass::new(&record.name);
            if let Some(format) = record.config_value::<TextureFormat>("output_format") {
                pass = pass.with_output_format(format);
            }
            Ok(Box::new(pass))
        });
        registry.register("BlurPass", |record| Ok(Box::new(BlurPass::new(&record.name))));
        registry
    }

    /// Registers a constructor for a pass type name.
    pub fn register(
        &mut self,
        type_name: &str,
        constructor: impl Fn(&PassRecord) -> Result<Box<dyn RenderPipelinePass>, PipelineError>
            + Send
            + Sync
            + 'static,
    ) {
        self.constructors
            .insert(type_name.to_string(), Box::new(constructor));
    }

    /// Constructs a pass from its record.
    pub fn create(&self, record: &PassRecord) -> Result<Box<dyn RenderPipelinePass>, PipelineError> {
        let constructor = self
            .constructors
            .get(&record.type_name)
            .ok_or_else(|| PipelineError::UnknownPassType(record.type_name.clone()))?;
        constructor(record)
    }
}

impl Default for PassFactoryRegistry {
    fn default() -> Self {
        Self::with_default_passes()
    }
}

/// Builds live pipelines from serialized descriptors.
#[derive(Debug)]
pub struct RenderPipelineResourceLoader;

impl RenderPipelineResourceLoader {
    /// Instantiates every pass through the registry and wires the edges.
    /// Fails (with the offending pass/pin named in the error and the log)
    /// on unknown types, unknown pins or double connections.
    pub fn create_render_pipeline(
        descriptor: &RenderPipelineResourceDescriptor,
        registry: &PassFactoryRegistry,
    ) -> Result<RenderPipeline, PipelineError> {
        let mut pipeline = RenderPipeline::new(descriptor.name.clone());
        for record in &descriptor.passes {
            let pass = registry.create(record).inspect_err(|err| {
                error!(
                    "Pipeline '{}': pass '{}' could not be created: {err}",
                    descriptor.name, record.name
                );
            })?;
            pipeline.add_pass(pass);
        }
        for connection in &descriptor.connections {
            pipeline.connect(
                &connection.from_pass,
                &connection.from_pin,
                &connection.to_pass,
                &connection.to_pin,
            )?;
        }
        Ok(pipeline)
    }

    /// Captures a pipeline's structure back into a descriptor. Pass
    /// configuration is not recoverable from live passes and comes back
    /// empty; the pass/edge structure round-trips exactly.
    pub fn describe(pipeline: &RenderPipeline, id: Uuid) -> RenderPipelineResourceDescriptor {
        let passes = pipeline
            .ordered_pass_names()
            .iter()
            .map(|&name| {
                let pass = pipeline
                    .pass_by_name(name)
                    .expect("ordered names come from the pipeline");
                PassRecord::new(pass.type_name(), name)
            })
            .collect();
        let connections = pipeline
            .edges()
            .into_iter()
            .map(|(from_pass, from_pin, to_pass, to_pin)| ConnectionRecord {
                from_pass,
                from_pin,
                to_pass,
                to_pin,
            })
            .collect();
        RenderPipelineResourceDescriptor {
            name: pipeline.name().to_string(),
            id,
            passes,
            connections,
        }
    }

    /// The statically constructed fallback pipeline: a magenta clear
    /// straight into the view's first color target. Wrong output beats no
    /// output when a pipeline asset fails to rebuild or load.
    pub fn create_missing_pipeline() -> RenderPipeline {
        let mut pipeline = RenderPipeline::new("MissingPipeline");
        pipeline.add_pass(Box::new(
            SourcePass::new("MissingColor")
                .with_format(TextureFormat::Rgba8UnormSrgb)
                .with_clear(Some(LinearRgba::MAGENTA)),
        ));
        pipeline.add_pass(Box::new(TargetPass::new("Target")));
        pipeline
            .connect("MissingColor", "Output", "Target", "Color0")
            .expect("the missing pipeline wiring is static and valid");
        pipeline
    }
}
