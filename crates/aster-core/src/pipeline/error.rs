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

//! Errors of pipeline wiring, rebuilds and resource loading.

use std::fmt;

use crate::gal::GalError;

/// An error raised while wiring, rebuilding or loading a render pipeline.
///
/// All of these are configuration errors: they abort the current
/// rebuild/load, get logged, and leave the caller free to fall back to the
/// missing-pipeline placeholder.
#[derive(Debug)]
pub enum PipelineError {
    /// No pass with the given name exists in the pipeline.
    UnknownPass(String),
    /// The pass has no pin with the given name.
    UnknownPin {
        /// The pass that was searched.
        pass: String,
        /// The pin name that did not resolve.
        pin: String,
    },
    /// The pin cannot act as a connection source.
    NotAnOutputPin {
        /// The source pass.
        pass: String,
        /// The offending pin.
        pin: String,
    },
    /// The pin cannot act as a connection target.
    NotAnInputPin {
        /// The target pass.
        pass: String,
        /// The offending pin.
        pin: String,
    },
    /// The input pin is already fed by another connection.
    InputAlreadyConnected {
        /// The target pass.
        pass: String,
        /// The already-connected pin.
        pin: String,
    },
    /// The requested connection does not exist.
    NotConnected {
        /// The pass.
        pass: String,
        /// The pin.
        pin: String,
    },
    /// The pass graph contains a cycle.
    CycleDetected {
        /// Names of the passes that could not be ordered.
        passes: Vec<String>,
    },
    /// A required input pin has no incoming connection.
    MissingInput {
        /// The pass whose input is unconnected.
        pass: String,
        /// The unconnected pin.
        pin: String,
    },
    /// A pass left a connected output pin without a description.
    MissingOutputDescription {
        /// The pass that failed to describe its output.
        pass: String,
        /// The undescribed pin.
        pin: String,
    },
    /// A pass-through pin's output description differs from its input's.
    PassThroughMismatch {
        /// The pass with the inconsistent pin.
        pass: String,
        /// The pass-through pin.
        pin: String,
    },
    /// More than one pass-through pin consumes the same connection, which
    /// would give two passes write access to one physical target.
    ConflictingPassThroughConsumers {
        /// Names of the conflicting passes.
        passes: Vec<String>,
    },
    /// Allocating a transient render target failed.
    TargetAllocation(GalError),
    /// The serialized pipeline names a pass type no factory knows.
    UnknownPassType(String),
    /// The serialized pipeline blob could not be decoded.
    DeserializationFailed(String),
    /// The pipeline descriptor could not be encoded.
    SerializationFailed(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::UnknownPass(name) => {
                write!(f, "No pass named '{name}' exists in the pipeline.")
            }
            PipelineError::UnknownPin { pass, pin } => {
                write!(f, "Pass '{pass}' has no pin named '{pin}'.")
            }
            PipelineError::NotAnOutputPin { pass, pin } => {
                write!(f, "Pin '{pin}' of pass '{pass}' is not an output pin.")
            }
            PipelineError::NotAnInputPin { pass, pin } => {
                write!(f, "Pin '{pin}' of pass '{pass}' is not an input pin.")
            }
            PipelineError::InputAlreadyConnected { pass, pin } => {
                write!(f, "Input pin '{pin}' of pass '{pass}' is already connected.")
            }
            PipelineError::NotConnected { pass, pin } => {
                write!(f, "Pin '{pin}' of pass '{pass}' is not connected.")
            }
            PipelineError::CycleDetected { passes } => {
                write!(f, "The pass graph contains a cycle involving: {passes:?}.")
            }
            PipelineError::MissingInput { pass, pin } => {
                write!(
                    f,
                    "Pass '{pass}' requires input pin '{pin}' to be connected."
                )
            }
            PipelineError::MissingOutputDescription { pass, pin } => {
                write!(
                    f,
                    "Pass '{pass}' did not produce a description for connected output pin '{pin}'."
                )
            }
            PipelineError::PassThroughMismatch { pass, pin } => {
                write!(
                    f,
                    "Pass-through pin '{pin}' of pass '{pass}' has different input and output descriptions."
                )
            }
            PipelineError::ConflictingPassThroughConsumers { passes } => {
                write!(
                    f,
                    "Multiple pass-through consumers contend for one target: {passes:?}."
                )
            }
            PipelineError::TargetAllocation(err) => {
                write!(f, "Transient render target allocation failed: {err}")
            }
            PipelineError::UnknownPassType(type_name) => {
                write!(f, "No pass factory is registered for type '{type_name}'.")
            }
            PipelineError::DeserializationFailed(details) => {
                write!(f, "Pipeline descriptor deserialization failed: {details}")
            }
            PipelineError::SerializationFailed(details) => {
                write!(f, "Pipeline descriptor serialization failed: {details}")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::TargetAllocation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GalError> for PipelineError {
    fn from(err: GalError) -> Self {
        PipelineError::TargetAllocation(err)
    }
}
