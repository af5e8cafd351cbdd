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

//! Error types of the graphics abstraction layer.

use std::fmt;

use super::format::TextureFormat;

/// An error originating from a concrete backend implementation.
#[derive(Debug)]
pub enum BackendError {
    /// A native API call failed.
    NativeCallFailed {
        /// The operation that failed, e.g. `"vkCreateImage"`.
        operation: String,
        /// Backend-provided detail.
        details: String,
    },
    /// The backend ran out of (device or host) memory.
    OutOfMemory,
    /// The feature is not supported by this backend or adapter.
    Unsupported(String),
    /// The device was lost and has to be reinitialized.
    DeviceLost,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NativeCallFailed { operation, details } => {
                write!(f, "Native call '{operation}' failed: {details}")
            }
            BackendError::OutOfMemory => write!(f, "Backend reported out-of-memory."),
            BackendError::Unsupported(what) => {
                write!(f, "Not supported by this backend: {what}")
            }
            BackendError::DeviceLost => write!(f, "The graphics device was lost."),
        }
    }
}

impl std::error::Error for BackendError {}

/// An error raised by the common device layer.
#[derive(Debug)]
pub enum GalError {
    /// A creation descriptor failed validation before reaching the backend.
    InvalidDescriptor {
        /// The resource kind being created.
        resource: &'static str,
        /// What was wrong with the descriptor.
        reason: String,
    },
    /// The requested format cannot be used the requested way.
    UnsupportedFormat {
        /// The rejected format.
        format: TextureFormat,
        /// The attempted usage.
        usage: &'static str,
    },
    /// A handle did not resolve (stale generation or never valid).
    InvalidHandle {
        /// The resource kind the handle should have pointed at.
        resource: &'static str,
    },
    /// A resource still has live views and cannot be destroyed.
    LiveViews {
        /// The resource kind being destroyed.
        resource: &'static str,
        /// The number of views still alive.
        view_count: u32,
    },
    /// No backend with the given name is registered in the device factory.
    UnknownBackend(String),
    /// The backend rejected the operation.
    Backend(BackendError),
}

impl fmt::Display for GalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalError::InvalidDescriptor { resource, reason } => {
                write!(f, "Invalid {resource} descriptor: {reason}")
            }
            GalError::UnsupportedFormat { format, usage } => {
                write!(f, "Format {format:?} is not supported as {usage}.")
            }
            GalError::InvalidHandle { resource } => {
                write!(f, "Invalid or stale {resource} handle.")
            }
            GalError::LiveViews {
                resource,
                view_count,
            } => {
                write!(
                    f,
                    "Cannot destroy {resource}: {view_count} view(s) still alive."
                )
            }
            GalError::UnknownBackend(name) => {
                write!(f, "No graphics backend named '{name}' is registered.")
            }
            GalError::Backend(err) => write!(f, "Backend error: {err}"),
        }
    }
}

impl std::error::Error for GalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GalError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for GalError {
    fn from(err: BackendError) -> Self {
        GalError::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn backend_error_is_wrapped_as_source() {
        let err: GalError = BackendError::OutOfMemory.into();
        assert_eq!(format!("{err}"), "Backend error: Backend reported out-of-memory.");
        assert!(err.source().is_some());
    }

    #[test]
    fn display_messages() {
        let err = GalError::UnsupportedFormat {
            format: TextureFormat::Rgba32Float,
            usage: "a render target",
        };
        assert_eq!(
            format!("{err}"),
            "Format Rgba32Float is not supported as a render target."
        );
    }
}
