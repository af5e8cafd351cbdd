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

//! Typed pins and the per-pass pin registry.
//!
//! A pass declares its pins once at construction; the registry maps pin
//! names (as they appear in serialized pipeline descriptions) to pin
//! metadata and assigns the input/output array indices the pipeline's
//! connection tables are keyed by.

use std::collections::HashMap;

/// The direction/behavior of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Consumes a texture produced by another pass.
    Input,
    /// Produces a texture.
    Output,
    /// Consumes a texture and forwards it as an output; the pass reads and
    /// writes the same logical target.
    PassThrough,
}

/// A single declared pin.
#[derive(Debug, Clone)]
pub struct Pin {
    /// The pin's registered name.
    pub name: String,
    /// What the pin does.
    pub kind: PinKind,
    /// Index into the pass's input connection array (`Input` and
    /// `PassThrough` pins).
    pub input_index: Option<u8>,
    /// Index into the pass's output connection array (`Output` and
    /// `PassThrough` pins).
    pub output_index: Option<u8>,
}

/// The pin registry of one pass.
#[derive(Debug, Clone, Default)]
pub struct NodePins {
    pins: Vec<Pin>,
    by_name: HashMap<String, usize>,
    input_count: u8,
    output_count: u8,
}

impl NodePins {
    /// Starts declaring pins.
    pub fn builder() -> NodePinsBuilder {
        NodePinsBuilder {
            pins: NodePins::default(),
        }
    }

    /// Looks a pin up by its registered name.
    pub fn pin_by_name(&self, name: &str) -> Option<&Pin> {
        self.by_name.get(name).map(|&index| &self.pins[index])
    }

    /// Looks a pin up by its input array index.
    pub fn pin_by_input_index(&self, input_index: u8) -> Option<&Pin> {
        self.pins.iter().find(|p| p.input_index == Some(input_index))
    }

    /// Looks a pin up by its output array index.
    pub fn pin_by_output_index(&self, output_index: u8) -> Option<&Pin> {
        self.pins
            .iter()
            .find(|p| p.output_index == Some(output_index))
    }

    /// All declared pins in declaration order.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Pins that consume an input (`Input` and `PassThrough`).
    pub fn inputs(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.input_index.is_some())
    }

    /// Pins that produce an output (`Output` and `PassThrough`).
    pub fn outputs(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.output_index.is_some())
    }

    /// The size of the pass's input connection array.
    pub fn input_count(&self) -> usize {
        self.input_count as usize
    }

    /// The size of the pass's output connection array.
    pub fn output_count(&self) -> usize {
        self.output_count as usize
    }
}

/// Builder returned by [`NodePins::builder`].
#[derive(Debug)]
pub struct NodePinsBuilder {
    pins: NodePins,
}

impl NodePinsBuilder {
    /// Declares an input pin. Panics on duplicate names: pin sets are
    /// fixed at pass-construction time, so a clash is a programming error.
    pub fn input(mut self, name: &str) -> Self {
        let input_index = self.pins.input_count;
        self.pins.input_count += 1;
        self.register(Pin {
            name: name.to_string(),
            kind: PinKind::Input,
            input_index: Some(input_index),
            output_index: None,
        });
        self
    }

    /// Declares an output pin. Panics on duplicate names.
    pub fn output(mut self, name: &str) -> Self {
        let output_index = self.pins.output_count;
        self.pins.output_count += 1;
        self.register(Pin {
            name: name.to_string(),
            kind: PinKind::Output,
            input_index: None,
            output_index: Some(output_index),
        });
        self
    }

    /// Declares a pass-through pin, occupying one input and one output
    /// slot. Panics on duplicate names.
    pub fn pass_through(mut self, name: &str) -> Self {
        let input_index = self.pins.input_count;
        let output_index = self.pins.output_count;
        self.pins.input_count += 1;
        self.pins.output_count += 1;
        self.register(Pin {
            name: name.to_string(),
            kind: PinKind::PassThrough,
            input_index: Some(input_index),
            output_index: Some(output_index),
        });
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> NodePins {
        self.pins
    }

    fn register(&mut self, pin: Pin) {
        let index = self.pins.pins.len();
        let previous = self.pins.by_name.insert(pin.name.clone(), index);
        assert!(
            previous.is_none(),
            "pin '{}' declared twice on the same pass",
            pin.name
        );
        self.pins.pins.push(pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_assigned_per_direction() {
        let pins = NodePins::builder()
            .input("DepthStencil")
            .pass_through("Color")
            .output("Bloom")
            .build();

        assert_eq!(pins.input_count(), 2);
        assert_eq!(pins.output_count(), 2);

        let depth = pins.pin_by_name("DepthStencil").unwrap();
        assert_eq!(depth.kind, PinKind::Input);
        assert_eq!(depth.input_index, Some(0));
        assert_eq!(depth.output_index, None);

        let color = pins.pin_by_name("Color").unwrap();
        assert_eq!(color.kind, PinKind::PassThrough);
        assert_eq!(color.input_index, Some(1));
        assert_eq!(color.output_index, Some(0));

        let bloom = pins.pin_by_name("Bloom").unwrap();
        assert_eq!(bloom.output_index, Some(1));

        assert!(pins.pin_by_name("Missing").is_none());
        assert_eq!(pins.pin_by_input_index(1).unwrap().name, "Color");
        assert_eq!(pins.pin_by_output_index(1).unwrap().name, "Bloom");
    }

    #[test]
    #[should_panic(expected = "declared twice")]
    fn duplicate_pin_names_panic() {
        let _ = NodePins::builder().input("Color").output("Color");
    }
}
