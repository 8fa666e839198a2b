//! Program definition: the immutable, mission-scoped payload shared by
//! every stack machine.
//!
//! A definition is produced once by the mission loader. The VM only reads
//! it; nothing here changes while a mission runs.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

/// A named entry of the entity table.
///
/// `label` is the name scripts were compiled against; `object` is the
/// world object the host binds it to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub label: String,
    pub object: String,
}

impl EntityRef {
    pub fn new(label: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            object: object.into(),
        }
    }
}

/// An ordered sequence of 3-D waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsmPath {
    pub name: String,
    pub nodes: Vec<Vec3>,
}

impl FsmPath {
    pub fn new(name: impl Into<String>, nodes: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// First waypoint, if the path has any.
    pub fn start(&self) -> Option<Vec3> {
        self.nodes.first().copied()
    }
}

/// Declaration of one program instance: where it starts and the data it
/// carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDecl {
    /// Absolute bytecode address of the first instruction.
    pub start_address: usize,
    /// Read-only constants, addressed by `ARGPUSH_B` from the end.
    #[serde(default)]
    pub constants: Vec<i32>,
    /// Arguments recorded by the compiler for this instance.
    #[serde(default)]
    pub initial_arguments: Vec<i32>,
}

impl MachineDecl {
    pub fn new(start_address: usize) -> Self {
        Self {
            start_address,
            ..Self::default()
        }
    }

    pub fn with_constants(mut self, constants: Vec<i32>) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_initial_arguments(mut self, arguments: Vec<i32>) -> Self {
        self.initial_arguments = arguments;
        self
    }
}

/// The compiled mission script: bytecode plus every lookup table it
/// references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramDefinition {
    /// Native action names, indexed by the `ACTION` operand.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Entities referenced by native actions.
    #[serde(default)]
    pub entities: Vec<EntityRef>,
    /// Waypoint paths referenced by native actions.
    #[serde(default)]
    pub paths: Vec<FsmPath>,
    /// Sound clip names referenced by native actions.
    #[serde(default)]
    pub sound_clips: Vec<String>,
    /// The flat instruction array shared by all machines.
    pub bytecode: Vec<Instruction>,
    /// One entry per stack machine, in scheduling order.
    pub machines: Vec<MachineDecl>,
}

impl ProgramDefinition {
    /// Create a definition with bytecode and machine declarations only.
    pub fn new(bytecode: Vec<Instruction>, machines: Vec<MachineDecl>) -> Self {
        Self {
            bytecode,
            machines,
            ..Self::default()
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_entities(mut self, entities: Vec<EntityRef>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_paths(mut self, paths: Vec<FsmPath>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_sound_clips(mut self, clips: Vec<String>) -> Self {
        self.sound_clips = clips;
        self
    }

    pub fn instruction(&self, address: usize) -> Option<&Instruction> {
        self.bytecode.get(address)
    }

    pub fn action(&self, index: usize) -> Option<&str> {
        self.actions.get(index).map(String::as_str)
    }

    pub fn entity(&self, index: usize) -> Option<&EntityRef> {
        self.entities.get(index)
    }

    pub fn path(&self, index: usize) -> Option<&FsmPath> {
        self.paths.get(index)
    }

    pub fn sound_clip(&self, index: usize) -> Option<&str> {
        self.sound_clips.get(index).map(String::as_str)
    }

    /// Number of instructions in the bytecode.
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    /// Returns true if the bytecode is empty.
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    fn sample() -> ProgramDefinition {
        ProgramDefinition::new(
            vec![
                Instruction::new(Opcode::Action, 0),
                Instruction::new(Opcode::Rst, 0),
            ],
            vec![MachineDecl::new(0).with_constants(vec![7, 8])],
        )
        .with_actions(["true", "startTimer"])
        .with_entities(vec![EntityRef::new("player", "vppirna1")])
        .with_paths(vec![FsmPath::new(
            "road",
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)],
        )])
        .with_sound_clips(vec!["radio1.wav".to_string()])
    }

    #[test]
    fn table_lookups() {
        let def = sample();
        assert_eq!(def.action(1), Some("startTimer"));
        assert_eq!(def.action(2), None);
        assert_eq!(def.entity(0).map(|e| e.object.as_str()), Some("vppirna1"));
        assert_eq!(def.path(0).and_then(FsmPath::start), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(def.sound_clip(0), Some("radio1.wav"));
        assert_eq!(def.instruction(1), Some(&Instruction::new(Opcode::Rst, 0)));
        assert_eq!(def.instruction(2), None);
    }

    #[test]
    fn len_and_is_empty() {
        assert_eq!(sample().len(), 2);
        assert!(!sample().is_empty());
        assert!(ProgramDefinition::default().is_empty());
    }

    #[test]
    fn empty_path_has_no_start() {
        assert_eq!(FsmPath::new("none", vec![]).start(), None);
    }

    #[test]
    fn definition_deserializes_from_toml() {
        let text = r#"
            actions = ["null", "true"]
            bytecode = [{ code = 13, operand = 1 }, { code = 12, operand = 0 }]

            [[entities]]
            label = "leader"
            object = "car01"

            [[paths]]
            name = "loop"
            nodes = [[0.0, 0.0, 0.0], [10.0, 0.0, 5.0]]

            [[machines]]
            start_address = 0
            constants = [1, 2, 3]
        "#;
        let def: ProgramDefinition = toml::from_str(text).unwrap();
        assert_eq!(def.actions, vec!["null", "true"]);
        assert_eq!(def.bytecode[0].opcode(), Ok(Opcode::Action));
        assert_eq!(def.entities[0].label, "leader");
        assert_eq!(def.paths[0].nodes[1], Vec3::new(10.0, 0.0, 5.0));
        assert_eq!(def.machines[0].constants, vec![1, 2, 3]);
        assert!(def.machines[0].initial_arguments.is_empty());
        assert!(def.sound_clips.is_empty());
    }
}
