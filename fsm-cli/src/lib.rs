//! Mission manifests for the `fsm` command-line tool.
//!
//! A manifest is a TOML file naming a listing (or carrying it inline), the
//! lookup tables the compiler would have produced, the machine declarations
//! and, optionally, a headless world to run the mission in:
//!
//! ```toml
//! source = "convoy.fsm"
//! entities = [{ label = "leader", object = "car_leader" }]
//! sound_clips = ["horn"]
//!
//! [[paths]]
//! name = "road"
//! nodes = [[0.0, 0.0, 10.0], [0.0, 0.0, 40.0]]
//!
//! [[machines]]
//! start = "leader"
//! constants = [0, 0, 20]
//!
//! [world]
//! key_press_ticks = [30]
//!
//! [[world.objects]]
//! name = "car_leader"
//! position = [0.0, 0.0, 0.0]
//! vehicle = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fsm_assembler::Assembly;
use fsm_common::{EntityRef, FsmPath, MachineDecl, ProgramDefinition};
use fsm_vm::headless::SimWorld;
use glam::Vec3;
use serde::Deserialize;
use tracing::debug;

/// Where a machine starts: a label in the listing or an absolute address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Start {
    Address(usize),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineEntry {
    pub start: Start,
    #[serde(default)]
    pub constants: Vec<i32>,
    #[serde(default)]
    pub arguments: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Vehicles can be driven along paths; other objects are props.
    #[serde(default)]
    pub vehicle: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldSection {
    pub origin: Vec3,
    pub objects: Vec<ObjectEntry>,
    /// Ticks on which the key reads as pressed.
    pub key_press_ticks: Vec<u64>,
}

/// A mission manifest as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Listing file, relative to the manifest.
    pub source: Option<PathBuf>,
    /// Inline listing, used when `source` is absent.
    pub code: Option<String>,
    pub entities: Vec<EntityRef>,
    pub paths: Vec<FsmPath>,
    pub sound_clips: Vec<String>,
    pub machines: Vec<MachineEntry>,
    pub world: WorldSection,
}

impl Manifest {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid mission manifest")
    }
}

/// A loaded mission: the program and the world it runs in.
#[derive(Debug, Clone)]
pub struct Mission {
    pub definition: ProgramDefinition,
    pub assembly: Assembly,
    pub world: WorldSection,
}

impl Mission {
    /// Read a manifest and the listing it names.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let manifest = Manifest::from_toml_str(&text)
            .with_context(|| format!("in '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(manifest, base)
    }

    /// Build a mission from a parsed manifest. `base` resolves `source`.
    pub fn from_manifest(manifest: Manifest, base: &Path) -> Result<Self> {
        let listing = match (&manifest.source, &manifest.code) {
            (Some(source), None) => {
                let path = base.join(source);
                fs::read_to_string(&path)
                    .with_context(|| format!("cannot read '{}'", path.display()))?
            }
            (None, Some(code)) => code.clone(),
            (Some(_), Some(_)) => bail!("manifest sets both 'source' and 'code'"),
            (None, None) => bail!("manifest needs either 'source' or 'code'"),
        };

        let assembly = fsm_assembler::assemble(&listing)?;
        let machines = manifest
            .machines
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let start = match &entry.start {
                    Start::Address(address) => *address,
                    Start::Label(label) => assembly
                        .label(label)
                        .with_context(|| format!("machine {i}: unknown label '{label}'"))?,
                };
                Ok(MachineDecl::new(start)
                    .with_constants(entry.constants.clone())
                    .with_initial_arguments(entry.arguments.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let definition = ProgramDefinition::new(assembly.bytecode.clone(), machines)
            .with_actions(assembly.actions.iter().cloned())
            .with_entities(manifest.entities)
            .with_paths(manifest.paths)
            .with_sound_clips(manifest.sound_clips);
        debug!(
            instructions = definition.len(),
            machines = definition.machines.len(),
            actions = definition.actions.len(),
            "mission loaded"
        );

        Ok(Self {
            definition,
            assembly,
            world: manifest.world,
        })
    }

    /// A fresh headless world populated from the `[world]` section.
    pub fn build_world(&self) -> SimWorld {
        let mut world = SimWorld::new().with_origin(self.world.origin);
        for object in &self.world.objects {
            if object.vehicle {
                world.spawn_vehicle(object.name.clone(), object.position);
            } else {
                world.spawn(object.name.clone(), object.position);
            }
        }
        world
    }

    /// True if the key should read as pressed during `tick`.
    pub fn key_pressed_on(&self, tick: u64) -> bool {
        self.world.key_press_ticks.contains(&tick)
    }
}
