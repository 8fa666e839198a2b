//! The standard native action vocabulary.
//!
//! [`StandardActions`] implements every action mission scripts are compiled
//! against on top of a small [`World`] trait, so a host only has to expose
//! its entities, camera and clock. Hosts can add or override actions by
//! name with [`StandardActions::register`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use fsm_common::{EntityRef, FsmPath};
use glam::{EulerRot, Quat, Vec3};
use tracing::warn;

use crate::dispatch::{ActionEnv, ActionError, Arguments, NativeActions};

/// Position and orientation of a world object or the viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Direction the transform faces (+Z, Y up).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Rotate to face `target` with Y up. Leaves the rotation untouched
    /// when the target coincides with the position.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize() else {
            return;
        };
        let yaw = dir.x.atan2(dir.z);
        let pitch = -dir.y.clamp(-1.0, 1.0).asin();
        self.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
    }
}

/// Rotation from Euler angles in degrees, applied roll (Z), then pitch
/// (X), then yaw (Y).
pub fn euler_degrees(x: f32, y: f32, z: f32) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        y.to_radians(),
        x.to_radians(),
        z.to_radians(),
    )
}

/// An entity that can be driven along a path.
pub trait Pilot {
    fn follow_path(&mut self, path: &FsmPath, speed: i32);
    fn set_speed(&mut self, speed: i32);
    /// True once after the entity reaches the end of its path.
    fn take_arrived(&mut self) -> bool;
    fn sit(&mut self);
    fn is_attacked(&self) -> bool;
    fn is_alive(&self) -> bool;
}

/// What the standard actions need from the host.
pub trait World {
    /// Seconds since mission start. Feeds the timers.
    fn elapsed_seconds(&self) -> f32;

    /// True only during the tick on which the key went down, not while it
    /// is held. `isKeypress` returns this unchanged.
    fn is_key_pressed(&self) -> bool;

    /// World-space offset of path coordinates.
    fn origin(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Current transform of the object bound to `entity`, if one is live.
    fn transform(&self, entity: &EntityRef) -> Option<Transform>;

    /// Move the object bound to `entity`. Returns false if none is live.
    fn set_position(&mut self, entity: &EntityRef, position: Vec3) -> bool;

    /// The free-floating scripted viewpoint.
    fn camera_mut(&mut self) -> &mut Transform;

    /// Save the current viewpoint before a scripted camera sequence.
    fn push_camera(&mut self) {}

    /// Navigation control of the object bound to `entity`, if it has any.
    fn pilot(&mut self, entity: &EntityRef) -> Option<&mut dyn Pilot>;
}

/// Names of the actions every host must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Null,
    True,
    PushCam,
    TimeGreater,
    IsKeypress,
    CamObjDir,
    CamPosObj,
    Goto,
    Teleport,
    IsArrived,
    Sit,
    IsEqual,
    IsAttacked,
    IsDead,
    StartTimer,
}

pub const ALL_BUILTINS: [Builtin; 15] = [
    Builtin::Null,
    Builtin::True,
    Builtin::PushCam,
    Builtin::TimeGreater,
    Builtin::IsKeypress,
    Builtin::CamObjDir,
    Builtin::CamPosObj,
    Builtin::Goto,
    Builtin::Teleport,
    Builtin::IsArrived,
    Builtin::Sit,
    Builtin::IsEqual,
    Builtin::IsAttacked,
    Builtin::IsDead,
    Builtin::StartTimer,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Null => "null",
            Builtin::True => "true",
            Builtin::PushCam => "pushCam",
            Builtin::TimeGreater => "timeGreater",
            Builtin::IsKeypress => "isKeypress",
            Builtin::CamObjDir => "camObjDir",
            Builtin::CamPosObj => "camPosObj",
            Builtin::Goto => "goto",
            Builtin::Teleport => "teleport",
            Builtin::IsArrived => "isArrived",
            Builtin::Sit => "sit",
            Builtin::IsEqual => "isEqual",
            Builtin::IsAttacked => "isAttacked",
            Builtin::IsDead => "isDead",
            Builtin::StartTimer => "startTimer",
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Builtin {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_BUILTINS
            .iter()
            .find(|b| b.name() == s)
            .copied()
            .ok_or_else(|| ActionError::Unbound {
                name: s.to_string(),
            })
    }
}

type Handler<W> = Box<
    dyn FnMut(&mut W, &mut Arguments<'_>, &mut ActionEnv<'_>) -> Result<i32, ActionError>,
>;

/// The standard vocabulary over a host [`World`].
pub struct StandardActions<W> {
    world: W,
    extensions: HashMap<String, Handler<W>>,
}

impl<W: World> StandardActions<W> {
    pub fn new(world: W) -> Self {
        Self {
            world,
            extensions: HashMap::new(),
        }
    }

    /// Bind an extra action, or replace a builtin, by name.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(&mut W, &mut Arguments<'_>, &mut ActionEnv<'_>) -> Result<i32, ActionError>
            + 'static,
    {
        self.extensions.insert(name.into(), Box::new(handler));
    }

    /// True if `name` resolves to a builtin or a registered extension.
    pub fn binds(&self, name: &str) -> bool {
        self.extensions.contains_key(name) || name.parse::<Builtin>().is_ok()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn into_world(self) -> W {
        self.world
    }

    fn run_builtin(
        &mut self,
        builtin: Builtin,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        match builtin {
            Builtin::Null => Ok(0),
            Builtin::True => Ok(1),
            Builtin::PushCam => {
                self.world.push_camera();
                Ok(0)
            }
            Builtin::TimeGreater => {
                let [slot, seconds] = args.take()?;
                let elapsed = self.world.elapsed_seconds() - env.timer(slot)?;
                Ok(i32::from(elapsed >= seconds as f32))
            }
            Builtin::IsKeypress => Ok(i32::from(self.world.is_key_pressed())),
            Builtin::CamObjDir => self.cam_obj_dir(args, env),
            Builtin::CamPosObj => self.cam_pos_obj(args, env),
            Builtin::Goto => {
                let [entity, path, speed] = args.take()?;
                let (entity, path) = (env.entity(entity)?, env.path(path)?);
                match self.world.pilot(entity) {
                    Some(pilot) => pilot.follow_path(path, speed),
                    None => unhandled(builtin, entity, env),
                }
                Ok(0)
            }
            Builtin::Teleport => self.teleport(args, env),
            Builtin::IsArrived => self.with_pilot(builtin, args, env, |p| p.take_arrived()),
            Builtin::Sit => self.with_pilot(builtin, args, env, |p| {
                p.sit();
                false
            }),
            Builtin::IsEqual => {
                let [a, b] = args.take()?;
                Ok(i32::from(a == b))
            }
            Builtin::IsAttacked => self.with_pilot(builtin, args, env, |p| p.is_attacked()),
            Builtin::IsDead => self.with_pilot(builtin, args, env, |p| !p.is_alive()),
            Builtin::StartTimer => {
                let slot = args.next()?;
                env.set_timer(slot, self.world.elapsed_seconds())?;
                Ok(0)
            }
        }
    }

    /// Run a single-entity pilot query, answering 0 for entities that
    /// cannot be piloted.
    fn with_pilot(
        &mut self,
        builtin: Builtin,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
        query: impl FnOnce(&mut dyn Pilot) -> bool,
    ) -> Result<i32, ActionError> {
        let entity = env.entity(args.next()?)?;
        match self.world.pilot(entity) {
            Some(pilot) => Ok(i32::from(query(pilot))),
            None => {
                unhandled(builtin, entity, env);
                Ok(0)
            }
        }
    }

    /// `camObjDir(entity, dx, dy, dz, yaw, roll, pitch)`, all scaled by 1/100.
    fn cam_obj_dir(
        &mut self,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        let [entity, dx, dy, dz, yaw, roll, pitch] = args.take()?;
        let entity = env.entity(entity)?;
        let Some(anchor) = self.world.transform(entity) else {
            unhandled(Builtin::CamObjDir, entity, env);
            return Ok(0);
        };

        let offset = Vec3::new(dx as f32, dy as f32, dz as f32) / 100.0;
        let turn = euler_degrees(yaw as f32 / 100.0, pitch as f32 / 100.0, roll as f32 / 100.0);

        let mut position = anchor.position + anchor.rotation * offset;
        // Never below one unit over the anchor.
        position.y = position.y.max(anchor.position.y + 1.0);

        let camera = self.world.camera_mut();
        camera.position = position;
        camera.rotation = anchor.rotation * turn;
        Ok(0)
    }

    /// `camPosObj(path, height, watchEntity)`.
    fn cam_pos_obj(
        &mut self,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        let [path, height, watch] = args.take()?;
        let path = env.path(path)?;
        let watch = env.entity(watch)?;
        let Some(node) = path.start() else {
            warn!(path = %path.name, machine = env.machine(), at = env.at(), "camPosObj on empty path");
            return Ok(0);
        };

        let position = self.world.origin() + node + Vec3::Y * height as f32;
        let target = self.world.transform(watch);
        let camera = self.world.camera_mut();
        camera.position = position;
        match target {
            Some(t) => camera.look_at(t.position),
            None => unhandled(Builtin::CamPosObj, watch, env),
        }
        Ok(0)
    }

    /// `teleport(entity, path, speed, _)`: move to node 0 of the path,
    /// keeping the entity's height, then drive the path.
    fn teleport(
        &mut self,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        let [entity, path, speed, _unused] = args.take()?;
        let entity = env.entity(entity)?;
        let path = env.path(path)?;

        let (Some(current), Some(node)) = (self.world.transform(entity), path.start()) else {
            unhandled(Builtin::Teleport, entity, env);
            return Ok(0);
        };
        let origin = self.world.origin();
        let position = Vec3::new(origin.x + node.x, current.position.y, origin.z + node.z);
        self.world.set_position(entity, position);

        match self.world.pilot(entity) {
            Some(pilot) => {
                pilot.set_speed(speed);
                pilot.follow_path(path, speed);
            }
            None => unhandled(Builtin::Teleport, entity, env),
        }
        Ok(0)
    }
}

fn unhandled(builtin: Builtin, entity: &EntityRef, env: &ActionEnv<'_>) {
    warn!(
        action = builtin.name(),
        entity = %entity.label,
        object = %entity.object,
        machine = env.machine(),
        at = env.at(),
        "action not implemented for entity"
    );
}

impl<W: World> NativeActions for StandardActions<W> {
    fn dispatch(
        &mut self,
        name: &str,
        args: &mut Arguments<'_>,
        env: &mut ActionEnv<'_>,
    ) -> Result<i32, ActionError> {
        if let Some(handler) = self.extensions.get_mut(name) {
            return handler(&mut self.world, args, env);
        }
        let builtin: Builtin = name.parse()?;
        self.run_builtin(builtin, args, env)
    }
}
