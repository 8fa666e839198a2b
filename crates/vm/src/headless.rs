//! A minimal kinematic world for running missions without a game engine.
//!
//! Entities are points with an orientation, vehicles follow their paths in
//! straight lines at constant speed, and the clock only moves when the host
//! says so. Good enough for the CLI, tests and replaying scripts.

use std::collections::BTreeMap;

use fsm_common::{EntityRef, FsmPath};
use glam::{Quat, Vec3};
use tracing::{debug, trace};

use crate::actions::{Pilot, Transform, World};

/// Navigation state of a simulated vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct SimPilot {
    route: Vec<Vec3>,
    next: usize,
    speed: f32,
    arrived: bool,
    seated: bool,
    attacked: bool,
    alive: bool,
}

impl Default for SimPilot {
    fn default() -> Self {
        Self {
            route: Vec::new(),
            next: 0,
            speed: 0.0,
            arrived: false,
            seated: false,
            attacked: false,
            alive: true,
        }
    }
}

impl SimPilot {
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// True while there are waypoints left to reach.
    pub fn is_moving(&self) -> bool {
        self.next < self.route.len()
    }

    pub fn is_seated(&self) -> bool {
        self.seated
    }

    /// Move `transform` along the route for `dt` seconds. Path nodes are
    /// offset by `origin`.
    fn drive(&mut self, transform: &mut Transform, origin: Vec3, dt: f32) {
        if !self.alive || self.seated {
            return;
        }
        let mut budget = self.speed.max(0.0) * dt;
        while self.is_moving() && budget > 0.0 {
            let target = origin + self.route[self.next];
            let to_target = target - transform.position;
            let distance = to_target.length();
            if distance <= budget {
                transform.position = target;
                budget -= distance;
                self.next += 1;
                if !self.is_moving() {
                    self.arrived = true;
                }
            } else {
                transform.position += to_target / distance * budget;
                budget = 0.0;
            }
            if distance > f32::EPSILON {
                let heading = to_target.x.atan2(to_target.z);
                transform.rotation = Quat::from_rotation_y(heading);
            }
        }
    }
}

impl Pilot for SimPilot {
    fn follow_path(&mut self, path: &FsmPath, speed: i32) {
        self.route = path.nodes.clone();
        self.next = 0;
        self.speed = speed as f32;
        self.arrived = false;
        self.seated = false;
    }

    fn set_speed(&mut self, speed: i32) {
        self.speed = speed as f32;
    }

    fn take_arrived(&mut self) -> bool {
        std::mem::take(&mut self.arrived)
    }

    fn sit(&mut self) {
        self.seated = true;
    }

    fn is_attacked(&self) -> bool {
        self.attacked
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimEntity {
    pub transform: Transform,
    /// Present for vehicles and people; absent for static props.
    pub pilot: Option<SimPilot>,
}

/// Headless [`World`] keyed by object name.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    clock: f32,
    origin: Vec3,
    key_pressed: bool,
    camera: Transform,
    camera_pushes: Vec<Transform>,
    entities: BTreeMap<String, SimEntity>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Place a static object.
    pub fn spawn(&mut self, object: impl Into<String>, position: Vec3) {
        self.insert(object.into(), position, None);
    }

    /// Place an object that can follow paths.
    pub fn spawn_vehicle(&mut self, object: impl Into<String>, position: Vec3) {
        self.insert(object.into(), position, Some(SimPilot::default()));
    }

    fn insert(&mut self, object: String, position: Vec3, pilot: Option<SimPilot>) {
        debug!(%object, ?position, vehicle = pilot.is_some(), "spawn");
        self.entities.insert(
            object,
            SimEntity {
                transform: Transform::from_position(position),
                pilot,
            },
        );
    }

    /// Advance the clock without moving anything.
    pub fn advance_clock(&mut self, dt: f32) {
        self.clock += dt;
    }

    /// Advance the clock and drive every vehicle.
    pub fn step(&mut self, dt: f32) {
        self.clock += dt;
        let origin = self.origin;
        for (object, entity) in &mut self.entities {
            if let Some(pilot) = &mut entity.pilot {
                pilot.drive(&mut entity.transform, origin, dt);
                trace!(%object, position = ?entity.transform.position, "drive");
            }
        }
    }

    /// Set the key state the next tick reads. Callers clear it again after
    /// the tick the key went down.
    pub fn set_key_pressed(&mut self, pressed: bool) {
        self.key_pressed = pressed;
    }

    /// Mark an object as under attack. Returns false if it has no pilot.
    pub fn damage(&mut self, object: &str) -> bool {
        self.pilot_state(object).map(|p| p.attacked = true).is_some()
    }

    /// Kill an object. Returns false if it has no pilot.
    pub fn destroy(&mut self, object: &str) -> bool {
        self.pilot_state(object)
            .map(|p| {
                p.attacked = true;
                p.alive = false;
            })
            .is_some()
    }

    fn pilot_state(&mut self, object: &str) -> Option<&mut SimPilot> {
        self.entities.get_mut(object)?.pilot.as_mut()
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn camera(&self) -> &Transform {
        &self.camera
    }

    /// Viewpoints saved by `pushCam`, oldest first.
    pub fn camera_pushes(&self) -> &[Transform] {
        &self.camera_pushes
    }

    pub fn entity(&self, object: &str) -> Option<&SimEntity> {
        self.entities.get(object)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&str, &SimEntity)> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl World for SimWorld {
    fn elapsed_seconds(&self) -> f32 {
        self.clock
    }

    fn is_key_pressed(&self) -> bool {
        self.key_pressed
    }

    fn origin(&self) -> Vec3 {
        self.origin
    }

    fn transform(&self, entity: &EntityRef) -> Option<Transform> {
        self.entities.get(&entity.object).map(|e| e.transform)
    }

    fn set_position(&mut self, entity: &EntityRef, position: Vec3) -> bool {
        match self.entities.get_mut(&entity.object) {
            Some(e) => {
                e.transform.position = position;
                true
            }
            None => false,
        }
    }

    fn camera_mut(&mut self) -> &mut Transform {
        &mut self.camera
    }

    fn push_camera(&mut self) {
        self.camera_pushes.push(self.camera);
    }

    fn pilot(&mut self, entity: &EntityRef) -> Option<&mut dyn Pilot> {
        self.pilot_state(&entity.object)
            .map(|p| p as &mut dyn Pilot)
    }
}
