//! Scene Engine - clock-driven animated objects
//!
//! The engine owns a map of object id → [`SceneObject`]. A scene variant decides
//! how many objects exist, where they spawn and how a tick moves them. Ticks arrive
//! on the clock thread while readers poll [`SceneEngine::get_state`] from elsewhere,
//! so the map sits behind a read-write lock and readers get an owned snapshot.

use crate::clock::{ClockListener, ClockSignal, SignalKind};
use crate::{CoreError, Result};
use glam::DVec3;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use tracing::{debug, info, trace};

/// Unique identifier for a scene object
pub type ObjectId = u64;

// Reaching the boundary within this tolerance counts as crossing it
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Where and how objects of a variant are (re)spawned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRule {
    /// Range of the x coordinate
    pub x_range: (f64, f64),
    /// Range of the y coordinate
    pub y_range: (f64, f64),
    /// Starting depth, far from the viewer
    pub far_z: f64,
    /// Range of each rotation angle in radians
    pub rotation_range: (f64, f64),
}

/// Complete definition of a scene variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantSpec {
    /// Objects spawned on initialization
    pub object_count: usize,
    /// Spawn rule shared by initialization and recycling
    pub spawn: SpawnRule,
    /// Depth added per tick
    pub z_step: f64,
    /// Depth at which an object is recycled
    pub near_z: f64,
    /// Signal kind that advances this variant
    pub tick_kind: SignalKind,
}

/// Closed set of scene variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneVariant {
    /// Boxes fly from the far plane towards the viewer and respawn behind it
    Approach,
}

impl SceneVariant {
    /// All defined variants
    pub const ALL: [SceneVariant; 1] = [SceneVariant::Approach];

    /// Resolve a numeric variant id
    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.id() == id)
            .ok_or(CoreError::UnrecognizedSceneVariant(id))
    }

    /// Numeric id used by callers
    pub fn id(self) -> u32 {
        match self {
            SceneVariant::Approach => 1,
        }
    }

    /// Spawn and tick rules of the variant
    pub fn spec(self) -> VariantSpec {
        match self {
            SceneVariant::Approach => VariantSpec {
                object_count: 5,
                spawn: SpawnRule {
                    x_range: (-1.0, 1.0),
                    y_range: (-0.25, 0.25),
                    far_z: -10.0,
                    rotation_range: (0.0, TAU),
                },
                z_step: 0.1,
                near_z: 2.5,
                tick_kind: SignalKind::Time,
            },
        }
    }
}

/// One animated object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Position in scene units
    #[serde(with = "xyz")]
    pub position: DVec3,
    /// Euler rotation in radians
    #[serde(with = "xyz")]
    pub rotation: DVec3,
    /// Ticks since the last (re)spawn; depth is derived from it
    #[serde(skip)]
    steps: u32,
}

impl SceneObject {
    /// Ticks since this object last spawned
    pub fn steps_since_spawn(&self) -> u32 {
        self.steps
    }
}

/// Owned copy of the scene taken under the read lock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Active variant, `None` before initialization or after clearing
    pub variant: Option<SceneVariant>,
    /// Ticks applied since the last initialization
    pub ticks: u64,
    /// Objects by id
    pub objects: BTreeMap<ObjectId, SceneObject>,
}

struct SceneInner {
    variant: Option<SceneVariant>,
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: ObjectId,
    ticks: u64,
    rng: StdRng,
}

/// Clock-driven scene
pub struct SceneEngine {
    inner: RwLock<SceneInner>,
}

impl Default for SceneEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneEngine {
    /// Create an empty scene with an OS-seeded spawn generator
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create an empty scene with a deterministic spawn generator
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            inner: RwLock::new(SceneInner {
                variant: None,
                objects: BTreeMap::new(),
                next_id: 1,
                ticks: 0,
                rng,
            }),
        }
    }

    /// Replace the whole scene with a freshly spawned variant.
    ///
    /// Unknown ids fail with [`CoreError::UnrecognizedSceneVariant`] and leave the
    /// current scene as it was.
    pub fn initialize_scene(&self, variant_id: u32) -> Result<SceneVariant> {
        let variant = SceneVariant::from_id(variant_id)?;
        let spec = variant.spec();

        let mut inner = self.inner.write();
        let mut objects = BTreeMap::new();
        for _ in 0..spec.object_count {
            let id = inner.next_id;
            inner.next_id += 1;
            let object = SceneObject {
                position: spawn_position(&mut inner.rng, &spec.spawn),
                rotation: spawn_rotation(&mut inner.rng, &spec.spawn),
                steps: 0,
            };
            objects.insert(id, object);
        }
        inner.objects = objects;
        inner.variant = Some(variant);
        inner.ticks = 0;

        info!(
            "Scene initialized: {:?} with {} objects",
            variant, spec.object_count
        );
        Ok(variant)
    }

    /// Advance the scene by one clock signal.
    ///
    /// Returns how many objects were recycled. Signals of a kind the active
    /// variant does not listen to are ignored.
    pub fn on_tick(&self, signal: &ClockSignal) -> usize {
        let mut inner = self.inner.write();
        let Some(variant) = inner.variant else {
            return 0;
        };
        let spec = variant.spec();
        if signal.kind != spec.tick_kind {
            trace!("Scene ignored {} signal", signal.kind.as_str());
            return 0;
        }

        let SceneInner {
            objects, rng, ticks, ..
        } = &mut *inner;
        let mut recycled = 0;
        for (id, object) in objects.iter_mut() {
            object.steps += 1;
            object.position.z = spec.spawn.far_z + spec.z_step * object.steps as f64;

            if object.position.z >= spec.near_z - BOUNDARY_EPSILON {
                object.position = spawn_position(rng, &spec.spawn);
                object.steps = 0;
                recycled += 1;
                debug!("Recycled scene object {}", id);
            }
        }
        *ticks += 1;

        trace!("Scene tick {} (recycled {})", ticks, recycled);
        recycled
    }

    /// Owned copy of the current scene
    pub fn get_state(&self) -> SceneSnapshot {
        let inner = self.inner.read();
        SceneSnapshot {
            variant: inner.variant,
            ticks: inner.ticks,
            objects: inner.objects.clone(),
        }
    }

    /// Active variant
    pub fn active_variant(&self) -> Option<SceneVariant> {
        self.inner.read().variant
    }

    /// Remove every object and deactivate the variant
    pub fn clear_scene(&self) {
        let mut inner = self.inner.write();
        inner.objects.clear();
        inner.variant = None;
        inner.ticks = 0;
        debug!("Scene cleared");
    }
}

impl ClockListener for SceneEngine {
    fn on_signal(&self, signal: &ClockSignal) {
        self.on_tick(signal);
    }
}

fn sample(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}

fn spawn_position(rng: &mut StdRng, rule: &SpawnRule) -> DVec3 {
    let x = sample(rng, rule.x_range);
    let y = sample(rng, rule.y_range);
    DVec3::new(x, y, rule.far_z)
}

fn spawn_rotation(rng: &mut StdRng, rule: &SpawnRule) -> DVec3 {
    DVec3::new(
        sample(rng, rule.rotation_range),
        sample(rng, rule.rotation_range),
        sample(rng, rule.rotation_range),
    )
}

/// `DVec3` as `{x, y, z}`
mod xyz {
    use glam::DVec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xyz {
        x: f64,
        y: f64,
        z: f64,
    }

    pub fn serialize<S: Serializer>(v: &DVec3, serializer: S) -> Result<S::Ok, S::Error> {
        Xyz {
            x: v.x,
            y: v.y,
            z: v.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DVec3, D::Error> {
        let v = Xyz::deserialize(deserializer)?;
        Ok(DVec3::new(v.x, v.y, v.z))
    }
}
