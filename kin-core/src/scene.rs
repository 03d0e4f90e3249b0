//! The scene: entity pools and the fixed-timestep simulation loop.

use hashbrown::{HashMap, HashSet};
use kin_constraint::{
    AccelProbe, AccelerationField, GravityDirection, PairContact, PairSolver, Placeholder,
    SingleBodyContact, SingleBodySolver, SolveContext,
};
use kin_geom::{intersect, CollectStrategy, LooseOctree, OctreeItemId, Transform};
use kin_types::{
    AcceleratorHandle, BodyHandle, ConstraintSetHandle, DbConstraintHandle, Medium, PhysicsError,
    Result, SbConstraintHandle, TickConfig, Velocity, EPSILON,
};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::body::Body;
use crate::engine::BodyDef;
use crate::events::{ContactSink, EventSinks, StepSink};
use crate::pool::Pool;

/// Remainder steps shorter than this are dropped rather than simulated.
const MIN_REMAINDER: f64 = 1e-9;
/// World half-size of the broad-phase octree.
const OCTREE_HALF_SIZE: f64 = 4096.0;
const OCTREE_MAX_DEPTH: u8 = 9;

struct SbEntry {
    enabled: bool,
    body: BodyHandle,
    solver: Box<dyn SingleBodySolver + Send>,
}

struct DbEntry {
    enabled: bool,
    target: BodyHandle,
    source: BodyHandle,
    solver: Box<dyn PairSolver + Send>,
}

struct AcceleratorEntry {
    enabled: bool,
    field: Box<dyn AccelerationField + Send>,
}

#[derive(Default)]
struct SetEntry {
    sb: Vec<SbConstraintHandle>,
    db: Vec<DbConstraintHandle>,
}

/// Borrow two distinct placeholders mutably.
fn two_mut(
    placeholders: &mut [Option<Placeholder>],
    i: usize,
    j: usize,
) -> Option<(&mut Placeholder, &mut Placeholder)> {
    if i == j || i >= placeholders.len() || j >= placeholders.len() {
        return None;
    }
    if i < j {
        let (lo, hi) = placeholders.split_at_mut(j);
        Some((lo[i].as_mut()?, hi[0].as_mut()?))
    } else {
        let (lo, hi) = placeholders.split_at_mut(i);
        Some((hi[0].as_mut()?, lo[j].as_mut()?))
    }
}

fn one_mut(placeholders: &mut [Option<Placeholder>], i: usize) -> Option<&mut Placeholder> {
    placeholders.get_mut(i)?.as_mut()
}

/// A simulated world: bodies, constraints, accelerators, a broad-phase
/// octree, and the fixed-timestep loop that advances them.
///
/// All entities are owned by the scene and addressed through generational
/// handles; deleting an entity turns outstanding handles inert (getters
/// return `None` or defaults, setters are no-ops) rather than panicking.
pub struct Scene {
    config: TickConfig,
    medium: Medium,
    bodies: Pool<Body>,
    sb_constraints: Pool<SbEntry>,
    db_constraints: Pool<DbEntry>,
    accelerators: Pool<AcceleratorEntry>,
    constraint_sets: Pool<SetEntry>,
    octree: LooseOctree,
    octree_owners: HashMap<OctreeItemId, BodyHandle>,
    gravity: Option<AcceleratorHandle>,
    events: EventSinks,

    // Contact constraints detected last step, solved this step.
    sb_contacts: Vec<(BodyHandle, SingleBodyContact)>,
    db_contacts: Vec<(BodyHandle, BodyHandle, PairContact)>,

    // Per-step scratch, retained across steps to avoid reallocation.
    placeholders: Vec<Option<Placeholder>>,
    revisions: Vec<u64>,
    revision: u64,
    dynamic_scratch: Vec<BodyHandle>,
    candidate_scratch: Vec<OctreeItemId>,

    // Contact bookkeeping for begin/end edge detection.
    previous_pairs: HashSet<(BodyHandle, BodyHandle)>,
    current_pairs: HashSet<(BodyHandle, BodyHandle)>,
    previous_static: HashSet<(BodyHandle, BodyHandle)>,
    current_static: HashSet<(BodyHandle, BodyHandle)>,
    pending_begin: Vec<(BodyHandle, BodyHandle)>,
    pending_end: Vec<(BodyHandle, BodyHandle)>,
    pending_static: Vec<(BodyHandle, BodyHandle)>,
}

impl Scene {
    /// Create a scene with the given tick configuration.
    ///
    /// # Errors
    ///
    /// Rejects invalid configurations.
    pub fn new(config: TickConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            medium: Medium::default(),
            bodies: Pool::new(),
            sb_constraints: Pool::new(),
            db_constraints: Pool::new(),
            accelerators: Pool::new(),
            constraint_sets: Pool::new(),
            octree: LooseOctree::new(OCTREE_HALF_SIZE, OCTREE_MAX_DEPTH),
            octree_owners: HashMap::new(),
            gravity: None,
            events: EventSinks::default(),
            sb_contacts: Vec::new(),
            db_contacts: Vec::new(),
            placeholders: Vec::new(),
            revisions: Vec::new(),
            revision: 0,
            dynamic_scratch: Vec::new(),
            candidate_scratch: Vec::new(),
            previous_pairs: HashSet::new(),
            current_pairs: HashSet::new(),
            previous_static: HashSet::new(),
            current_static: HashSet::new(),
            pending_begin: Vec::new(),
            pending_end: Vec::new(),
            pending_static: Vec::new(),
        })
    }

    /// The tick configuration.
    #[must_use]
    pub const fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Replace the tick configuration.
    ///
    /// # Errors
    ///
    /// Rejects invalid configurations.
    pub fn set_config(&mut self, config: TickConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Scale simulated time relative to the elapsed time passed to
    /// [`advance`](Self::advance). Negative values are clamped to zero.
    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.config.time_scale = time_scale.max(0.0);
    }

    /// The surrounding medium.
    #[must_use]
    pub const fn medium(&self) -> &Medium {
        &self.medium
    }

    /// Replace the surrounding medium (density and wind).
    pub fn set_medium(&mut self, medium: Medium) {
        self.medium = medium;
    }

    /// Set uniform gravity, creating or updating the scene's directional
    /// accelerator.
    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        let field = Box::new(GravityDirection::from_vector(gravity));
        if let Some(handle) = self.gravity {
            if let Some(entry) = self.accelerators.get_mut(handle.raw()) {
                entry.field = field;
                return;
            }
        }
        let handle = AcceleratorHandle::from_raw(self.accelerators.insert(AcceleratorEntry {
            enabled: true,
            field,
        }));
        self.gravity = Some(handle);
    }

    // ----- bodies ---------------------------------------------------------

    /// Create a body from a definition.
    ///
    /// # Errors
    ///
    /// Rejects invalid shapes and out-of-range coefficients.
    pub fn create_body(&mut self, def: BodyDef) -> Result<BodyHandle> {
        def.shapes.validate()?;
        if !(0.0..=1.0).contains(&def.restitution) {
            return Err(PhysicsError::invalid_config(
                "restitution must be in [0, 1]",
            ));
        }
        if def.friction < 0.0 || def.linear_drag < 0.0 || def.angular_drag < 0.0 {
            return Err(PhysicsError::invalid_config(
                "friction and drag factors must be non-negative",
            ));
        }
        let mut body = Body {
            name: def.name,
            kind: def.kind,
            mass: def.mass,
            restitution: def.restitution,
            friction: def.friction,
            linear_drag: def.linear_drag,
            angular_drag: def.angular_drag,
            group: def.group,
            pose: def.pose,
            velocity: if def.kind.is_static() {
                Velocity::zero()
            } else {
                def.velocity
            },
            linear_accel: Vector3::zeros(),
            angular_accel: Vector3::zeros(),
            shapes: def.shapes,
            aero_surfaces: def.aero_surfaces,
            octree_item: None,
            bounding_radius: 0.0,
        };
        body.refresh_bounding_radius();
        let position = body.pose.position;
        let radius = body.bounding_radius();
        let has_shapes = !body.shapes.is_empty();
        let handle = BodyHandle::from_raw(self.bodies.insert(body));
        if has_shapes {
            let item = self.octree.insert(position, radius);
            self.octree_owners.insert(item, handle);
            if let Some(body) = self.bodies.get_mut(handle.raw()) {
                body.octree_item = Some(item);
            }
        }
        debug!(body = %handle, "created body");
        Ok(handle)
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.raw())
    }

    /// Look up a body mutably.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.raw())
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Delete a body. Constraints referencing it become inert. Returns
    /// `false` for a stale handle.
    pub fn delete_body(&mut self, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.remove(handle.raw()) else {
            return false;
        };
        if let Some(item) = body.octree_item {
            self.octree.remove(item);
            self.octree_owners.remove(&item);
        }
        debug!(body = %handle, "deleted body");
        true
    }

    /// Visit every live body in dense slot order.
    pub fn each_body<F>(&self, mut visit: F)
    where
        F: FnMut(BodyHandle, &Body),
    {
        for (raw, body) in self.bodies.iter() {
            visit(BodyHandle::from_raw(raw), body);
        }
    }

    /// Visit every body whose broad-phase sphere lies within `radius` of
    /// the given body.
    pub fn nearby<F>(&mut self, handle: BodyHandle, radius: f64, mut visit: F)
    where
        F: FnMut(BodyHandle, &Body),
    {
        let Some(center) = self.bodies.get(handle.raw()).map(|b| b.pose.position) else {
            return;
        };
        let extent = Vector3::new(radius, radius, radius);
        let mut candidates = std::mem::take(&mut self.candidate_scratch);
        candidates.clear();
        self.octree
            .visit_region(center - extent, center + extent, |item, _, _| {
                candidates.push(item);
            });
        for item in candidates.drain(..) {
            let Some(&owner) = self.octree_owners.get(&item) else {
                continue;
            };
            if owner == handle {
                continue;
            }
            if let Some(body) = self.bodies.get(owner.raw()) {
                visit(owner, body);
            }
        }
        self.candidate_scratch = candidates;
    }

    // ----- constraints ----------------------------------------------------

    /// Attach a single-body constraint to a body.
    ///
    /// # Errors
    ///
    /// Rejects stale body handles.
    pub fn create_sb_constraint(
        &mut self,
        body: BodyHandle,
        solver: Box<dyn SingleBodySolver + Send>,
    ) -> Result<SbConstraintHandle> {
        if !self.bodies.contains(body.raw()) {
            return Err(PhysicsError::stale("body", body.slot()));
        }
        Ok(SbConstraintHandle::from_raw(self.sb_constraints.insert(
            SbEntry {
                enabled: true,
                body,
                solver,
            },
        )))
    }

    /// Attach a pair constraint to a target and a source body.
    ///
    /// # Errors
    ///
    /// Rejects stale body handles.
    pub fn create_db_constraint(
        &mut self,
        target: BodyHandle,
        source: BodyHandle,
        solver: Box<dyn PairSolver + Send>,
    ) -> Result<DbConstraintHandle> {
        if !self.bodies.contains(target.raw()) {
            return Err(PhysicsError::stale("body", target.slot()));
        }
        if !self.bodies.contains(source.raw()) {
            return Err(PhysicsError::stale("body", source.slot()));
        }
        Ok(DbConstraintHandle::from_raw(self.db_constraints.insert(
            DbEntry {
                enabled: true,
                target,
                source,
                solver,
            },
        )))
    }

    /// Whether a single-body constraint is enabled and its body alive.
    /// Stale handles report `false`.
    #[must_use]
    pub fn sb_constraint_enabled(&self, handle: SbConstraintHandle) -> bool {
        self.sb_constraints
            .get(handle.raw())
            .is_some_and(|entry| entry.enabled && self.bodies.contains(entry.body.raw()))
    }

    /// Whether a pair constraint is enabled and both bodies alive. Stale
    /// handles report `false`.
    #[must_use]
    pub fn db_constraint_enabled(&self, handle: DbConstraintHandle) -> bool {
        self.db_constraints.get(handle.raw()).is_some_and(|entry| {
            entry.enabled
                && self.bodies.contains(entry.target.raw())
                && self.bodies.contains(entry.source.raw())
        })
    }

    /// Enable or disable a single-body constraint. No-op for stale
    /// handles.
    pub fn set_sb_constraint_enabled(&mut self, handle: SbConstraintHandle, enabled: bool) {
        if let Some(entry) = self.sb_constraints.get_mut(handle.raw()) {
            entry.enabled = enabled;
        }
    }

    /// Enable or disable a pair constraint. No-op for stale handles.
    pub fn set_db_constraint_enabled(&mut self, handle: DbConstraintHandle, enabled: bool) {
        if let Some(entry) = self.db_constraints.get_mut(handle.raw()) {
            entry.enabled = enabled;
        }
    }

    /// Delete a single-body constraint. Returns `false` for a stale
    /// handle.
    pub fn delete_sb_constraint(&mut self, handle: SbConstraintHandle) -> bool {
        self.sb_constraints.remove(handle.raw()).is_some()
    }

    /// Delete a pair constraint. Returns `false` for a stale handle.
    pub fn delete_db_constraint(&mut self, handle: DbConstraintHandle) -> bool {
        self.db_constraints.remove(handle.raw()).is_some()
    }

    // ----- accelerators ---------------------------------------------------

    /// Register a global acceleration field.
    pub fn create_accelerator(
        &mut self,
        field: Box<dyn AccelerationField + Send>,
    ) -> AcceleratorHandle {
        AcceleratorHandle::from_raw(self.accelerators.insert(AcceleratorEntry {
            enabled: true,
            field,
        }))
    }

    /// Enable or disable an accelerator. No-op for stale handles.
    pub fn set_accelerator_enabled(&mut self, handle: AcceleratorHandle, enabled: bool) {
        if let Some(entry) = self.accelerators.get_mut(handle.raw()) {
            entry.enabled = enabled;
        }
    }

    /// Delete an accelerator. Returns `false` for a stale handle.
    pub fn delete_accelerator(&mut self, handle: AcceleratorHandle) -> bool {
        if self.gravity == Some(handle) {
            self.gravity = None;
        }
        self.accelerators.remove(handle.raw()).is_some()
    }

    // ----- constraint sets ------------------------------------------------

    /// Create an empty constraint set for batch enable/disable/delete.
    pub fn create_constraint_set(&mut self) -> ConstraintSetHandle {
        ConstraintSetHandle::from_raw(self.constraint_sets.insert(SetEntry::default()))
    }

    /// Add a single-body constraint to a set. No-op for stale handles.
    pub fn add_sb_to_set(&mut self, set: ConstraintSetHandle, constraint: SbConstraintHandle) {
        if let Some(entry) = self.constraint_sets.get_mut(set.raw()) {
            entry.sb.push(constraint);
        }
    }

    /// Add a pair constraint to a set. No-op for stale handles.
    pub fn add_db_to_set(&mut self, set: ConstraintSetHandle, constraint: DbConstraintHandle) {
        if let Some(entry) = self.constraint_sets.get_mut(set.raw()) {
            entry.db.push(constraint);
        }
    }

    /// Enable or disable every constraint in a set. No-op for stale
    /// handles.
    pub fn set_constraint_set_enabled(&mut self, set: ConstraintSetHandle, enabled: bool) {
        let Some(entry) = self.constraint_sets.get(set.raw()) else {
            return;
        };
        let sb: Vec<_> = entry.sb.clone();
        let db: Vec<_> = entry.db.clone();
        for handle in sb {
            self.set_sb_constraint_enabled(handle, enabled);
        }
        for handle in db {
            self.set_db_constraint_enabled(handle, enabled);
        }
    }

    /// Delete a set and every constraint in it. Returns `false` for a
    /// stale handle.
    pub fn delete_constraint_set(&mut self, set: ConstraintSetHandle) -> bool {
        let Some(entry) = self.constraint_sets.remove(set.raw()) else {
            return false;
        };
        for handle in entry.sb {
            self.delete_sb_constraint(handle);
        }
        for handle in entry.db {
            self.delete_db_constraint(handle);
        }
        true
    }

    // ----- subscriptions --------------------------------------------------

    /// Subscribe to per-advance updates (receives simulated elapsed time).
    pub fn on_step(&mut self, sink: StepSink) {
        self.events.step.push(sink);
    }

    /// Subscribe to dynamic-dynamic collision begin events.
    pub fn on_contact_begin(&mut self, sink: ContactSink) {
        self.events.contact_begin.push(sink);
    }

    /// Subscribe to dynamic-dynamic collision end events.
    pub fn on_contact_end(&mut self, sink: ContactSink) {
        self.events.contact_end.push(sink);
    }

    /// Subscribe to static-dynamic collision begin events (dynamic body
    /// first).
    pub fn on_static_contact(&mut self, sink: ContactSink) {
        self.events.static_contact.push(sink);
    }

    // ----- simulation loop ------------------------------------------------

    /// Advance the simulation by `elapsed` seconds (scaled by the time
    /// scale), slicing into fixed timesteps plus one short remainder step.
    /// `advance(0.0)` is a no-op. Events are delivered synchronously
    /// before returning.
    pub fn advance(&mut self, elapsed: f64) {
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return;
        }
        let total = elapsed * self.config.time_scale;
        if total <= 0.0 {
            return;
        }
        let dt = self.config.timestep;
        let full_steps = (total / dt).floor() as u64;
        let remainder = total - (full_steps as f64) * dt;
        debug!(total, full_steps, remainder, "advancing scene");
        for _ in 0..full_steps {
            self.step(dt);
        }
        if remainder > MIN_REMAINDER {
            self.step(remainder);
        }
        self.deliver_events(total);
    }

    fn deliver_events(&mut self, elapsed: f64) {
        let mut events = std::mem::take(&mut self.events);
        events.emit_step(elapsed);
        for &(a, b) in &self.pending_begin {
            events.emit_contact_begin(a, b);
        }
        for &(a, b) in &self.pending_end {
            events.emit_contact_end(a, b);
        }
        for &(body, fixed) in &self.pending_static {
            events.emit_static_contact(body, fixed);
        }
        self.pending_begin.clear();
        self.pending_end.clear();
        self.pending_static.clear();
        self.events = events;
    }

    /// One fixed step. Phase order is load-bearing; see the loop body.
    fn step(&mut self, dt: f64) {
        let ctx = SolveContext::new(dt, self.config.impulse_beta, self.config.nudge_beta);
        self.build_placeholders();
        self.reset_constraints(&ctx);
        self.apply_forces_and_integrate_velocity(dt);
        for _ in 0..self.config.impulse_iterations {
            self.impulse_iteration(&ctx);
        }
        self.integrate_position(dt);
        for _ in 0..self.config.nudge_iterations {
            self.nudge_iteration(&ctx);
        }
        self.write_back();
        self.reseat_octree();
        self.detect_collisions();
    }

    fn build_placeholders(&mut self) {
        self.placeholders.clear();
        self.placeholders.resize(self.bodies.slot_count(), None);
        for (raw, body) in self.bodies.iter() {
            let placeholder = if body.is_static() {
                Placeholder::fixed(body.pose.position, body.pose.rotation)
            } else {
                Placeholder::new(
                    body.mass.inv_mass(),
                    body.mass.inv_inertia_world(&body.pose.rotation),
                    body.velocity.linear,
                    body.velocity.angular,
                    body.pose.position,
                    body.pose.rotation,
                )
            };
            self.placeholders[raw.slot() as usize] = Some(placeholder);
        }
    }

    fn reset_constraints(&mut self, ctx: &SolveContext) {
        let placeholders = &self.placeholders;
        let bodies = &self.bodies;
        for (_, entry) in self.db_constraints.iter_mut() {
            if !entry.enabled
                || !bodies.contains(entry.target.raw())
                || !bodies.contains(entry.source.raw())
            {
                continue;
            }
            let (Some(Some(target)), Some(Some(source))) = (
                placeholders.get(entry.target.slot() as usize),
                placeholders.get(entry.source.slot() as usize),
            ) else {
                continue;
            };
            entry.solver.reset(ctx, target, source);
        }
        for (target_handle, source_handle, contact) in &mut self.db_contacts {
            if !bodies.contains(target_handle.raw()) || !bodies.contains(source_handle.raw()) {
                continue;
            }
            let (Some(Some(target)), Some(Some(source))) = (
                placeholders.get(target_handle.slot() as usize),
                placeholders.get(source_handle.slot() as usize),
            ) else {
                continue;
            };
            contact.reset(ctx, target, source);
        }
        for (_, entry) in self.sb_constraints.iter_mut() {
            if !entry.enabled || !bodies.contains(entry.body.raw()) {
                continue;
            }
            if let Some(Some(body)) = placeholders.get(entry.body.slot() as usize) {
                entry.solver.reset(ctx, body);
            }
        }
        for (handle, contact) in &mut self.sb_contacts {
            if !bodies.contains(handle.raw()) {
                continue;
            }
            if let Some(Some(body)) = placeholders.get(handle.slot() as usize) {
                contact.reset(ctx, body);
            }
        }
    }

    fn apply_forces_and_integrate_velocity(&mut self, dt: f64) {
        let accelerators = &self.accelerators;
        let medium = self.medium;
        let placeholders = &mut self.placeholders;
        let config = self.config;
        for (raw, body) in self.bodies.iter_mut() {
            body.linear_accel = Vector3::zeros();
            body.angular_accel = Vector3::zeros();
            if body.is_static() {
                continue;
            }
            let Some(placeholder) = one_mut(placeholders, raw.slot() as usize) else {
                continue;
            };

            let mut probe = AccelProbe::new(
                body.pose.position,
                body.velocity.linear,
                body.velocity.angular,
            );
            for (_, entry) in accelerators.iter() {
                if entry.enabled {
                    entry.field.apply(&mut probe);
                }
            }

            // Quadratic drag against the medium, linear and angular.
            let relative = body.velocity.linear - medium.velocity;
            probe.linear -= relative * (medium.density * body.linear_drag * relative.norm());
            let spin = body.velocity.angular;
            probe.angular -= spin * (medium.density * body.angular_drag * spin.norm());

            // Aerodynamic surfaces: drag along the local wind, lift along
            // the projected surface normal, torque about the body origin.
            for surface in &body.aero_surfaces {
                let point = body.pose.transform_point(&Point3::from(surface.offset));
                let point_velocity = body.velocity.at_point(&(point - body.pose.position));
                let wind = point_velocity - medium.velocity;
                let speed = wind.norm();
                if speed < EPSILON {
                    continue;
                }
                let wind_dir = wind / speed;
                let pressure = 0.5 * medium.density * speed * speed;
                let mut force =
                    wind_dir * (-surface.drag_coefficient * pressure * surface.area);
                let normal = body.pose.transform_vector(&surface.normal);
                let cos_incidence = normal.dot(&wind_dir);
                let lift_axis = normal - wind_dir * cos_incidence;
                let lift_norm = lift_axis.norm();
                if lift_norm > EPSILON {
                    force += (lift_axis / lift_norm)
                        * (surface.lift_coefficient * pressure * surface.area * cos_incidence);
                }
                probe.linear += force * placeholder.inv_mass;
                probe.angular +=
                    placeholder.inv_inertia * (point - body.pose.position).cross(&force);
            }

            // Clamp accumulated accelerations, store for inspection, and
            // integrate into the working velocities.
            let accel = Velocity::new(probe.linear, probe.angular).clamped(
                config.max_acceleration,
                config.max_angular_acceleration,
            );
            body.linear_accel = accel.linear;
            body.angular_accel = accel.angular;
            placeholder.linear_velocity += accel.linear * dt;
            placeholder.angular_velocity += accel.angular * dt;
        }
    }

    fn impulse_iteration(&mut self, ctx: &SolveContext) {
        let placeholders = &mut self.placeholders;
        let bodies = &self.bodies;
        for (_, entry) in self.db_constraints.iter_mut() {
            if !entry.enabled
                || !bodies.contains(entry.target.raw())
                || !bodies.contains(entry.source.raw())
            {
                continue;
            }
            let Some((target, source)) = two_mut(
                placeholders,
                entry.target.slot() as usize,
                entry.source.slot() as usize,
            ) else {
                continue;
            };
            entry.solver.apply_impulses(ctx, target, source);
        }
        for (target_handle, source_handle, contact) in &mut self.db_contacts {
            if !bodies.contains(target_handle.raw()) || !bodies.contains(source_handle.raw()) {
                continue;
            }
            let Some((target, source)) = two_mut(
                placeholders,
                target_handle.slot() as usize,
                source_handle.slot() as usize,
            ) else {
                continue;
            };
            contact.apply_impulses(ctx, target, source);
        }
        for (_, entry) in self.sb_constraints.iter_mut() {
            if !entry.enabled || !bodies.contains(entry.body.raw()) {
                continue;
            }
            if let Some(body) = one_mut(placeholders, entry.body.slot() as usize) {
                entry.solver.apply_impulses(ctx, body);
            }
        }
        for (handle, contact) in &mut self.sb_contacts {
            if !bodies.contains(handle.raw()) {
                continue;
            }
            if let Some(body) = one_mut(placeholders, handle.slot() as usize) {
                contact.apply_impulses(ctx, body);
            }
        }
    }

    fn integrate_position(&mut self, dt: f64) {
        let placeholders = &mut self.placeholders;
        let config = self.config;
        for (raw, body) in self.bodies.iter() {
            if body.is_static() {
                continue;
            }
            let Some(placeholder) = one_mut(placeholders, raw.slot() as usize) else {
                continue;
            };
            let clamped = Velocity::new(
                placeholder.linear_velocity,
                placeholder.angular_velocity,
            )
            .clamped(config.max_velocity, config.max_angular_velocity);
            placeholder.linear_velocity = clamped.linear;
            placeholder.angular_velocity = clamped.angular;

            placeholder.position += clamped.linear * dt;
            let rotation_vector = clamped.angular * dt;
            let angle = rotation_vector.norm();
            if angle > EPSILON {
                let delta = UnitQuaternion::from_axis_angle(
                    &nalgebra::Unit::new_unchecked(rotation_vector / angle),
                    angle,
                );
                placeholder.set_rotation(delta * placeholder.rotation);
            }
        }
    }

    /// One nudge iteration: each enabled constraint is reset against the
    /// corrected poses (positional corrections change drift and Jacobians)
    /// and then applies its nudge. Contact constraints nudge nothing.
    fn nudge_iteration(&mut self, ctx: &SolveContext) {
        let placeholders = &mut self.placeholders;
        let bodies = &self.bodies;
        for (_, entry) in self.db_constraints.iter_mut() {
            if !entry.enabled
                || !bodies.contains(entry.target.raw())
                || !bodies.contains(entry.source.raw())
            {
                continue;
            }
            let Some((target, source)) = two_mut(
                placeholders,
                entry.target.slot() as usize,
                entry.source.slot() as usize,
            ) else {
                continue;
            };
            entry.solver.reset(ctx, target, source);
            entry.solver.apply_nudges(ctx, target, source);
        }
        for (_, entry) in self.sb_constraints.iter_mut() {
            if !entry.enabled || !bodies.contains(entry.body.raw()) {
                continue;
            }
            if let Some(body) = one_mut(placeholders, entry.body.slot() as usize) {
                entry.solver.reset(ctx, body);
                entry.solver.apply_nudges(ctx, body);
            }
        }
    }

    fn write_back(&mut self) {
        let placeholders = &self.placeholders;
        for (raw, body) in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            let Some(Some(placeholder)) = placeholders.get(raw.slot() as usize) else {
                continue;
            };
            body.velocity = Velocity::new(
                placeholder.linear_velocity,
                placeholder.angular_velocity,
            );
            body.pose.position = placeholder.position;
            body.pose.rotation = placeholder.rotation;
            body.pose.renormalize();
            if !body.pose.is_finite() || !body.velocity.is_finite() {
                warn!(
                    body = %BodyHandle::from_raw(raw),
                    "body state diverged to non-finite values"
                );
            }
        }
    }

    /// Batched broad-phase reseat: every dynamic body is relocated once
    /// per step, after the nudge passes, rather than inside them.
    fn reseat_octree(&mut self) {
        let octree = &mut self.octree;
        for (_, body) in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            body.refresh_bounding_radius();
            if let Some(item) = body.octree_item {
                octree.relocate(item, body.pose.position, body.bounding_radius());
            }
        }
    }

    fn detect_collisions(&mut self) {
        self.revision += 1;
        self.revisions.clear();
        self.revisions.resize(self.bodies.slot_count(), 0);
        self.sb_contacts.clear();
        self.db_contacts.clear();
        self.current_pairs.clear();
        self.current_static.clear();

        let mut dynamics = std::mem::take(&mut self.dynamic_scratch);
        dynamics.clear();
        for (raw, body) in self.bodies.iter() {
            if !body.is_static() && !body.shapes.is_empty() {
                dynamics.push(BodyHandle::from_raw(raw));
            }
        }

        let mut candidates = std::mem::take(&mut self.candidate_scratch);
        {
            let bodies = &self.bodies;
            let octree = &self.octree;
            let owners = &self.octree_owners;
            let revisions = &mut self.revisions;
            let revision = self.revision;
            let sb_contacts = &mut self.sb_contacts;
            let db_contacts = &mut self.db_contacts;
            let current_pairs = &mut self.current_pairs;
            let previous_pairs = &self.previous_pairs;
            let current_static = &mut self.current_static;
            let previous_static = &self.previous_static;
            let pending_begin = &mut self.pending_begin;
            let pending_static = &mut self.pending_static;

            for &handle_a in &dynamics {
                revisions[handle_a.slot() as usize] = revision;
                let Some(body_a) = bodies.get(handle_a.raw()) else {
                    continue;
                };
                let radius = body_a.bounding_radius();
                let extent = Vector3::new(radius, radius, radius);
                let center = body_a.pose.position;
                candidates.clear();
                octree.visit_region(center - extent, center + extent, |item, _, _| {
                    candidates.push(item);
                });
                let world_a = body_a.shapes.transformed(&Transform::new(
                    body_a.pose.position.coords,
                    body_a.pose.rotation,
                ));
                for &item in &candidates {
                    let Some(&handle_b) = owners.get(&item) else {
                        continue;
                    };
                    if handle_b == handle_a {
                        continue;
                    }
                    // Pairs of dynamic bodies are tested once: the second
                    // body's own pass finds the first already stamped.
                    if revisions[handle_b.slot() as usize] == revision {
                        continue;
                    }
                    let Some(body_b) = bodies.get(handle_b.raw()) else {
                        continue;
                    };
                    if body_a.group != 0 && body_a.group == body_b.group {
                        continue;
                    }

                    let world_b = body_b.shapes.transformed(&Transform::new(
                        body_b.pose.position.coords,
                        body_b.pose.rotation,
                    ));
                    let hits = intersect::set_set(&world_a, &world_b, CollectStrategy::Worst);
                    if hits.is_empty() {
                        continue;
                    }
                    let friction = body_a.friction * body_b.friction;
                    let restitution = body_a.restitution * body_b.restitution;
                    for hit in hits {
                        if body_b.is_static() {
                            sb_contacts.push((
                                handle_a,
                                SingleBodyContact::new(
                                    hit.normal_a,
                                    hit.point_a,
                                    hit.depth,
                                    friction,
                                    restitution,
                                ),
                            ));
                            if current_static.insert((handle_a, handle_b))
                                && !previous_static.contains(&(handle_a, handle_b))
                            {
                                pending_static.push((handle_a, handle_b));
                            }
                        } else {
                            db_contacts.push((
                                handle_a,
                                handle_b,
                                PairContact::new(
                                    hit.normal_a,
                                    hit.point_a,
                                    hit.depth,
                                    friction,
                                    restitution,
                                ),
                            ));
                            let key = if handle_a <= handle_b {
                                (handle_a, handle_b)
                            } else {
                                (handle_b, handle_a)
                            };
                            if current_pairs.insert(key) && !previous_pairs.contains(&key) {
                                pending_begin.push(key);
                            }
                        }
                    }
                }
            }
        }
        self.candidate_scratch = candidates;
        self.dynamic_scratch = dynamics;

        // Edge detection against the previous step's pair sets.
        let mut ended: Vec<_> = self
            .previous_pairs
            .iter()
            .filter(|pair| !self.current_pairs.contains(*pair))
            .copied()
            .collect();
        ended.sort_unstable();
        self.pending_end.extend(ended);
        std::mem::swap(&mut self.previous_pairs, &mut self.current_pairs);
        std::mem::swap(&mut self.previous_static, &mut self.current_static);
    }
}
