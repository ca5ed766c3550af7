// src/engine_lib/soft_body.rs
//
// Jelly blobs: spawning and the per-frame simulation step.
//
// All positions are in structure-local space. The pairwise collision pass is
// O(N²); populations up to `RECOMMENDED_MAX_BLOBS` stay well inside a frame,
// anything larger wants a spatial grid instead.

use glam::{Vec2, Vec3};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f32::consts::TAU;

use crate::engine_lib::config::{BlobClassSpec, BlobControls, Theme, RECOMMENDED_MAX_BLOBS};
use crate::engine_lib::geometry::{self, MeshData};
use crate::engine_lib::scene_types::{
    BlinkState, BlobClass, BlobColor, BlobEntity, BlobMotion, BlobPhases, Emergence, Eye, MeshId, PlayVolume, StructureFace,
};

pub const COLLISION_SCALE: f32 = 1.2;
pub const COLLISION_BUFFER: f32 = 0.05;
/// Fraction of a heading kept after bouncing off anything.
pub const BOUNCE_DAMPING: f32 = 0.8;
pub const COLLISION_PASSES: usize = 12;
pub const HEADING_LERP: f32 = 0.02;
/// Per-frame chance of picking a new heading, before the control multiplier.
pub const RETARGET_CHANCE: f32 = 0.005;
const MIN_HEADING: f32 = 0.2;
const SPAWN_ATTEMPTS: usize = 100;
const GOLDEN_ANGLE: f32 = 2.399_963;
/// Upper bound of the jelly offset per unit of `jelly_intensity * jiggle`.
pub const JELLY_BOUND: f32 = 0.79;

const BODY_SEGMENTS: (u32, u32) = (24, 18);

/// Meshes shared by every blob's eyes.
#[derive(Clone, Copy, Debug)]
pub struct EyeMeshes {
    pub white: MeshId,
    pub pupil: MeshId,
}

pub struct Population {
    pub blobs: Vec<BlobEntity>,
    pub eyes: EyeMeshes,
}

/// Per-frame inputs shared by every blob.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    pub volume: &'a PlayVolume,
    pub faces: &'a [StructureFace],
    pub controls: &'a BlobControls,
    pub time: f32,
    pub dt: f32,
}

fn range<R: Rng>(rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

fn random_heading<R: Rng>(rng: &mut R) -> Vec3 {
    let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0) * 0.4, rng.gen_range(-1.0..1.0));
    v.try_normalize().unwrap_or(Vec3::X)
}

/// Reflects `v` off a surface with unit normal `n` when it points into the
/// surface, losing energy on the bounce.
fn bounce(v: Vec3, n: Vec3) -> Vec3 {
    let into = v.dot(n);
    if into < 0.0 {
        (v - 2.0 * into * n) * BOUNCE_DAMPING
    } else {
        v
    }
}

/// Sphere perturbed by a fixed sine pattern; this is the blob's rest shape.
fn organic_body(radius: f32, seed_phase: f32) -> MeshData {
    let mut body = geometry::uv_sphere(radius, BODY_SEGMENTS.0, BODY_SEGMENTS.1);
    for p in body.positions.iter_mut() {
        let n = *p / radius;
        let bump = 1.0 + 0.06 * (n.x * 3.0 + seed_phase).sin() * (n.y * 2.5).cos() + 0.03 * (n.z * 4.0 + seed_phase).sin();
        *p *= bump;
    }
    body.recompute_normals();
    body.dynamic = true;
    body
}

fn class_order<R: Rng>(classes: &[BlobClassSpec], count: usize, rng: &mut R) -> Vec<BlobClassSpec> {
    let mut order: Vec<BlobClassSpec> = classes.iter().flat_map(|c| std::iter::repeat(*c).take(c.count)).collect();
    if order.is_empty() {
        return order;
    }
    let mut i = 0;
    while order.len() < count {
        order.push(classes[i % classes.len()]);
        i += 1;
    }
    order.shuffle(rng);
    order.truncate(count);
    order
}

fn clear_of_faces(position: Vec3, radius: f32, faces: &[StructureFace]) -> bool {
    faces.iter().all(|f| position.distance(f.position) >= f.clearance_radius + radius)
}

#[allow(clippy::too_many_arguments)]
fn place<R: Rng>(
    spec: &BlobClassSpec,
    collision_radius: f32,
    slot: usize,
    total: usize,
    placed: &[(Vec3, f32)],
    volume: &PlayVolume,
    faces: &[StructureFace],
    rng: &mut R,
) -> Vec3 {
    let limit = volume.horizontal_limit(collision_radius) * spec.placement_scale;
    let (lo, hi) = (volume.floor_y + collision_radius, volume.ceiling_y - collision_radius);
    let y_range = if hi > lo { (lo, hi) } else { (volume.floor_y, volume.floor_y) };

    for _ in 0..SPAWN_ATTEMPTS {
        let angle = rng.gen_range(0.0..TAU);
        let r = rng.gen::<f32>().sqrt() * limit;
        let candidate = Vec3::new(angle.cos() * r, range(rng, y_range), angle.sin() * r);
        let free = placed
            .iter()
            .all(|(p, other)| candidate.distance(*p) >= collision_radius + other + COLLISION_BUFFER);
        if free && clear_of_faces(candidate, collision_radius, faces) {
            return candidate;
        }
    }

    // Golden spiral fallback; collisions sort out any leftover overlap.
    let angle = slot as f32 * GOLDEN_ANGLE;
    let r = limit * ((slot as f32 + 0.5) / total.max(1) as f32).sqrt();
    Vec3::new(angle.cos() * r, (y_range.0 + y_range.1) * 0.5, angle.sin() * r)
}

fn class_motion<R: Rng>(class: BlobClass, rng: &mut R) -> BlobMotion {
    let spin = match class {
        BlobClass::Large => 1.5,
        _ => 2.1,
    };
    BlobMotion {
        swim_speed: rng.gen_range(0.8..1.4),
        swim_amplitude: rng.gen_range(0.6..1.0),
        jelly_speed: rng.gen_range(1.0..1.6),
        jelly_intensity: rng.gen_range(0.03..0.05),
        pulse_speed: rng.gen_range(0.8..1.4),
        pulse_intensity: rng.gen_range(0.4..0.6),
        squishiness: rng.gen_range(0.05..0.09),
        squish_speed: rng.gen_range(1.0..1.6),
        rotation_speed: (rng.gen::<f32>() - 0.5) * spin,
        happiness: rng.gen_range(0.7..1.0),
    }
}

fn eyes_for(radius: f32) -> [Eye; 2] {
    let eye = |side: f32| {
        let rest = Vec3::new(side * radius * 0.3, radius * 0.2, radius * 0.8).normalize() * radius * 0.95;
        Eye { rest_offset: rest, offset: rest, radius: radius * 0.2, scale_y: 1.0 }
    };
    [eye(-1.0), eye(1.0)]
}

/// Creates the whole population once. Blob meshes are appended to `meshes`.
pub fn spawn_population<R: Rng>(
    theme: &Theme,
    faces: &[StructureFace],
    meshes: &mut Vec<MeshData>,
    rng: &mut R,
) -> Population {
    let volume = &theme.volume;
    let order = class_order(&theme.blob_classes, theme.max_blobs, rng);
    if order.len() > RECOMMENDED_MAX_BLOBS {
        warn!(
            "{} blobs requested; pairwise collisions scale quadratically past {}",
            order.len(),
            RECOMMENDED_MAX_BLOBS
        );
    }

    meshes.push(geometry::uv_sphere(1.0, 16, 12));
    let white = MeshId(meshes.len() - 1);
    meshes.push(geometry::uv_sphere(1.0, 12, 8));
    let pupil = MeshId(meshes.len() - 1);

    let mut placed: Vec<(Vec3, f32)> = Vec::with_capacity(order.len());
    let mut blobs = Vec::with_capacity(order.len());
    let mut emerging = 0;

    for (slot, spec) in order.iter().enumerate() {
        let base_radius = range(rng, spec.radius);
        let collision_radius = base_radius * COLLISION_SCALE;
        let rest = place(spec, collision_radius, slot, order.len(), &placed, volume, faces, rng);
        placed.push((rest, collision_radius));

        let phases = BlobPhases {
            jelly: rng.gen_range(0.0..TAU),
            pulse: rng.gen_range(0.0..TAU),
            swim: rng.gen_range(0.0..TAU),
            squish: rng.gen_range(0.0..TAU),
        };
        let body = organic_body(base_radius, phases.jelly);
        let original = body.positions.clone();
        meshes.push(body);
        let mesh = MeshId(meshes.len() - 1);

        let color = theme.blob_palette.choose(rng).copied().unwrap_or(BlobColor { color: Vec3::ONE, emission: Vec3::ONE });

        let spiral_radius = rng.gen_range(0.3..0.6_f32).min(volume.horizontal_limit(collision_radius));
        let anchor = Vec2::new(rest.x, rest.z)
            .clamp_length_max((volume.horizontal_limit(collision_radius) - spiral_radius).max(0.0));
        let emergence = Emergence {
            target_y: rest.y,
            anchor,
            spiral_angle: rng.gen_range(0.0..TAU),
            spiral_speed: rng.gen_range(1.0..2.0),
            spiral_radius,
            rise_speed: rng.gen_range(0.5..0.8),
        };
        let is_emerging = rng.gen::<f32>() < theme.emergence_chance;
        let position = if is_emerging {
            emerging += 1;
            let offset = Vec2::from_angle(emergence.spiral_angle) * spiral_radius;
            Vec3::new(anchor.x + offset.x, volume.emergence_floor_y, anchor.y + offset.y)
        } else {
            rest
        };

        blobs.push(BlobEntity::new(
            mesh,
            spec.class,
            color,
            position,
            random_heading(rng),
            base_radius,
            COLLISION_SCALE,
            original,
            phases,
            class_motion(spec.class, rng),
            is_emerging,
            emergence,
            eyes_for(base_radius),
            rng.gen_range(0.5..2.5),
        ));
    }

    debug!("spawned {} blobs ({} emerging)", blobs.len(), emerging);
    Population { blobs, eyes: EyeMeshes { white, pupil } }
}

/// One frame of the simulation, in the fixed order the renderer relies on.
pub fn step<R: Rng>(blobs: &mut [BlobEntity], ctx: &StepContext, rng: &mut R) {
    for blob in blobs.iter_mut().filter(|b| b.is_emerging) {
        advance_emergence(blob, ctx.dt);
    }
    resolve_collisions(blobs, ctx.controls.avoidance_distance);
    for blob in blobs.iter_mut() {
        deform(blob, ctx.time, ctx.controls.jiggle_intensity);
    }
    for (index, blob) in blobs.iter_mut().enumerate() {
        update_heading(blob, ctx.controls, rng);
        translate(blob, ctx);
        contain(blob, ctx.volume, ctx.faces);
        animate(blob, index, ctx, rng);
    }
}

pub fn advance_emergence(blob: &mut BlobEntity, dt: f32) {
    let e = &mut blob.emergence;
    e.spiral_angle += e.spiral_speed * dt;
    let offset = Vec2::from_angle(e.spiral_angle) * e.spiral_radius;
    blob.position.x = e.anchor.x + offset.x;
    blob.position.z = e.anchor.y + offset.y;
    blob.position.y += e.rise_speed * dt;
    if blob.position.y >= e.target_y {
        blob.position.y = e.target_y;
        blob.is_emerging = false;
    }
}

/// Separates overlapping pairs with a few relaxation passes and reflects
/// their headings. Pairs inside the softer avoidance radius only steer.
pub fn resolve_collisions(blobs: &mut [BlobEntity], avoidance_distance: f32) {
    let n = blobs.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (head, tail) = blobs.split_at_mut(j);
            let (a, b) = (&mut head[i], &mut tail[0]);
            let reach = (a.base_radius() + b.base_radius()) * avoidance_distance;
            let delta = a.position - b.position;
            let distance = delta.length();
            if distance > 1e-6 && distance < reach {
                let away = delta / distance;
                let strength = (reach - distance) / reach * 0.03;
                a.target_direction += away * strength;
                b.target_direction -= away * strength;
            }
        }
    }

    for pass in 0..COLLISION_PASSES {
        let mut moved = false;
        for i in 0..n {
            for j in (i + 1)..n {
                let (head, tail) = blobs.split_at_mut(j);
                let (a, b) = (&mut head[i], &mut tail[0]);
                let min = a.collision_radius() + b.collision_radius() + COLLISION_BUFFER;
                let delta = a.position - b.position;
                let distance = delta.length();
                if distance >= min {
                    continue;
                }
                // Coincident centres get a fixed, index-derived normal.
                let normal = delta
                    .try_normalize()
                    .unwrap_or_else(|| Vec3::new((i as f32 + j as f32).cos(), 0.0, (i as f32 + j as f32).sin()));
                let push = (min - distance) * 0.5;
                a.position += normal * push;
                b.position -= normal * push;
                if pass == 0 {
                    a.target_direction = bounce(a.target_direction, normal);
                    b.target_direction = bounce(b.target_direction, -normal);
                }
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}

/// Rebuilds the live mesh from the untouched baseline.
pub fn deform(blob: &mut BlobEntity, time: f32, jiggle: f32) {
    let speed = blob.motion.jelly_speed;
    let amount = blob.motion.jelly_intensity * jiggle;
    let t = time + blob.phases.jelly;
    blob.rebuild_live_vertices(|o| {
        Vec3::new(
            (t * speed + o.y * 2.0).sin() * amount * 0.6,
            (t * speed * 1.3 + o.z * 2.0).sin() * amount * 0.4,
            (t * speed * 0.8 + o.x * 2.0).sin() * amount * 0.3,
        )
    });
}

pub fn update_heading<R: Rng>(blob: &mut BlobEntity, controls: &BlobControls, rng: &mut R) {
    if rng.gen::<f32>() < RETARGET_CHANCE * controls.random_direction_factor {
        blob.target_direction = random_heading(rng);
    }
    if blob.target_direction.length() < MIN_HEADING {
        blob.target_direction = match blob.target_direction.try_normalize() {
            Some(dir) => dir * MIN_HEADING,
            None => random_heading(rng),
        };
    }
    blob.target_direction = blob.target_direction.clamp_length_max(1.0);
    blob.current_direction = blob.current_direction.lerp(blob.target_direction, HEADING_LERP);
}

pub fn translate(blob: &mut BlobEntity, ctx: &StepContext) {
    if blob.is_emerging {
        return;
    }
    let m = &blob.motion;
    let swim = (ctx.time * m.swim_speed + blob.phases.swim).sin();
    blob.position += blob.current_direction * m.swim_amplitude * swim * ctx.dt * ctx.controls.movement_speed;
}

/// Faces first, then the cylinder wall, then the floor and ceiling, so the
/// volume clamp always has the final word.
pub fn contain(blob: &mut BlobEntity, volume: &PlayVolume, faces: &[StructureFace]) {
    let radius = blob.collision_radius();
    for face in faces {
        let min = face.clearance_radius + radius;
        let delta = blob.position - face.position;
        let distance = delta.length();
        if distance < min {
            let normal = delta.try_normalize().unwrap_or(-face.normal());
            blob.position = face.position + normal * min;
            blob.target_direction = bounce(blob.target_direction, normal);
        }
    }

    let limit = volume.horizontal_limit(radius);
    let horizontal = Vec2::new(blob.position.x, blob.position.z);
    let distance = horizontal.length();
    if distance > limit {
        let outward = horizontal / distance;
        let clamped = outward * limit;
        blob.position.x = clamped.x;
        blob.position.z = clamped.y;
        let wall = -Vec3::new(outward.x, 0.0, outward.y);
        blob.target_direction = bounce(blob.target_direction, wall);
        blob.current_direction = bounce(blob.current_direction, wall);
    }

    let floor = if blob.is_emerging { volume.emergence_floor_y } else { volume.floor_y };
    if blob.position.y < floor {
        blob.position.y = floor;
        blob.target_direction = bounce(blob.target_direction, Vec3::Y);
        blob.current_direction = bounce(blob.current_direction, Vec3::Y);
    } else if blob.position.y > volume.ceiling_y {
        blob.position.y = volume.ceiling_y;
        blob.target_direction = bounce(blob.target_direction, Vec3::NEG_Y);
        blob.current_direction = bounce(blob.current_direction, Vec3::NEG_Y);
    }
}

pub fn glow(motion: &BlobMotion, pulse_time: f32) -> f32 {
    (motion.pulse_intensity + pulse_time.sin() * 0.2 + (pulse_time * 1.618).sin() * 0.15).max(0.15)
}

fn animate<R: Rng>(blob: &mut BlobEntity, index: usize, ctx: &StepContext, rng: &mut R) {
    let m = blob.motion;
    let t = ctx.time;

    let squish_time = t * m.squish_speed + blob.phases.squish;
    let mood = 0.5 + m.happiness * 0.5;
    let wide = 1.0 + squish_time.sin() * m.squishiness * mood;
    let tall = 1.0 + (squish_time * 1.2).sin() * m.squishiness * 0.8 * mood;
    blob.scale = Vec3::new(wide, tall, wide);

    blob.rotation.y = (blob.rotation.y + m.rotation_speed * ctx.controls.rotation_speed * ctx.dt).rem_euclid(TAU);
    blob.rotation.x = (t * 0.2 + blob.phases.swim).sin() * 0.08;

    let pulse_time = t * m.pulse_speed + blob.phases.pulse;
    blob.glow = glow(&m, pulse_time);

    let wobble = (t * m.jelly_speed * 0.6).sin() * m.jelly_intensity * 0.08;
    let look = (t * 0.7 + blob.phases.pulse).sin() * blob.base_radius() * 0.05;
    blob.eyes[0].offset.x = blob.eyes[0].rest_offset.x + wobble + look;
    blob.eyes[1].offset.x = blob.eyes[1].rest_offset.x + wobble - look;

    advance_blink(blob, index, ctx.dt, rng);
}

pub fn advance_blink<R: Rng>(blob: &mut BlobEntity, index: usize, dt: f32, rng: &mut R) {
    blob.blink = match blob.blink {
        BlinkState::Open { timer } if timer - dt > 0.0 => BlinkState::Open { timer: timer - dt },
        BlinkState::Open { .. } => {
            let left = rng.gen_range(0.08..0.18) + blob.motion.happiness * 0.03;
            BlinkState::Closed { left, right: left + rng.gen_range(0.01..0.03), depth: rng.gen_range(0.05..0.15) }
        }
        BlinkState::Closed { left, right, .. } if right - dt <= 0.0 && left - dt <= 0.0 => BlinkState::Open {
            timer: rng.gen_range(1.5..6.5) + blob.motion.happiness + (index % 10) as f32 * 0.3,
        },
        BlinkState::Closed { left, right, depth } => BlinkState::Closed { left: left - dt, right: right - dt, depth },
    };
    let (left, right) = match blob.blink {
        BlinkState::Open { .. } => (1.0, 1.0),
        BlinkState::Closed { left, right, depth } => {
            (if left > 0.0 { depth } else { 1.0 }, if right > 0.0 { depth } else { 1.0 })
        }
    };
    blob.eyes[0].scale_y = left;
    blob.eyes[1].scale_y = right;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::{SceneConfig, ThemePreset};
    use crate::engine_lib::structure::build_structure;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        theme: Theme,
        faces: Vec<StructureFace>,
        blobs: Vec<BlobEntity>,
        rng: StdRng,
    }

    fn fixture(preset: ThemePreset, seed: u64) -> Fixture {
        let theme = SceneConfig { theme: preset, ..Default::default() }.theme();
        let mut meshes = Vec::new();
        let structure = build_structure(&theme.structure, &mut meshes);
        let mut rng = StdRng::seed_from_u64(seed);
        let population = spawn_population(&theme, &structure.faces, &mut meshes, &mut rng);
        Fixture { theme, faces: structure.faces, blobs: population.blobs, rng }
    }

    fn run(f: &mut Fixture, frames: usize, controls: &BlobControls) {
        for frame in 0..frames {
            let ctx = StepContext {
                volume: &f.theme.volume,
                faces: &f.faces,
                controls,
                time: frame as f32 / 60.0,
                dt: 1.0 / 60.0,
            };
            step(&mut f.blobs, &ctx, &mut f.rng);
        }
    }

    #[test]
    fn population_matches_theme_and_keeps_collision_margin() {
        let f = fixture(ThemePreset::Default, 1);
        assert_eq!(f.blobs.len(), 13);
        for blob in &f.blobs {
            assert!((blob.collision_radius() - blob.base_radius() * COLLISION_SCALE).abs() < 1e-6);
            assert_eq!(blob.live_vertices.len(), blob.original_vertices().len());
        }
        let large = f.blobs.iter().filter(|b| b.class == BlobClass::Large).count();
        assert_eq!(large, 1);
    }

    #[test]
    fn blob_count_override_cycles_classes() {
        let theme = SceneConfig { blob_count: Some(20), seed: Some(2), ..Default::default() }.theme();
        let mut meshes = Vec::new();
        let structure = build_structure(&theme.structure, &mut meshes);
        let mut rng = StdRng::seed_from_u64(2);
        let population = spawn_population(&theme, &structure.faces, &mut meshes, &mut rng);
        assert_eq!(population.blobs.len(), 20);
        assert!(population.blobs.iter().all(|b| meshes[b.mesh.0].dynamic));
    }

    #[test]
    fn containment_holds_every_frame() {
        let mut f = fixture(ThemePreset::Cinematic, 7);
        let controls = BlobControls { movement_speed: 3.0, ..Default::default() };
        for frame in 0..600 {
            let ctx = StepContext {
                volume: &f.theme.volume,
                faces: &f.faces,
                controls: &controls,
                time: frame as f32 / 60.0,
                dt: 1.0 / 60.0,
            };
            step(&mut f.blobs, &ctx, &mut f.rng);
            for blob in &f.blobs {
                assert!(
                    f.theme.volume.contains(blob.position, blob.collision_radius(), blob.is_emerging, 1e-4),
                    "frame {frame}: {:?}",
                    blob.position
                );
            }
        }
    }

    #[test]
    fn blobs_never_enter_face_clearance() {
        for preset in [ThemePreset::Default, ThemePreset::Clean, ThemePreset::Cinematic] {
            for seed in 0..5 {
                let mut f = fixture(preset, seed);
                let controls = BlobControls { movement_speed: 2.0, ..Default::default() };
                for frame in 0..300 {
                    let ctx = StepContext {
                        volume: &f.theme.volume,
                        faces: &f.faces,
                        controls: &controls,
                        time: frame as f32 / 60.0,
                        dt: 1.0 / 60.0,
                    };
                    step(&mut f.blobs, &ctx, &mut f.rng);
                    for blob in &f.blobs {
                        for face in &f.faces {
                            let min = face.clearance_radius + blob.collision_radius();
                            assert!(
                                blob.position.distance(face.position) >= min - 1e-3,
                                "{preset:?} seed {seed} frame {frame}: face {} too close",
                                face.index
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn blob_inside_face_clearance_is_pushed_out_and_turned_back() {
        let mut f = fixture(ThemePreset::Default, 3);
        let face = f.faces[0].clone();
        let blob = &mut f.blobs[0];
        blob.is_emerging = false;
        blob.position = face.position - face.normal() * 0.5;
        blob.target_direction = face.normal();

        contain(blob, &f.theme.volume, &f.faces);

        let min = face.clearance_radius + blob.collision_radius();
        assert!(blob.position.distance(face.position) >= min - 1e-4);
        assert!(blob.target_direction.dot(face.normal()) < 0.0);
        assert!((blob.target_direction.length() - BOUNCE_DAMPING).abs() < 1e-4);
    }

    #[test]
    fn emerging_blobs_rise_and_settle() {
        let mut f = fixture(ThemePreset::Default, 11);
        for blob in f.blobs.iter_mut().take(3) {
            blob.is_emerging = true;
            blob.position.y = f.theme.volume.emergence_floor_y;
        }
        run(&mut f, 60 * 10, &BlobControls::default());
        assert!(f.blobs.iter().all(|b| !b.is_emerging));
        assert!(f.blobs.iter().all(|b| b.position.y >= f.theme.volume.floor_y - 1e-4));
    }

    #[test]
    fn collision_pass_separates_overlapping_pairs() {
        let mut f = fixture(ThemePreset::Default, 3);
        let mut blobs: Vec<BlobEntity> = f.blobs.drain(..3).collect();
        blobs[0].position = Vec3::new(0.0, 0.3, 0.0);
        blobs[1].position = Vec3::new(0.1, 0.3, 0.0);
        // Coincident with blob 0.
        blobs[2].position = Vec3::new(0.0, 0.3, 0.0);
        resolve_collisions(&mut blobs, 0.0);
        for i in 0..blobs.len() {
            for j in (i + 1)..blobs.len() {
                let d = blobs[i].position.distance(blobs[j].position);
                let min = blobs[i].collision_radius() + blobs[j].collision_radius();
                assert!(d >= min - 1e-3, "pair ({i},{j}) at {d} < {min}");
            }
        }
    }

    #[test]
    fn head_on_collision_reflects_and_damps_heading() {
        let mut f = fixture(ThemePreset::Default, 5);
        let mut pair: Vec<BlobEntity> = f.blobs.drain(..2).collect();
        pair[0].position = Vec3::new(-0.1, 0.0, 0.0);
        pair[1].position = Vec3::new(0.1, 0.0, 0.0);
        pair[0].target_direction = Vec3::X;
        pair[1].target_direction = Vec3::NEG_X;
        resolve_collisions(&mut pair, 0.0);
        assert!(pair[0].target_direction.x < 0.0);
        assert!((pair[0].target_direction.length() - BOUNCE_DAMPING).abs() < 1e-5);
        assert!(pair[1].target_direction.x > 0.0);
    }

    #[test]
    fn baseline_never_changes() {
        let mut f = fixture(ThemePreset::Default, 9);
        let before: Vec<Vec<Vec3>> = f.blobs.iter().map(|b| b.original_vertices().to_vec()).collect();
        let radii: Vec<f32> = f.blobs.iter().map(|b| b.base_radius()).collect();
        run(&mut f, 120, &BlobControls::default());
        for ((blob, verts), radius) in f.blobs.iter().zip(&before).zip(&radii) {
            assert_eq!(blob.original_vertices(), verts.as_slice());
            assert_eq!(blob.base_radius(), *radius);
            assert!(blob.geometry_dirty);
        }
    }

    #[test]
    fn blink_closes_then_reopens_right_eye_last() {
        let mut f = fixture(ThemePreset::Default, 4);
        let blob = &mut f.blobs[0];
        blob.blink = BlinkState::Open { timer: 0.0 };
        advance_blink(blob, 0, 0.001, &mut f.rng);
        let BlinkState::Closed { left, right, depth } = blob.blink else {
            panic!("expected a blink to start");
        };
        assert!(right > left);
        assert_eq!(blob.eyes[0].scale_y, depth);
        advance_blink(blob, 0, left + 0.001, &mut f.rng);
        assert_eq!(blob.eyes[0].scale_y, 1.0);
        assert_eq!(blob.eyes[1].scale_y, depth);
        advance_blink(blob, 0, 0.05, &mut f.rng);
        assert!(matches!(blob.blink, BlinkState::Open { .. }));
        assert_eq!(blob.eyes[1].scale_y, 1.0);
    }

    #[test]
    fn glow_never_drops_below_floor() {
        let motion = BlobMotion { pulse_intensity: 0.0, ..class_motion(BlobClass::Small, &mut StdRng::seed_from_u64(0)) };
        for i in 0..1000 {
            assert!(glow(&motion, i as f32 * 0.013) >= 0.15);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn deformation_stays_bounded(time in 0.0f32..10_000.0, jiggle in 0.0f32..BlobControls::MAX_JIGGLE) {
            let mut f = fixture(ThemePreset::Default, 12);
            let blob = &mut f.blobs[0];
            deform(blob, time, jiggle);
            let bound = blob.motion.jelly_intensity * jiggle * JELLY_BOUND + 1e-5;
            for (live, original) in blob.live_vertices.iter().zip(blob.original_vertices()) {
                prop_assert!(live.distance(*original) <= bound);
            }
        }

        #[test]
        fn containment_survives_random_seeds(seed in 0u64..500, speed in 0.0f32..3.0) {
            let mut f = fixture(ThemePreset::Clean, seed);
            let controls = BlobControls { movement_speed: speed, ..Default::default() };
            run(&mut f, 90, &controls);
            for blob in &f.blobs {
                prop_assert!(f.theme.volume.contains(blob.position, blob.collision_radius(), blob.is_emerging, 1e-4));
                prop_assert!(blob.position.is_finite());
            }
        }
    }
}
