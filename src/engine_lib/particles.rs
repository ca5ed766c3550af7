// src/engine_lib/particles.rs
//
// Ambient point field plus the optional decorative layers. Colours are fixed
// at creation; only positions, spin and per-layer alpha move.

use glam::Vec3;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::f32::consts::TAU;

use crate::engine_lib::config::ParticleStyle;
use crate::engine_lib::scene_types::{PointCloud, PointCloudKind, PointSprite};

/// Velocity kept after an elastic wall bounce.
pub const WALL_RESTITUTION: f32 = 0.85;
/// Per-frame velocity scale.
pub const FLOW: f32 = 0.9;
const DRIFT: f32 = 0.0008;

fn pick_color<R: Rng>(style: &ParticleStyle, rng: &mut R) -> Vec3 {
    let weights: Vec<f32> = style.palette.iter().map(|(_, w)| w.max(0.0)).collect();
    let base = match WeightedIndex::new(&weights) {
        Ok(dist) => style.palette[dist.sample(rng)].0,
        Err(_) => Vec3::ONE,
    };
    let mix = if style.white_mix > 0.0 { rng.gen_range(0.0..style.white_mix) } else { 0.0 };
    let brightness = if style.brightness.1 > style.brightness.0 {
        rng.gen_range(style.brightness.0..style.brightness.1)
    } else {
        style.brightness.0
    };
    base.lerp(Vec3::ONE, mix) * brightness
}

pub fn spawn_ambient<R: Rng>(style: &ParticleStyle, rng: &mut R) -> PointCloud {
    let v = style.max_velocity;
    let points = (0..style.count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let radius = rng.gen::<f32>() * style.spawn_radius;
            let position = Vec3::new(
                angle.cos() * radius,
                (rng.gen::<f32>() - 0.5) * style.spawn_height,
                angle.sin() * radius,
            )
            .clamp(-style.bounds, style.bounds);
            PointSprite {
                position,
                velocity: Vec3::new(rng.gen_range(-v..=v), rng.gen_range(-v..=v), rng.gen_range(-v..=v)),
                size: rng.gen_range(style.size.0..=style.size.1),
                color: pick_color(style, rng).extend(1.0),
                phase: rng.gen_range(0.0..TAU),
                speed: 1.0,
                anchor: position,
            }
        })
        .collect();
    PointCloud { kind: PointCloudKind::Ambient, points, rotation_y: 0.0, dirty: true }
}

/// Point on a spherical shell between the two radii.
fn shell_point<R: Rng>(rng: &mut R, inner: f32, outer: f32) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let phi = (rng.gen_range(-1.0f32..1.0)).acos();
    let r = rng.gen_range(inner..outer);
    Vec3::new(r * phi.sin() * theta.cos(), r * phi.cos(), r * phi.sin() * theta.sin())
}

pub fn spawn_decor<R: Rng>(kind: PointCloudKind, rng: &mut R) -> PointCloud {
    let (count, inner, outer, size, color): (usize, f32, f32, (f32, f32), Vec3) = match kind {
        PointCloudKind::Dust => (100, 30.0, 80.0, (0.5, 1.5), Vec3::new(0.6, 0.7, 0.9)),
        PointCloudKind::Stars => (200, 80.0, 200.0, (1.0, 2.5), Vec3::ONE),
        PointCloudKind::Orbs => (15, 8.0, 25.0, (3.0, 6.0), Vec3::new(0.3, 0.8, 1.0)),
        PointCloudKind::Ambient => (0, 0.0, 1.0, (1.0, 1.0), Vec3::ONE),
    };
    let points = (0..count)
        .map(|_| {
            let position = shell_point(rng, inner, outer);
            PointSprite {
                position,
                velocity: Vec3::ZERO,
                size: rng.gen_range(size.0..size.1),
                color: (color * rng.gen_range(0.7..1.0)).extend(1.0),
                phase: rng.gen_range(0.0..TAU),
                speed: rng.gen_range(0.2..0.8),
                anchor: position,
            }
        })
        .collect();
    PointCloud { kind, points, rotation_y: 0.0, dirty: true }
}

/// One frame of the ambient field. A point whose next step would leave the
/// box has the offending velocity component reversed before it moves.
pub fn update_ambient(cloud: &mut PointCloud, style: &ParticleStyle, time: f32, dt: f32) {
    let bounds = style.bounds;
    for (i, p) in cloud.points.iter_mut().enumerate() {
        let drift = Vec3::new(0.0, (time * 1.2 + i as f32 * 0.06).sin() * DRIFT, 0.0);
        let next = p.position + p.velocity * FLOW + drift;
        for axis in 0..3 {
            if next[axis].abs() > bounds[axis] && next[axis].signum() == p.velocity[axis].signum() {
                p.velocity[axis] = -p.velocity[axis] * WALL_RESTITUTION;
            }
        }
        p.position += p.velocity * FLOW + drift;
    }
    cloud.rotation_y = (cloud.rotation_y + style.spin * dt).rem_euclid(TAU);
    cloud.dirty = true;
}

pub fn update_decor(cloud: &mut PointCloud, time: f32, dt: f32) {
    for p in cloud.points.iter_mut() {
        let wave = (time * p.speed + p.phase).sin();
        match cloud.kind {
            PointCloudKind::Dust => {
                p.position.y = p.anchor.y + wave * 2.0;
                p.color.w = 0.3 + 0.3 * (time * p.speed * 0.5 + p.phase).sin().abs();
            }
            PointCloudKind::Stars => {
                p.color.w = 0.5 + 0.5 * (time * p.speed * 3.0 + p.phase).sin();
            }
            PointCloudKind::Orbs => {
                p.position = p.anchor + Vec3::new((time * p.speed * 0.5 + p.phase).cos() * 0.5, wave * 1.5, 0.0);
                p.color.w = 0.6 + 0.2 * wave;
            }
            PointCloudKind::Ambient => {}
        }
    }
    if cloud.kind == PointCloudKind::Stars {
        cloud.rotation_y = (cloud.rotation_y + 0.002 * dt).rem_euclid(TAU);
    }
    cloud.dirty = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::{SceneConfig, ThemePreset};
    use glam::Vec4;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn style() -> ParticleStyle {
        SceneConfig::default().theme().particles
    }

    #[test]
    fn wall_bounce_inverts_velocity_instead_of_clamping() {
        let style = style();
        let mut cloud = PointCloud {
            kind: PointCloudKind::Ambient,
            points: vec![PointSprite {
                position: Vec3::new(5.99, 0.0, 0.0),
                velocity: Vec3::new(0.02, 0.0, 0.0),
                size: 1.0,
                color: Vec4::ONE,
                phase: 0.0,
                speed: 1.0,
                anchor: Vec3::ZERO,
            }],
            rotation_y: 0.0,
            dirty: false,
        };
        update_ambient(&mut cloud, &style, 0.0, 1.0 / 60.0);
        let p = cloud.points[0];
        assert!(p.velocity.x < 0.0);
        assert!((p.velocity.x + 0.02 * WALL_RESTITUTION).abs() < 1e-6);
        assert!((p.position.x - (5.99 - 0.02 * WALL_RESTITUTION * FLOW)).abs() < 1e-5);
    }

    #[test]
    fn ambient_field_stays_near_box_and_keeps_colour() {
        let style = style();
        let mut rng = StdRng::seed_from_u64(8);
        let mut cloud = spawn_ambient(&style, &mut rng);
        assert_eq!(cloud.len(), 120);
        let colors: Vec<Vec4> = cloud.points.iter().map(|p| p.color).collect();
        for frame in 0..5_000 {
            update_ambient(&mut cloud, &style, frame as f32 / 60.0, 1.0 / 60.0);
        }
        assert_eq!(cloud.len(), 120);
        // Drift can carry a slowed point a few hundredths past the wall.
        let slack = Vec3::splat(0.1);
        for (p, c) in cloud.points.iter().zip(colors) {
            assert!(p.position.abs().cmple(style.bounds + slack).all(), "{:?}", p.position);
            assert_eq!(p.color, c);
        }
    }

    #[test]
    fn palette_colours_are_scaled_palette_entries() {
        let style = SceneConfig { theme: ThemePreset::Default, ..Default::default() }.theme().particles;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let c = pick_color(&style, &mut rng);
            let matched = style.palette.iter().any(|(base, _)| {
                let k = c.max_element() / base.max_element();
                (0.6 - 1e-4..=1.0 + 1e-4).contains(&k) && (*base * k).abs_diff_eq(c, 1e-4)
            });
            assert!(matched, "{c:?}");
        }
    }

    #[test]
    fn decor_layers_have_documented_sizes() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(spawn_decor(PointCloudKind::Dust, &mut rng).len(), 100);
        assert_eq!(spawn_decor(PointCloudKind::Stars, &mut rng).len(), 200);
        let mut orbs = spawn_decor(PointCloudKind::Orbs, &mut rng);
        assert_eq!(orbs.len(), 15);
        update_decor(&mut orbs, 3.0, 1.0 / 60.0);
        assert!(orbs.points.iter().all(|p| p.position.distance(p.anchor) <= 1.6 + 1e-4));
    }
}
