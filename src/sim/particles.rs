//! Visual particle effects
//!
//! Particles are purely cosmetic: they never feed back into gameplay, so the
//! system is free to drop spawns once it is at capacity.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_BURST, PARTICLE_ALPHA, PARTICLE_DRAG};
use crate::renderer::{Color, Painter, palette};

/// Whether a particle celebrates something or marks a hazard (color only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valence {
    Good,
    Bad,
}

impl Valence {
    pub fn color(&self) -> Color {
        match self {
            Valence::Good => palette::GOOD_PARTICLE,
            Valence::Bad => palette::BAD_PARTICLE,
        }
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds since spawn
    pub age: f32,
    /// Seconds until removal
    pub lifetime: f32,
    pub radius: f32,
    pub valence: Valence,
}

impl Particle {
    /// Remaining life in [0, 1]
    pub fn remaining(&self) -> f32 {
        if self.lifetime <= 0.0 {
            0.0
        } else {
            (1.0 - self.age / self.lifetime).clamp(0.0, 1.0)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }
}

/// Lifetime range of spawned particles: `min + random * spread` seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub min: f32,
    pub spread: f32,
}

impl Lifetime {
    pub const fn fixed(seconds: f32) -> Self {
        Self {
            min: seconds,
            spread: 0.0,
        }
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self {
            min: 0.35,
            spread: 0.55,
        }
    }
}

/// Per-instance particle collection
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    capacity: usize,
    lifetime: Lifetime,
    /// Downward acceleration (px/s²); zero for floating sparks
    gravity: f32,
}

impl ParticleSystem {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity.min(256)),
            capacity,
            lifetime: Lifetime::default(),
            gravity: 0.0,
        }
    }

    pub fn set_lifetime(&mut self, lifetime: Lifetime) {
        self.lifetime = lifetime;
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Emit up to `count` particles at `pos`, flying in random directions at
    /// up to `power` px/s. Returns how many were actually created.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        pos: Vec2,
        count: usize,
        power: f32,
        valence: Valence,
    ) -> usize {
        let room = self.capacity.saturating_sub(self.particles.len());
        let n = count.min(MAX_BURST).min(room);
        let power = power.max(0.0);

        for _ in 0..n {
            let angle = rng.random::<f32>() * TAU;
            let speed = rng.random::<f32>() * power;
            self.particles.push(Particle {
                pos,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                age: 0.0,
                lifetime: self.lifetime.min + rng.random::<f32>() * self.lifetime.spread,
                radius: 2.0 + rng.random::<f32>() * 3.0,
                valence,
            });
        }
        n
    }

    /// Advance every particle by `dt` seconds and drop the expired ones
    pub fn integrate(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let drag = PARTICLE_DRAG.powf(dt * 60.0);
        let gravity = Vec2::new(0.0, self.gravity);

        for p in self.particles.iter_mut() {
            p.vel += gravity * dt;
            p.pos += p.vel * dt;
            p.vel *= drag;
            p.age += dt;
        }
        self.particles.retain(|p| !p.is_expired());
    }

    /// Draw remaining particles, fading with remaining life
    pub fn render(&self, painter: &mut dyn Painter) {
        for p in &self.particles {
            let color = p.valence.color().with_alpha(PARTICLE_ALPHA * p.remaining());
            painter.fill_circle(p.pos, p.radius, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{DisplayList, DrawCmd};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_spawn_count_and_speed() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut ps = ParticleSystem::new(500);
        let n = ps.spawn(&mut rng, Vec2::new(10.0, 10.0), 20, 300.0, Valence::Good);
        assert_eq!(n, 20);
        assert_eq!(ps.len(), 20);
        for p in ps.iter() {
            assert!(p.vel.length() <= 300.0 + 1e-3);
            assert_eq!(p.pos, Vec2::new(10.0, 10.0));
            assert!((2.0..=5.0).contains(&p.radius));
        }
    }

    #[test]
    fn test_burst_and_capacity_caps() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut ps = ParticleSystem::new(100);
        assert_eq!(ps.spawn(&mut rng, Vec2::ZERO, 10_000, 100.0, Valence::Bad), MAX_BURST);
        assert_eq!(ps.spawn(&mut rng, Vec2::ZERO, 64, 100.0, Valence::Bad), 100 - MAX_BURST);
        assert_eq!(ps.spawn(&mut rng, Vec2::ZERO, 5, 100.0, Valence::Bad), 0);
        assert_eq!(ps.len(), 100);
    }

    #[test]
    fn test_zero_capacity_spawns_nothing() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut ps = ParticleSystem::new(0);
        assert_eq!(ps.spawn(&mut rng, Vec2::ZERO, 10, 100.0, Valence::Good), 0);
    }

    #[test]
    fn test_drag_slows_particles() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ps = ParticleSystem::new(10);
        ps.set_lifetime(Lifetime::fixed(10.0));
        ps.spawn(&mut rng, Vec2::ZERO, 1, 200.0, Valence::Good);
        let before = ps.iter().next().unwrap().vel.length();
        ps.integrate(1.0 / 60.0);
        let after = ps.iter().next().unwrap().vel.length();
        assert!((after - before * PARTICLE_DRAG).abs() < 1e-3);
    }

    #[test]
    fn test_gravity_pulls_down() {
        let mut ps = ParticleSystem::new(10);
        ps.set_gravity(1200.0);
        ps.set_lifetime(Lifetime::fixed(5.0));
        let mut rng = Pcg32::seed_from_u64(3);
        ps.spawn(&mut rng, Vec2::ZERO, 1, 0.0, Valence::Good);
        ps.integrate(0.1);
        assert!(ps.iter().next().unwrap().vel.y > 0.0);
    }

    #[test]
    fn test_render_fades_with_age() {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut ps = ParticleSystem::new(10);
        ps.set_lifetime(Lifetime::fixed(1.0));
        ps.spawn(&mut rng, Vec2::ZERO, 1, 0.0, Valence::Bad);

        let mut fresh = DisplayList::new();
        ps.render(&mut fresh);
        ps.integrate(0.5);
        let mut aged = DisplayList::new();
        ps.render(&mut aged);

        let alpha = |list: &DisplayList| match &list.cmds[0] {
            DrawCmd::Circle { color, .. } => color.a,
            other => panic!("unexpected {other:?}"),
        };
        assert!((alpha(&fresh) - PARTICLE_ALPHA).abs() < 1e-4);
        assert!((alpha(&aged) - PARTICLE_ALPHA * 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut ps = ParticleSystem::new(10);
        ps.spawn(&mut rng, Vec2::ZERO, 3, 50.0, Valence::Good);
        ps.integrate(-1.0);
        assert!(ps.iter().all(|p| p.age == 0.0));
    }

    proptest! {
        #[test]
        fn particles_never_outlive_lifetime(
            n in 1usize..200,
            lifetime in 0.05f32..2.0,
            step in 0.001f32..0.033,
            seed in any::<u64>(),
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut ps = ParticleSystem::new(2000);
            ps.set_lifetime(Lifetime::fixed(lifetime));
            let mut left = n;
            while left > 0 {
                left -= ps.spawn(&mut rng, Vec2::ZERO, left, 400.0, Valence::Good);
            }

            let mut elapsed = 0.0;
            while elapsed <= lifetime {
                ps.integrate(step);
                elapsed += step;
                prop_assert!(ps.iter().all(|p| p.age < p.lifetime));
            }
            ps.integrate(step);
            prop_assert!(ps.is_empty());
        }
    }
}
