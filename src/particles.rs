//! Particle Trail Engine
//!
//! An ambient effect: pointer movement spawns a few short-lived particles
//! that drift, shrink and fade. The engine is stepped once per animation
//! frame for the lifetime of the page, independently of stroke recording, so
//! toggling trail mode only gates spawning.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::color::Rgba8;
use crate::geometry::Point;
use crate::surface::OverlaySurface;

/// Particles added per pointer move
pub const SPAWN_COUNT: usize = 3;
/// Per-frame multiplicative shrink
pub const SHRINK: f32 = 0.96;
/// Alpha of the per-frame fade applied to the whole particle surface
pub const FADE_ALPHA: f32 = 0.12;

const MAX_SPEED: f32 = 1.5;
const SIZE_RANGE: (f32, f32) = (2.0, 6.0);
const LIFE_RANGE: (u32, u32) = (30, 60);

/// One live particle
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Radius in pixels
    pub size: f32,
    /// Frames left to live
    pub life: u32,
    /// Initial life, for the alpha ramp
    pub max_life: u32,
    pub color: Rgba8,
}

impl Particle {
    pub fn new(position: Point, velocity: (f32, f32), size: f32, life: u32, color: Rgba8) -> Self {
        Self {
            x: position.x,
            y: position.y,
            vx: velocity.0,
            vy: velocity.1,
            size,
            life,
            max_life: life,
            color,
        }
    }

    /// Remaining life as a 0.0-1.0 alpha
    pub fn alpha(&self) -> f32 {
        if self.max_life == 0 {
            return 0.0;
        }
        self.life as f32 / self.max_life as f32
    }
}

pub struct ParticleEngine {
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Spawn a small burst at a pointer position
    pub fn spawn(&mut self, at: Point) {
        for _ in 0..SPAWN_COUNT {
            let velocity = (
                self.rng.gen_range(-MAX_SPEED..=MAX_SPEED),
                self.rng.gen_range(-MAX_SPEED..=MAX_SPEED),
            );
            let size = self.rng.gen_range(SIZE_RANGE.0..=SIZE_RANGE.1);
            let life = self.rng.gen_range(LIFE_RANGE.0..=LIFE_RANGE.1);
            // Soft blue/purple tint
            let color = Rgba8::rgb(
                self.rng.gen_range(100..=200),
                self.rng.gen_range(100..=200),
                self.rng.gen_range(155..=255),
            );
            self.particles.push(Particle::new(at, velocity, size, life, color));
        }
    }

    /// Add a particle as-is
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Advance one frame and paint the survivors
    pub fn step<S: OverlaySurface + ?Sized>(&mut self, surface: &mut S) {
        surface.fade(FADE_ALPHA);

        self.particles.retain_mut(|p| {
            p.life = p.life.saturating_sub(1);
            if p.life == 0 {
                return false;
            }
            p.x += p.vx;
            p.y += p.vy;
            p.size *= SHRINK;
            surface.fill_circle(Point::new(p.x, p.y), p.size, p.color, p.alpha());
            true
        });
    }

    /// Drop every live particle
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SurfaceSize;
    use crate::surface::{DrawCommand, RecordingSurface};

    fn surface() -> RecordingSurface {
        RecordingSurface::new(SurfaceSize::new(100, 100))
    }

    #[test]
    fn particle_dies_after_its_life_in_frames() {
        let mut engine = ParticleEngine::new(7);
        engine.push(Particle::new(Point::new(0.0, 0.0), (1.0, 0.0), 4.0, 3, Rgba8::rgb(1, 2, 3)));
        let mut surface = surface();

        engine.step(&mut surface);
        assert_eq!(engine.particles()[0].life, 2);
        engine.step(&mut surface);
        assert_eq!(engine.particles()[0].life, 1);
        engine.step(&mut surface);
        assert!(engine.is_empty());
    }

    #[test]
    fn step_moves_shrinks_and_fades() {
        let mut engine = ParticleEngine::new(7);
        engine.push(Particle::new(Point::new(10.0, 10.0), (1.0, -2.0), 5.0, 10, Rgba8::rgb(1, 2, 3)));
        let mut surface = surface();
        engine.step(&mut surface);

        let p = &engine.particles()[0];
        assert_eq!((p.x, p.y), (11.0, 8.0));
        assert!((p.size - 5.0 * SHRINK).abs() < 1e-6);

        let commands = surface.commands();
        assert_eq!(commands[0], DrawCommand::Fade { alpha: FADE_ALPHA });
        match &commands[1] {
            DrawCommand::Circle { center, alpha, .. } => {
                assert_eq!(*center, Point::new(11.0, 8.0));
                assert!((alpha - 0.9).abs() < 1e-6);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn spawn_stays_within_ranges() {
        let mut engine = ParticleEngine::new(42);
        engine.spawn(Point::new(50.0, 60.0));
        assert_eq!(engine.len(), SPAWN_COUNT);
        for p in engine.particles() {
            assert_eq!((p.x, p.y), (50.0, 60.0));
            assert!(p.vx.abs() <= MAX_SPEED && p.vy.abs() <= MAX_SPEED);
            assert!((SIZE_RANGE.0..=SIZE_RANGE.1).contains(&p.size));
            assert!((LIFE_RANGE.0..=LIFE_RANGE.1).contains(&p.life));
            assert_eq!(p.life, p.max_life);
        }
    }

    #[test]
    fn same_seed_same_particles() {
        let mut a = ParticleEngine::new(9);
        let mut b = ParticleEngine::new(9);
        a.spawn(Point::new(1.0, 1.0));
        b.spawn(Point::new(1.0, 1.0));
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn empty_engine_still_fades() {
        let mut engine = ParticleEngine::new(1);
        let mut surface = surface();
        engine.step(&mut surface);
        assert_eq!(surface.commands(), &[DrawCommand::Fade { alpha: FADE_ALPHA }]);
    }
}
