use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

const SYMBOLS: [char; 6] = ['*', '+', '✦', '•', '✧', '◆'];
const BANNERS: [&str; 4] = ["YOU WIN!", "VICTORY!", "BRAVO!", "WELL PLAYED!"];
const GRAVITY: f64 = 12.0;

/// A single piece of confetti
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    /// Banner letters glide to a fixed spot instead of falling.
    pub anchored: bool,
    pub target_x: f64,
    pub target_y: f64,
}

impl Particle {
    fn burst<R: Rng + ?Sized>(x: f64, y: f64, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: *SYMBOLS.choose(rng).unwrap_or(&'*'),
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(1.5..3.0),
            anchored: false,
            target_x: x,
            target_y: y,
        }
    }

    fn letter<R: Rng + ?Sized>(
        from: (f64, f64),
        to: (f64, f64),
        symbol: char,
        rng: &mut R,
    ) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: to.0 - from.0,
            vel_y: to.1 - from.1,
            symbol,
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(2.5..3.5),
            anchored: true,
            target_x: to.0,
            target_y: to.1,
        }
    }

    /// Move by `dt` seconds. Returns false once the particle has burnt out.
    fn update(&mut self, dt: f64) -> bool {
        if self.anchored {
            let dist = ((self.target_x - self.x).powi(2) + (self.target_y - self.y).powi(2)).sqrt();
            if dist > 1.0 {
                self.x += self.vel_x * dt;
                self.y += self.vel_y * dt;
                self.vel_x *= 0.95;
                self.vel_y *= 0.95;
            } else {
                self.x = self.target_x;
                self.y = self.target_y;
                self.vel_x = 0.0;
                self.vel_y = 0.0;
            }
        } else {
            self.x += self.vel_x * dt;
            self.y += self.vel_y * dt;
            self.vel_y += GRAVITY * dt;
        }

        self.age += dt;
        self.age < self.max_age
    }

    /// 1.0 when fresh, falling towards 0.0 with age.
    pub fn freshness(&self) -> f64 {
        (1.0 - self.age / self.max_age).clamp(0.0, 1.0)
    }
}

/// Win celebration shown on the result screen
#[derive(Debug)]
pub struct Confetti {
    pub particles: Vec<Particle>,
    pub banner: &'static str,
    elapsed: f64,
    duration: f64,
    width: f64,
    height: f64,
}

impl Default for Confetti {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
            banner: BANNERS[0],
            elapsed: 0.0,
            duration: 3.0,
            width: 80.0,
            height: 24.0,
        }
    }
}

impl Confetti {
    pub fn is_active(&self) -> bool {
        self.elapsed < self.duration && !self.particles.is_empty()
    }

    pub fn start(&mut self, width: u16, height: u16) {
        self.start_with(width, height, &mut rand::thread_rng());
    }

    pub fn start_with<R: Rng + ?Sized>(&mut self, width: u16, height: u16, rng: &mut R) {
        self.particles.clear();
        self.elapsed = 0.0;
        self.width = f64::from(width);
        self.height = f64::from(height);
        self.banner = BANNERS.choose(rng).copied().unwrap_or(BANNERS[0]);

        let cx = self.width / 2.0;
        let cy = self.height / 2.0;

        let spacing = 2.0;
        let left = cx - (self.banner.chars().count() as f64 - 1.0) * spacing / 2.0;
        for (i, ch) in self.banner.chars().enumerate().filter(|(_, c)| *c != ' ') {
            let from = (cx + rng.gen_range(-10.0..10.0), cy + rng.gen_range(-5.0..5.0));
            let to = (left + i as f64 * spacing, cy - 2.0);
            self.particles.push(Particle::letter(from, to, ch, rng));
        }

        for _ in 0..30 {
            let x = cx + rng.gen_range(-15.0..15.0);
            let y = cy + rng.gen_range(-8.0..8.0);
            self.particles.push(Particle::burst(x, y, rng));
        }
    }

    pub fn stop(&mut self) {
        self.particles.clear();
        self.elapsed = self.duration;
    }

    pub fn update(&mut self, dt: Duration) {
        if !self.is_active() {
            return;
        }

        let dt = dt.as_secs_f64();
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            self.particles.clear();
            return;
        }

        let (width, height) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(dt);
            let margin = 5.0;
            let off_screen = !p.anchored
                && (p.y > height + margin || p.x < -margin || p.x > width + margin);
            alive && !off_screen
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn started() -> Confetti {
        let mut confetti = Confetti::default();
        confetti.start_with(80, 24, &mut StdRng::seed_from_u64(5));
        confetti
    }

    #[test]
    fn idle_until_started() {
        let confetti = Confetti::default();
        assert!(!confetti.is_active());
        assert!(confetti.particles.is_empty());
    }

    #[test]
    fn start_spells_a_banner_and_bursts() {
        let confetti = started();
        assert!(confetti.is_active());

        let letters: String = confetti
            .particles
            .iter()
            .filter(|p| p.anchored)
            .map(|p| p.symbol)
            .collect();
        assert_eq!(letters, confetti.banner.replace(' ', ""));
        assert!(confetti.particles.iter().any(|p| !p.anchored));
    }

    #[test]
    fn burst_particles_fall() {
        let mut p = Particle::burst(10.0, 10.0, &mut StdRng::seed_from_u64(1));
        let vel_y = p.vel_y;
        assert!(p.update(0.1));
        assert!(p.vel_y > vel_y);
    }

    #[test]
    fn letters_settle_on_target() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = Particle::letter((0.0, 0.0), (10.0, 5.0), 'W', &mut rng);
        for _ in 0..40 {
            p.update(0.1);
        }
        let dist = ((p.target_x - p.x).powi(2) + (p.target_y - p.y).powi(2)).sqrt();
        assert!(dist <= 1.0, "dist = {dist}");
    }

    #[test]
    fn runs_out_after_its_duration() {
        let mut confetti = started();
        confetti.update(Duration::from_millis(1000));
        assert!(confetti.is_active());

        confetti.update(Duration::from_millis(2100));
        assert!(!confetti.is_active());
        assert!(confetti.particles.is_empty());
    }

    #[test]
    fn stray_particles_are_dropped() {
        let mut confetti = Confetti::default();
        confetti.start_with(20, 10, &mut StdRng::seed_from_u64(2));
        confetti
            .particles
            .push(Particle::burst(100.0, 100.0, &mut StdRng::seed_from_u64(3)));

        confetti.update(Duration::from_millis(100));
        assert!(confetti
            .particles
            .iter()
            .all(|p| p.anchored || (p.x <= 25.0 && p.y <= 15.0 + 10.0)));
    }
}
