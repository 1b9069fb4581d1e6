//! Screen-space contact shadows from reconstructed view positions.

use super::effect_pass::{EffectPass, PassFrame, ShaderPass};
use super::uniforms::{
    clamp_samples, ContactShadowUniforms, PassUniforms, MAX_SAMPLES,
};
use crate::error::EffectError;
use crate::host::{Host, Shader};
use crate::options::{ContactShadowOptions, JitterMode};

/// Contact shadow effect over host `H`.
pub type ContactShadowEffect<H> = EffectPass<H, ContactShadow>;

/// Contact shadow parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactShadow {
    intensity: f32,
    samples: u32,
    search_radius: f32,
    sample_reach: f32,
    bias: f32,
    jitter: JitterMode,
}

impl Default for ContactShadow {
    fn default() -> Self {
        Self::new(&ContactShadowOptions::default())
    }
}

impl ContactShadow {
    /// Parameters from options.
    #[must_use]
    pub fn new(options: &ContactShadowOptions) -> Self {
        let mut shadow = Self {
            intensity: 0.0,
            samples: 1,
            search_radius: 0.0,
            sample_reach: 0.0,
            bias: 0.0,
            jitter: JitterMode::Animated,
        };
        shadow.apply_options(options);
        shadow
    }

    /// Replace every parameter from options.
    pub fn apply_options(&mut self, options: &ContactShadowOptions) {
        self.set_intensity(options.intensity);
        self.set_samples(options.samples);
        self.set_search_radius(options.search_radius);
        self.set_sample_reach(options.sample_reach);
        self.set_bias(options.bias);
        self.set_jitter(options.jitter);
    }

    /// Darkening at full occlusion. Results are clamped so color never
    /// goes negative.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Neighbourhood samples per pixel, clamped to `1..=MAX_SAMPLES`.
    pub fn set_samples(&mut self, samples: u32) {
        let clamped = clamp_samples(samples);
        if clamped != samples {
            log::warn!(
                "contact shadow samples {samples} outside 1..={MAX_SAMPLES}, \
                 using {clamped}"
            );
        }
        self.samples = clamped;
    }

    /// World-space neighbourhood radius. Zero disables the effect.
    pub fn set_search_radius(&mut self, radius: f32) {
        self.search_radius = radius;
    }

    /// World-space extent of the neighbourhood that gets sampled.
    ///
    /// Only neighbours inside the reach are ever looked at; the search
    /// radius then picks and weights occluders among them. Keeping the two
    /// apart means a larger search radius never loses an occluder.
    pub fn set_sample_reach(&mut self, reach: f32) {
        self.sample_reach = reach;
    }

    /// Minimum depth lead, in world units, before a neighbour counts as an
    /// occluder.
    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias;
    }

    /// How the sample pattern rotates between passes.
    pub fn set_jitter(&mut self, jitter: JitterMode) {
        self.jitter = jitter;
    }

    /// Current intensity.
    #[must_use]
    pub const fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Current (clamped) sample count.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Current search radius.
    #[must_use]
    pub const fn search_radius(&self) -> f32 {
        self.search_radius
    }

    /// Current sample reach.
    #[must_use]
    pub const fn sample_reach(&self) -> f32 {
        self.sample_reach
    }

    /// Current occluder bias.
    #[must_use]
    pub const fn bias(&self) -> f32 {
        self.bias
    }
}

impl ShaderPass for ContactShadow {
    const SHADER: Shader = Shader::ContactShadow;

    fn uniforms(&mut self, frame: &PassFrame) -> PassUniforms {
        let inv_proj = frame.projection.matrix().inverse();
        PassUniforms::ContactShadow(ContactShadowUniforms {
            inv_proj: inv_proj.to_cols_array_2d(),
            screen_size: [frame.extent.width as f32, frame.extent.height as f32],
            focal_length_px: frame.projection.focal_length_px(frame.extent.width),
            intensity: self.intensity,
            search_radius: self.search_radius,
            sample_reach: self.sample_reach,
            bias: self.bias,
            sample_count: self.samples,
            seed: self.jitter.next_seed(),
            _pad: [0.0; 3],
        })
    }
}

impl<H: Host> EffectPass<H, ContactShadow> {
    /// Create a contact shadow with default parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] or [`EffectError::Allocation`]
    /// if the host cannot build the effect.
    pub fn new(host: &mut H) -> Result<Self, EffectError> {
        Self::with_options(host, &ContactShadowOptions::default())
    }

    /// Create a contact shadow from options.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] or [`EffectError::Allocation`]
    /// if the host cannot build the effect.
    pub fn with_options(
        host: &mut H,
        options: &ContactShadowOptions,
    ) -> Result<Self, EffectError> {
        Self::with_pass(host, ContactShadow::new(options))
    }

    /// See [`ContactShadow::set_intensity`].
    pub fn set_intensity(&mut self, intensity: f32) {
        self.pass_mut().set_intensity(intensity);
    }

    /// See [`ContactShadow::set_samples`].
    pub fn set_samples(&mut self, samples: u32) {
        self.pass_mut().set_samples(samples);
    }

    /// See [`ContactShadow::set_search_radius`].
    pub fn set_search_radius(&mut self, radius: f32) {
        self.pass_mut().set_search_radius(radius);
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::camera::projection::Projection;
    use crate::host::software::SoftwareHost;
    use crate::host::Extent;

    const W: u32 = 96;
    const H: u32 = 64;
    /// Sphere B's side facing sphere A, plus the gap between them.
    const CONTACT_COLUMNS: std::ops::Range<u32> = 46..60;
    const CONTACT_ROWS: std::ops::Range<u32> = 24..41;
    const SEEDS: std::ops::Range<u32> = 0..8;

    fn host() -> SoftwareHost {
        let mut host = SoftwareHost::new(Extent::new(W, H));
        host.set_projection(Projection::perspective(
            20.0,
            W as f32 / H as f32,
            1.0,
            2000.0,
        ));
        host
    }

    /// Spheres of radius 20 at distance 300 whose surfaces are 10 units
    /// apart.
    fn spheres(host: &mut SoftwareHost, with_a: bool) {
        let grey = Vec4::new(0.8, 0.8, 0.8, 1.0);
        if with_a {
            host.push_matrix();
            host.translate(Vec3::new(-25.0, 0.0, -300.0));
            host.draw_sphere(20.0, grey);
            host.pop_matrix();
        }
        host.push_matrix();
        host.translate(Vec3::new(25.0, 0.0, -300.0));
        host.draw_sphere(20.0, grey);
        host.pop_matrix();
    }

    /// Default parameters apart from a fixed jitter seed.
    fn shadowed(
        with_a: bool,
        seed: u32,
        configure: impl FnOnce(&mut ContactShadow),
    ) -> SoftwareHost {
        let mut host = host();
        let mut effect = ContactShadowEffect::new(&mut host).unwrap();
        effect.pass_mut().set_jitter(JitterMode::Fixed { seed });
        configure(effect.pass_mut());
        effect
            .draw(&mut host, |scope| -> Result<(), EffectError> {
                spheres(scope, with_a);
                Ok(())
            })
            .unwrap();
        host
    }

    fn unshadowed() -> SoftwareHost {
        let mut host = host();
        spheres(&mut host, true);
        host
    }

    fn luminance(c: Vec4) -> f32 {
        c.truncate().element_sum()
    }

    fn contact_pixels() -> impl Iterator<Item = (u32, u32)> {
        CONTACT_ROWS.flat_map(|y| CONTACT_COLUMNS.map(move |x| (x, y)))
    }

    fn contact_luminance(host: &SoftwareHost) -> f32 {
        contact_pixels()
            .map(|(x, y)| luminance(host.screen_pixel(x, y)))
            .sum()
    }

    #[test]
    fn defaults() {
        let shadow = ContactShadow::default();
        assert_eq!(shadow.intensity(), 0.5);
        assert_eq!(shadow.samples(), 15);
        assert_eq!(shadow.search_radius(), 100.0);
        assert_eq!(shadow.sample_reach(), 100.0);
        assert_eq!(shadow.bias(), 0.05);
    }

    #[test]
    fn neighbouring_sphere_darkens_contact_region() {
        let plain = unshadowed();
        assert!(luminance(plain.screen_pixel(53, 32)) > 0.0);
        let plain_sum = contact_luminance(&plain);

        for seed in SEEDS {
            let with_a = shadowed(true, seed, |_| {});
            let alone = shadowed(false, seed, |_| {});
            for (x, y) in contact_pixels() {
                let (shaded, lone) = (with_a.screen_pixel(x, y), alone.screen_pixel(x, y));
                assert!(
                    luminance(shaded) <= luminance(lone),
                    "seed {seed} pixel ({x}, {y}): {shaded} vs {lone}"
                );
                assert_eq!(shaded.w, plain.screen_pixel(x, y).w);
            }
            let shaded_sum = contact_luminance(&with_a);
            assert!(shaded_sum < plain_sum, "seed {seed}: {shaded_sum} vs {plain_sum}");
            assert!(
                shaded_sum < contact_luminance(&alone),
                "seed {seed}: sphere A added no occlusion"
            );
        }
    }

    #[test]
    fn zero_radius_or_intensity_leaves_scene_untouched() {
        let plain = unshadowed().screen_texels();
        for seed in SEEDS {
            let no_radius = shadowed(true, seed, |s| s.set_search_radius(0.0));
            assert_eq!(no_radius.screen_texels(), plain);
            let no_intensity = shadowed(true, seed, |s| s.set_intensity(0.0));
            assert_eq!(no_intensity.screen_texels(), plain);
        }
    }

    #[test]
    fn background_stays_background() {
        let out = shadowed(true, 21, |_| {});
        assert_eq!(out.screen_pixel(0, 0), Vec4::ZERO);
        assert_eq!(out.screen_pixel(W - 1, H - 1), Vec4::ZERO);
    }

    #[test]
    fn uniforms_carry_projection() {
        let mut shadow = ContactShadow::default();
        shadow.set_jitter(JitterMode::Fixed { seed: 5 });
        let projection = Projection::perspective(45.0, 2.0, 0.5, 100.0);
        let frame = PassFrame {
            projection,
            extent: Extent::new(200, 100),
        };
        let PassUniforms::ContactShadow(u) = shadow.uniforms(&frame) else {
            panic!("wrong uniform block");
        };
        assert_eq!(u.seed, 5);
        assert_eq!(u.search_radius, 100.0);
        assert_eq!(u.sample_reach, 100.0);
        assert_eq!(u.screen_size, [200.0, 100.0]);
        assert_eq!(u.focal_length_px, projection.focal_length_px(200));
        let round_trip = glam::Mat4::from_cols_array_2d(&u.inv_proj)
            * projection.matrix();
        assert!(round_trip.abs_diff_eq(glam::Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn options_configure_the_effect() {
        let mut host = host();
        let options = ContactShadowOptions {
            samples: 0,
            sample_reach: 40.0,
            bias: 0.3,
            ..ContactShadowOptions::default()
        };
        let effect = ContactShadowEffect::with_options(&mut host, &options).unwrap();
        assert_eq!(effect.pass().samples(), 1);
        assert_eq!(effect.pass().sample_reach(), 40.0);
        assert_eq!(effect.pass().bias(), 0.3);
    }
}
