//! Headless demo: renders a test scene plain, with focal blur, and with
//! contact shadows, and writes each frame as a PNG.
//!
//! Usage: `depthfx [options.toml] [out_dir]`

use std::path::{Path, PathBuf};

use depthfx::host::software::SoftwareHost;
use depthfx::{
    BlurEffect, ContactShadowEffect, EffectError, EffectOptions, Extent, Host,
};
use glam::{Vec2, Vec3, Vec4};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;

/// Spheres at increasing distance in front of a checkered backdrop; the
/// first two nearly touch. Returns the view-space centre of the third
/// sphere, the focus target.
fn draw_scene(host: &mut SoftwareHost) -> Vec3 {
    let mut focus = Vec3::ZERO;
    let spheres = [
        (Vec3::new(-70.0, -10.0, -180.0), 25.0, Vec4::new(0.9, 0.3, 0.2, 1.0)),
        (Vec3::new(-18.0, -14.0, -190.0), 22.0, Vec4::new(0.3, 0.8, 0.4, 1.0)),
        (Vec3::new(40.0, 5.0, -320.0), 35.0, Vec4::new(0.2, 0.4, 0.9, 1.0)),
        (Vec3::new(140.0, 20.0, -520.0), 45.0, Vec4::new(0.9, 0.8, 0.2, 1.0)),
    ];
    for (i, (center, radius, color)) in spheres.into_iter().enumerate() {
        host.push_matrix();
        host.translate(center);
        host.draw_sphere(radius, color);
        if i == 2 {
            focus = host.model_view().w_axis.truncate();
        }
        host.pop_matrix();
    }

    host.push_matrix();
    host.translate(Vec3::new(0.0, 0.0, -700.0));
    host.draw_billboard(Vec2::new(600.0, 380.0), |local| {
        let cell = ((local + 1.0) * 12.0).floor();
        if (cell.x + cell.y) as i32 % 2 == 0 {
            Vec4::new(0.85, 0.85, 0.85, 1.0)
        } else {
            Vec4::new(0.35, 0.35, 0.4, 1.0)
        }
    });
    host.pop_matrix();
    focus
}

fn save_png(host: &SoftwareHost, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let texels = host.screen_texels();
    let image = image::RgbaImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let c = texels[(y * WIDTH + x) as usize].clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
        image::Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
    });
    image.save(path)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let options = match args.next() {
        Some(path) => EffectOptions::load(Path::new(&path))?,
        None => EffectOptions::default(),
    };
    let out_dir = args.next().map_or_else(|| PathBuf::from("."), PathBuf::from);
    std::fs::create_dir_all(&out_dir)?;

    let extent = Extent::new(WIDTH, HEIGHT);
    let background = Vec4::new(0.05, 0.05, 0.08, 1.0);

    let mut host = SoftwareHost::new(extent);
    host.clear(background);
    let _ = draw_scene(&mut host);
    save_png(&host, &out_dir.join("plain.png"))?;

    let mut host = SoftwareHost::new(extent);
    let mut blur = BlurEffect::with_options(&mut host, &options.focal_blur)?;
    blur.draw(&mut host, |scene| -> Result<(), EffectError> {
        scene.clear(background);
        let focus = draw_scene(scene);
        scene.pass_mut().focus_at(focus);
        Ok(())
    })?;
    log::info!("focal point {}", blur.pass().focal_point());
    save_png(&host, &out_dir.join("focal_blur.png"))?;

    let mut host = SoftwareHost::new(extent);
    let mut shadow =
        ContactShadowEffect::with_options(&mut host, &options.contact_shadow)?;
    shadow.draw(&mut host, |scene| -> Result<(), EffectError> {
        scene.clear(background);
        let _ = draw_scene(scene);
        Ok(())
    })?;
    save_png(&host, &out_dir.join("contact_shadow.png"))?;

    Ok(())
}
