//! Demo content: procedural icons and one frame of shapes and text.

use sprig_engine::atlas::{PixelFormat, TextureAtlas, UvRect};
use sprig_engine::coords::{Vec2, Viewport};
use sprig_engine::device::WgpuBackend;
use sprig_engine::paint::Color;
use sprig_engine::render::RenderQueue;
use sprig_engine::text::{FontdueRasterizer, GlyphAtlas, TextAlign};

const CHECKER: u32 = 1;
const RING: u32 = 2;
const STRIPES: u32 = 3;

const ICON: u32 = 32;

pub fn build_icons(backend: &mut WgpuBackend) -> sprig_engine::Result<TextureAtlas<WgpuBackend>> {
    let mut atlas = TextureAtlas::create(backend, 256, 256)?;
    atlas.append(backend, CHECKER, ICON, ICON, &checker(), PixelFormat::Rgba8)?;
    atlas.append(backend, RING, ICON, ICON, &ring(), PixelFormat::Bgra8)?;
    atlas.append(backend, STRIPES, ICON, ICON / 2, &stripes(), PixelFormat::Rgba8)?;
    Ok(atlas)
}

fn pixels(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| f(x, y))
        .collect()
}

fn checker() -> Vec<u8> {
    pixels(ICON, ICON, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 { [240, 240, 240, 255] } else { [60, 60, 70, 255] }
    })
}

/// Written in BGRA order.
fn ring() -> Vec<u8> {
    let c = ICON as f32 / 2.0;
    pixels(ICON, ICON, |x, y| {
        let d = Vec2::new(x as f32 + 0.5 - c, y as f32 + 0.5 - c).length();
        if (10.0..15.0).contains(&d) { [40, 160, 255, 255] } else { [0, 0, 0, 0] }
    })
}

fn stripes() -> Vec<u8> {
    pixels(ICON, ICON / 2, |x, _| {
        if x % 6 < 3 { [255, 200, 40, 255] } else { [200, 60, 40, 255] }
    })
}

/// Records one frame into `q`.
pub fn draw(
    q: &mut RenderQueue<WgpuBackend>,
    icons: &TextureAtlas<WgpuBackend>,
    font: Option<&GlyphAtlas<WgpuBackend, FontdueRasterizer>>,
    viewport: Viewport,
    seconds: f32,
) {
    let (w, h) = (viewport.width, viewport.height);

    // header
    q.push_gradient_rectangle(
        Vec2::zero(),
        Vec2::new(w, 56.0),
        [
            Color::rgb(52, 64, 110),
            Color::rgb(110, 52, 96),
            Color::rgb(26, 30, 52),
            Color::rgb(52, 26, 46),
        ],
        None,
        UvRect::FULL,
    );

    // hue wheel of circles
    for i in 0..10 {
        let hue = (i as f32 * 36.0 + seconds * 40.0) % 360.0;
        let center = Vec2::new(70.0 + i as f32 * 80.0, 120.0);
        let radius = 22.0 + 6.0 * (seconds * 2.0 + i as f32).sin();
        q.push_filled_circle(
            center,
            radius,
            40,
            Color::from_hsv(hue, 0.3, 1.0),
            Color::from_hsv(hue, 0.9, 0.7),
        );
    }

    // sine polyline
    let mut prev = Vec2::new(40.0, 220.0);
    let mut x = 40.0;
    while x < w - 40.0 {
        x += 8.0;
        let next = Vec2::new(x, 220.0 + 30.0 * (x * 0.02 + seconds * 3.0).sin());
        q.push_line(prev, next, Color::rgb(120, 230, 160), 3.0);
        prev = next;
    }

    q.push_filled_triangle(
        [Vec2::new(60.0, 420.0), Vec2::new(160.0, 420.0), Vec2::new(110.0, 300.0)],
        [Color::rgb(255, 80, 80), Color::rgb(80, 255, 80), Color::rgb(80, 80, 255)],
        None,
        [Vec2::zero(); 3],
    );

    // icons, several per id so they batch together
    let icon_tex = icons.texture();
    for (row, id) in [CHECKER, RING, STRIPES].into_iter().enumerate() {
        for col in 0..4 {
            let pos = Vec2::new(220.0 + col as f32 * 48.0, 290.0 + row as f32 * 48.0);
            let size = if id == STRIPES { Vec2::new(32.0, 16.0) } else { Vec2::new(32.0, 32.0) };
            q.push_filled_rectangle(pos, size, Color::WHITE, icon_tex, icons.coords(id));
        }
    }

    // clipped panel
    let panel = Vec2::new(440.0, 280.0);
    let panel_size = Vec2::new(260.0, 160.0);
    q.push_filled_rectangle(panel, panel_size, Color::rgba(255, 255, 255, 24), None, UvRect::FULL);
    q.push_scissor(panel, panel_size);
    let orbit = Vec2::new((seconds * 1.3).cos(), (seconds * 1.3).sin()) * 90.0;
    q.push_filled_circle(
        panel + panel_size / 2.0 + orbit,
        70.0,
        48,
        Color::rgba(255, 220, 120, 220),
        Color::rgba(255, 120, 40, 0),
    );
    q.push_scissor(Vec2::zero(), Vec2::new(w, h));

    let Some(font) = font else {
        return;
    };

    let white = Color::WHITE;
    q.push_text(font, Vec2::new(16.0, 28.0), "sprig studio", white, TextAlign::CENTER_Y);
    q.push_text(
        font,
        Vec2::new(w / 2.0, 28.0),
        "immediate-mode batching",
        white.with_alpha(180),
        TextAlign::CENTER,
    );
    q.push_text(
        font,
        panel + Vec2::new(8.0, 8.0),
        "scissored\npanel",
        Color::BLACK,
        TextAlign::empty(),
    );

    let stats = format!(
        "{} vertices\n{} draw calls",
        q.vertices().len(),
        q.draw_calls().len()
    );
    q.push_text(
        font,
        Vec2::new(w - 16.0, h - 16.0),
        &stats,
        Color::rgb(180, 190, 210),
        TextAlign::RIGHT | TextAlign::BOTTOM,
    );
}
