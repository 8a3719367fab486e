use std::collections::HashMap;

/// Heat intensity accumulated in one grid cell, positioned at the
/// intensity-weighted centroid of its points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatCell {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

/// Buckets screen-space points into a grid of `radius / 2` cells. Points far
/// outside the viewport are skipped. `factor` is the zoom attenuation applied
/// to every point.
pub fn aggregate_cells(
    points: &[(f64, f64, f64)],
    radius: f64,
    width: f64,
    height: f64,
    factor: f64,
) -> Vec<HeatCell> {
    let cell_size = (radius / 2.0).max(1.0);
    let mut cells: Vec<HeatCell> = Vec::new();
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();

    for &(x, y, intensity) in points {
        if !(x.is_finite() && y.is_finite() && intensity.is_finite()) {
            continue;
        }
        if x < -radius || y < -radius || x > width + radius || y > height + radius {
            continue;
        }
        let weight = intensity * factor;
        if weight <= 0.0 {
            continue;
        }
        let key = (
            ((x + radius) / cell_size).floor() as i64,
            ((y + radius) / cell_size).floor() as i64,
        );
        match index.get(&key) {
            Some(&slot) => {
                let cell = &mut cells[slot];
                let total = cell.value + weight;
                cell.x = (cell.x * cell.value + x * weight) / total;
                cell.y = (cell.y * cell.value + y * weight) / total;
                cell.value = total;
            }
            None => {
                index.insert(key, cells.len());
                cells.push(HeatCell {
                    x,
                    y,
                    value: weight,
                });
            }
        }
    }
    cells
}

/// Replaces the grey stamp buffer's colour with the palette entry for its
/// alpha and caps the alpha at `max_opacity`.
pub fn colorize(pixels: &mut [u8], palette: &[[u8; 3]], max_opacity: f64) {
    let cap = (max_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    for px in pixels.chunks_exact_mut(4) {
        let alpha = px[3];
        if alpha == 0 {
            continue;
        }
        if let Some(&[r, g, b]) = palette.get(alpha as usize) {
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
        px[3] = alpha.min(cap);
    }
}

pub use render::HeatRenderer;

mod render {
    use super::*;
    use crowd_shared::heat::{
        GradientStops, HEAT_LAYER_OPTIONS, HeatLayerOptions, build_palette, point_alpha,
        zoom_intensity_factor,
    };
    use wasm_bindgen::{Clamped, JsCast};
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

    fn create_canvas(width: u32, height: u32) -> Option<(HtmlCanvasElement, CanvasRenderingContext2d)> {
        let document = web_sys::window()?.document()?;
        let canvas = document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        canvas.set_width(width);
        canvas.set_height(height);
        let ctx = canvas
            .get_context("2d")
            .ok()??
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some((canvas, ctx))
    }

    /// Offscreen heat layer: grey blurred stamps accumulate alpha, then the
    /// buffer is recoloured through the gradient palette.
    pub struct HeatRenderer {
        options: HeatLayerOptions,
        stamp: HtmlCanvasElement,
        buffer: HtmlCanvasElement,
        buffer_ctx: CanvasRenderingContext2d,
        palette: Vec<[u8; 3]>,
        stops: GradientStops,
    }

    impl HeatRenderer {
        pub fn new(stops: GradientStops) -> Option<Self> {
            let options = HEAT_LAYER_OPTIONS;
            let stamp = Self::make_stamp(&options)?;
            let (buffer, buffer_ctx) = create_canvas(1, 1)?;
            Some(Self {
                options,
                stamp,
                buffer,
                buffer_ctx,
                palette: build_palette(stops),
                stops,
            })
        }

        fn make_stamp(options: &HeatLayerOptions) -> Option<HtmlCanvasElement> {
            let r2 = options.radius + options.blur;
            let side = (r2 * 2.0).ceil() as u32;
            let (canvas, ctx) = create_canvas(side, side)?;
            // The circle is drawn off-canvas; only its blurred shadow lands inside.
            ctx.set_shadow_offset_x(r2 * 2.0);
            ctx.set_shadow_offset_y(r2 * 2.0);
            ctx.set_shadow_blur(options.blur);
            ctx.set_shadow_color("black");
            ctx.begin_path();
            ctx.arc(-r2, -r2, options.radius, 0.0, std::f64::consts::TAU).ok()?;
            ctx.close_path();
            ctx.fill();
            Some(canvas)
        }

        pub fn set_gradient(&mut self, stops: GradientStops) {
            if !std::ptr::eq(self.stops, stops) {
                self.stops = stops;
                self.palette = build_palette(stops);
            }
        }

        /// Draws `points` (screen x, screen y, intensity) onto `target`.
        pub fn draw(
            &mut self,
            target: &CanvasRenderingContext2d,
            points: &[(f64, f64, f64)],
            zoom: f64,
            width: u32,
            height: u32,
        ) {
            if points.is_empty() || width == 0 || height == 0 {
                return;
            }
            if self.buffer.width() != width || self.buffer.height() != height {
                self.buffer.set_width(width);
                self.buffer.set_height(height);
            }
            let ctx = &self.buffer_ctx;
            ctx.clear_rect(0.0, 0.0, width as f64, height as f64);

            let factor = zoom_intensity_factor(zoom, self.options.max_zoom);
            let cells = aggregate_cells(
                points,
                self.options.radius,
                width as f64,
                height as f64,
                factor,
            );
            let r2 = self.options.radius + self.options.blur;
            for cell in &cells {
                ctx.set_global_alpha(point_alpha(cell.value, self.options.min_opacity));
                let _ = ctx.draw_image_with_html_canvas_element(
                    &self.stamp,
                    cell.x - r2,
                    cell.y - r2,
                );
            }
            ctx.set_global_alpha(1.0);

            let Ok(image) = ctx.get_image_data(0.0, 0.0, width as f64, height as f64) else {
                return;
            };
            let mut pixels = image.data().0;
            colorize(&mut pixels, &self.palette, self.options.max_opacity);
            let Ok(colored) =
                ImageData::new_with_u8_clamped_array_and_sh(Clamped(&pixels[..]), width, height)
            else {
                return;
            };
            let _ = ctx.put_image_data(&colored, 0.0, 0.0);
            let _ = target.draw_image_with_html_canvas_element(&self.buffer, 0.0, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_shared::heat::{HEAT_LAYER_OPTIONS, OCCUPANCY_GRADIENT, build_palette};

    #[test]
    fn nearby_points_share_a_cell() {
        let cells = aggregate_cells(
            &[(100.0, 100.0, 1.0), (103.0, 101.0, 3.0)],
            30.0,
            800.0,
            600.0,
            1.0,
        );
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].value, 4.0);
        assert!((cells[0].x - 102.25).abs() < 1e-9);
    }

    #[test]
    fn distant_points_stay_separate() {
        let cells = aggregate_cells(
            &[(10.0, 10.0, 1.0), (400.0, 300.0, 1.0)],
            30.0,
            800.0,
            600.0,
            0.5,
        );
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.value == 0.5));
    }

    #[test]
    fn offscreen_and_empty_points_are_skipped() {
        let cells = aggregate_cells(
            &[(-500.0, 10.0, 5.0), (10.0, 10.0, 0.0), (f64::NAN, 1.0, 1.0)],
            30.0,
            800.0,
            600.0,
            1.0,
        );
        assert!(cells.is_empty());
    }

    #[test]
    fn colorize_maps_alpha_through_palette() {
        let palette = build_palette(OCCUPANCY_GRADIENT);
        let mut pixels = vec![0, 0, 0, 255, 0, 0, 0, 0];
        colorize(&mut pixels, &palette, 0.9);
        let [r, g, b] = palette[255];
        assert_eq!(&pixels[..4], &[r, g, b, 230]);
        assert_eq!(&pixels[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn default_options_match_heat_layer() {
        assert_eq!(HEAT_LAYER_OPTIONS.radius, 30.0);
        assert_eq!(HEAT_LAYER_OPTIONS.blur, 20.0);
    }
}
