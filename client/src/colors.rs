/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// CSS color for a gradient stop, used by the legend swatches.
pub fn stop_css((r, g, b): (u8, u8, u8)) -> String {
    rgba_css(r, g, b, 1.0)
}

/// CSS `linear-gradient` matching a heat gradient's stops.
pub fn gradient_css(stops: &[(f64, (u8, u8, u8))]) -> String {
    let parts: Vec<String> = stops
        .iter()
        .map(|&(pos, color)| format!("{} {:.0}%", stop_css(color), pos * 100.0))
        .collect();
    format!("linear-gradient(90deg, {})", parts.join(", "))
}

// CSS named colors: green, red, blue.
pub const START_MARKER_COLOR: (u8, u8, u8) = (0, 128, 0);
pub const END_MARKER_COLOR: (u8, u8, u8) = (255, 0, 0);
pub const ROUTE_COLOR: (u8, u8, u8) = (0, 0, 255);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_css_lists_stops_in_order() {
        let css = gradient_css(&[(0.1, (0, 0, 255)), (1.0, (255, 0, 0))]);
        assert_eq!(
            css,
            "linear-gradient(90deg, rgba(0,0,255,1) 10%, rgba(255,0,0,1) 100%)"
        );
    }

    #[test]
    fn route_layer_colors_are_the_named_css_colors() {
        assert_eq!(stop_css(ROUTE_COLOR), "rgba(0,0,255,1)");
        assert_eq!(stop_css(START_MARKER_COLOR), "rgba(0,128,0,1)");
        assert_eq!(stop_css(END_MARKER_COLOR), "rgba(255,0,0,1)");
    }
}
