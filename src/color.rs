/* Colour conversions for the RGBW illuminator: hex string parsing and the
 * luminance-extraction algorithm turning an RGB triple into RGBW. */
use crate::error::TrackballError;

/* Compact RGB colour parsed from a hex string. */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/* Four-channel colour driving the trackball's red/green/blue/white LEDs. */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbwColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl RgbwColor {
    pub fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /* Sum of the four channels, used to tell "no colour" apart from */
    /* "zero contrast" when scaling.                                 */
    pub(crate) fn channel_sum(self) -> u32 {
        u32::from(self.r) + u32::from(self.g) + u32::from(self.b) + u32::from(self.w)
    }
}

/* Parse a `RRGGBB` hex colour with an optional leading `#`,        */
/* case-insensitive. Anything but exactly six hex digits after the  */
/* marker fails with `InvalidColorFormat`.                          */
pub fn hex_to_rgb(hexcolour: &str) -> Result<RgbColor, TrackballError> {
    let digits = hexcolour.strip_prefix('#').unwrap_or(hexcolour);

    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TrackballError::InvalidColorFormat(hexcolour.to_string()));
    }

    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| TrackballError::InvalidColorFormat(hexcolour.to_string()))
    };

    Ok(RgbColor {
        r: component(0..2)?,
        g: component(2..4)?,
        b: component(4..6)?,
    })
}

/* Convert an RGB triple to RGBW by extracting a white component and     */
/* subtracting it from each channel.                                     */
/*  */
/* Inputs are deliberately not clamped up front: negative or             */
/* super-saturated values flow through the maths and only the outputs    */
/* are clamped, so e.g. (-1,-1,-1) desaturates cleanly to black.         */
pub fn rgb_to_rgbw(r: i32, g: i32, b: i32) -> RgbwColor {
    let max_component = r.max(g).max(b);

    /* Pure black short-circuit */
    if max_component == 0 {
        return RgbwColor::default();
    }

    /* Scale the colour up to 100% saturation to find its hue */
    let multiplier = 255.0 / f64::from(max_component);
    let h_r = f64::from(r) * multiplier;
    let h_g = f64::from(g) * multiplier;
    let h_b = f64::from(b) * multiplier;

    /* Whiteness of the hue, scaled back down to the input's level */
    let max = h_r.max(h_g).max(h_b);
    let min = h_r.min(h_g).min(h_b);
    let luminance = ((max + min) / 2.0 - 127.5) * (255.0 / 127.5) / multiplier;

    /* Truncation toward zero, matching integer-cast semantics */
    let clamp = |v: f64| v.trunc().clamp(0.0, 255.0) as u8;

    RgbwColor {
        r: clamp(f64::from(r) - luminance),
        g: clamp(f64::from(g) - luminance),
        b: clamp(f64::from(b) - luminance),
        w: clamp(luminance),
    }
}

/* Parse a hex colour straight to RGBW. */
pub fn hex_to_rgbw(hexcolour: &str) -> Result<RgbwColor, TrackballError> {
    let rgb = hex_to_rgb(hexcolour)?;
    Ok(rgb_to_rgbw(
        i32::from(rgb.r),
        i32::from(rgb.g),
        i32::from(rgb.b),
    ))
}
