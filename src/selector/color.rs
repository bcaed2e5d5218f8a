//! Palette harmony scoring: resolve color names to RGB, convert to CIE Lab,
//! and derive a harmony score from pairwise CIEDE2000 distance.
//!
//! No crate in this codebase's dependency stack provides CIE Lab / ΔE2000
//! math, so this is hand-rolled — pure arithmetic, not an external service.

/// A small embedded table of common clothing color names. Falls back to
/// `#RRGGBB` parsing for anything not listed.
fn named_color(name: &str) -> Option<(u8, u8, u8)> {
    let n = name.trim().to_lowercase();
    let table: &[(&str, (u8, u8, u8))] = &[
        ("black", (0, 0, 0)),
        ("white", (255, 255, 255)),
        ("gray", (128, 128, 128)),
        ("grey", (128, 128, 128)),
        ("navy", (0, 0, 128)),
        ("blue", (0, 0, 255)),
        ("light blue", (173, 216, 230)),
        ("red", (255, 0, 0)),
        ("maroon", (128, 0, 0)),
        ("green", (0, 128, 0)),
        ("olive", (128, 128, 0)),
        ("khaki", (189, 183, 107)),
        ("beige", (245, 245, 220)),
        ("tan", (210, 180, 140)),
        ("brown", (139, 69, 19)),
        ("yellow", (255, 255, 0)),
        ("orange", (255, 165, 0)),
        ("pink", (255, 192, 203)),
        ("purple", (128, 0, 128)),
        ("cream", (255, 253, 208)),
        ("charcoal", (54, 69, 79)),
        ("denim", (21, 96, 189)),
    ];
    table
        .iter()
        .find(|(k, _)| *k == n)
        .map(|(_, rgb)| *rgb)
}

fn hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let s = s.trim();
    if s.starts_with('#') && s.len() == 7 {
        let r = u8::from_str_radix(&s[1..3], 16).ok()?;
        let g = u8::from_str_radix(&s[3..5], 16).ok()?;
        let b = u8::from_str_radix(&s[5..7], 16).ok()?;
        Some((r, g, b))
    } else {
        None
    }
}

fn to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    named_color(color).or_else(|| hex_color(color))
}

#[derive(Debug, Clone, Copy)]
struct Lab {
    l: f32,
    a: f32,
    b: f32,
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn rgb_to_lab((r, g, b): (u8, u8, u8)) -> Lab {
    let rl = srgb_to_linear(f32::from(r) / 255.0);
    let gl = srgb_to_linear(f32::from(g) / 255.0);
    let bl = srgb_to_linear(f32::from(b) / 255.0);

    // sRGB -> XYZ (D65)
    let x = rl * 0.4124564 + gl * 0.3575761 + bl * 0.1804375;
    let y = rl * 0.2126729 + gl * 0.7151522 + bl * 0.0721750;
    let z = rl * 0.0193339 + gl * 0.1191920 + bl * 0.9503041;

    // D65 reference white
    const XN: f32 = 0.95047;
    const YN: f32 = 1.0;
    const ZN: f32 = 1.08883;

    fn f(t: f32) -> f32 {
        const DELTA: f32 = 6.0 / 29.0;
        if t > DELTA.powi(3) {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    }

    let fx = f(x / XN);
    let fy = f(y / YN);
    let fz = f(z / ZN);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// CIEDE2000 color difference between two Lab colors.
#[allow(clippy::many_single_char_names)]
fn delta_e2000(lab1: Lab, lab2: Lab) -> f32 {
    let (l1, a1, b1) = (lab1.l, lab1.a, lab1.b);
    let (l2, a2, b2) = (lab2.l, lab2.a, lab2.b);

    let c1 = (a1 * a1 + b1 * b1).sqrt();
    let c2 = (a2 * a2 + b2 * b2).sqrt();
    let c_bar = (c1 + c2) / 2.0;

    let g = 0.5 * (1.0 - (c_bar.powi(7) / (c_bar.powi(7) + 25f32.powi(7))).sqrt());
    let a1p = a1 * (1.0 + g);
    let a2p = a2 * (1.0 + g);

    let c1p = (a1p * a1p + b1 * b1).sqrt();
    let c2p = (a2p * a2p + b2 * b2).sqrt();

    let h1p = if a1p == 0.0 && b1 == 0.0 {
        0.0
    } else {
        b1.atan2(a1p).to_degrees().rem_euclid(360.0)
    };
    let h2p = if a2p == 0.0 && b2 == 0.0 {
        0.0
    } else {
        b2.atan2(a2p).to_degrees().rem_euclid(360.0)
    };

    let delta_lp = l2 - l1;
    let delta_cp = c2p - c1p;

    let delta_hp = if c1p * c2p == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff.abs() <= 180.0 {
            diff
        } else if diff > 180.0 {
            diff - 360.0
        } else {
            diff + 360.0
        }
    };
    let delta_hp_big = 2.0 * (c1p * c2p).sqrt() * (delta_hp.to_radians() / 2.0).sin();

    let l_bar_p = (l1 + l2) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;

    let h_bar_p = if c1p * c2p == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-(((h_bar_p - 275.0) / 25.0).powi(2))).exp();
    let r_c = 2.0 * (c_bar_p.powi(7) / (c_bar_p.powi(7) + 25f32.powi(7))).sqrt();
    let s_l = 1.0 + (0.015 * (l_bar_p - 50.0).powi(2)) / (20.0 + (l_bar_p - 50.0).powi(2)).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -r_c * (2.0 * delta_theta).to_radians().sin();

    let term_l = delta_lp / s_l;
    let term_c = delta_cp / s_c;
    let term_h = delta_hp_big / s_h;
    let r_term = r_t * term_c * term_h;

    (term_l * term_l + term_c * term_c + term_h * term_h + r_term).max(0.0).sqrt()
}

/// Scores how harmonious a set of colors is, in `[0, 1]`, higher meaning
/// more harmonious. Colors that fail to resolve are ignored; fewer than two
/// resolved colors returns a neutral 0.6. Even when colors resolve, the raw
/// CIEDE2000-derived score is blended with a 0.6 neutral prior so a single
/// outlier pairing never dominates the outfit-level score.
pub fn palette_score(colors: &[&str]) -> f32 {
    let labs: Vec<Lab> = colors.iter().filter_map(|c| to_rgb(c)).map(rgb_to_lab).collect();
    if labs.len() < 2 {
        return 0.6;
    }

    let mut dists = Vec::new();
    for i in 0..labs.len() {
        for j in (i + 1)..labs.len() {
            dists.push(delta_e2000(labs[i], labs[j]));
        }
    }
    if dists.is_empty() {
        return 0.6;
    }
    let avg = dists.iter().sum::<f32>() / dists.len() as f32;
    let normalized = (1.0 - avg / 100.0).clamp(0.0, 1.0);
    0.4 + 0.6 * normalized
}
