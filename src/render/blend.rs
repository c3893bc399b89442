use crate::foundation::core::{premultiply, unpremultiply};
use crate::render::types::CompositeType;

/// Integer `a * b / 255` with rounding.
pub fn mul_div255(a: u32, b: u32) -> u32 {
    (a * b + 127) / 255
}

/// Scale the alpha of a straight-alpha ARGB value by `alpha` in `[0, 1]`.
pub fn scale_alpha(argb: u32, alpha: f32) -> u32 {
    if alpha >= 1.0 {
        return argb;
    }
    let a = (argb >> 24) as f32 * alpha.clamp(0.0, 1.0);
    ((a.round() as u32) << 24) | (argb & 0x00ff_ffff)
}

// (Fa, Fb) Porter-Duff factors in 0..=255.
fn factors(comp: CompositeType, sa: u32, da: u32) -> (u32, u32) {
    use CompositeType::*;
    match comp {
        Clear => (0, 0),
        Src | SrcNoEa => (255, 0),
        Dst => (0, 255),
        DstOver => (255 - da, 255),
        SrcIn => (da, 0),
        DstIn => (0, sa),
        SrcOut => (255 - da, 0),
        DstOut => (0, 255 - sa),
        SrcAtop => (da, 255 - sa),
        DstAtop => (255 - da, sa),
        AlphaXor => (255 - da, 255 - sa),
        SrcOver | SrcOverNoEa | OpaqueSrcOverNoEa | Any | AnyAlpha | General | Xor => {
            (255, 255 - sa)
        }
    }
}

fn channels(v: u32) -> [u32; 4] {
    let [a, r, g, b] = v.to_be_bytes();
    [a as u32, r as u32, g as u32, b as u32]
}

fn pack(c: [u32; 4]) -> u32 {
    (c[0].min(255) << 24) | (c[1].min(255) << 16) | (c[2].min(255) << 8) | c[3].min(255)
}

/// Combine premultiplied `src` over premultiplied `dst` with the rule `comp`.
pub fn porter_duff(comp: CompositeType, src: u32, dst: u32) -> u32 {
    let s = channels(src);
    let d = channels(dst);
    let (fa, fb) = factors(comp, s[0], d[0]);
    let mut out = [0u32; 4];
    for i in 0..4 {
        out[i] = mul_div255(s[i], fa) + mul_div255(d[i], fb);
    }
    pack(out)
}

/// Blend premultiplied `dst` toward `out` by `coverage`.
pub fn lerp_premul(dst: u32, out: u32, coverage: u8) -> u32 {
    match coverage {
        0 => dst,
        255 => out,
        c => {
            let c = c as u32;
            let d = channels(dst);
            let o = channels(out);
            let mut r = [0u32; 4];
            for i in 0..4 {
                r[i] = (d[i] * (255 - c) + o[i] * c + 127) / 255;
            }
            pack(r)
        }
    }
}

/// Composite straight-alpha `src` onto straight-alpha `dst` under partial coverage.
pub fn composite_argb(comp: CompositeType, src: u32, dst: u32, coverage: u8) -> u32 {
    let dp = premultiply(dst);
    let out = porter_duff(comp, premultiply(src), dp);
    unpremultiply(lerp_premul(dp, out, coverage))
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
