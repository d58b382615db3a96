use wide::f32x4;

use crate::utils::color::Pixel;

/// Straight-alpha "source over": `src` scaled by `opacity` composited onto `dst`.
///
/// Over an opaque backdrop this reduces to
/// `out.rgb = dst.rgb * (1 - ea) + src.rgb * ea`, `out.a = 255`
/// with `ea = src.a / 255 * opacity`.
#[inline]
pub fn alpha_over(src: Pixel, dst: Pixel, opacity: f32) -> Pixel {
    let ea = src.a as f32 / 255.0 * opacity;
    if ea <= 0.0 {
        return dst;
    }
    if ea >= 1.0 {
        return Pixel { a: 255, ..src };
    }
    let da = dst.a as f32 / 255.0;
    let dst_weight = da * (1.0 - ea);
    let out_a = ea + dst_weight;
    if out_a <= 0.0 {
        return Pixel::TRANSPARENT;
    }

    let mixed = (src.to_f32x4() * f32x4::splat(ea) + dst.to_f32x4() * f32x4::splat(dst_weight))
        / f32x4::splat(out_a);
    let mut lanes = mixed.to_array();
    lanes[3] = out_a * 255.0;
    Pixel::from_f32x4(f32x4::from(lanes))
}

/// Multiply destination alpha by `1 - amount`; colour channels are untouched.
#[inline]
pub fn blend_erase(dst: Pixel, amount: f32) -> Pixel {
    if amount <= 0.0 {
        return dst;
    }
    let keep = (1.0 - amount).max(0.0);
    let a = (dst.a as f32 * keep).round().clamp(0.0, 255.0) as u8;
    Pixel { a, ..dst }
}

/// Composite a whole row of layer pixels onto the accumulated output row.
pub fn alpha_over_row(src: &[Pixel], dst: &mut [Pixel], opacity: f32) {
    for (d, s) in dst.iter_mut().zip(src) {
        if s.a == 0 {
            continue;
        }
        *d = alpha_over(*s, *d, opacity);
    }
}

/// Move `dst` towards `src` by `t` (0..1), mixing colour weighted by alpha
/// so transparent pixels don't drag colour towards black.
#[inline]
pub fn mix(dst: Pixel, src: Pixel, t: f32) -> Pixel {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.0 {
        return dst;
    }
    let da = dst.a as f32;
    let sa = src.a as f32;
    let a = da + (sa - da) * t;
    if a <= 0.0 {
        return Pixel::TRANSPARENT;
    }
    let weighted = dst.to_f32x4() * f32x4::splat(da * (1.0 - t)) + src.to_f32x4() * f32x4::splat(sa * t);
    let mut lanes = (weighted / f32x4::splat(a)).to_array();
    lanes[3] = a;
    Pixel::from_f32x4(f32x4::from(lanes))
}
