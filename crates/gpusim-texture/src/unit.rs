use crate::cache::{
    read_direct, CacheOutcome, CacheStats, TexelLocation, TextureCache, TextureCacheConfig,
};
use crate::image::{ImageFace, TextureImage};
use crate::limits::MAX_TEXTURE_UNITS;
use crate::memory::TextureMemory;
use crate::state::{MagFilter, MinFilter, TextureBinding, TextureTarget, WrapMode};
use crate::{Result, TextureError};
use gpusim_vec::{frexp, Vec4};
use tracing::{trace, warn};

const OPAQUE_RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const OPAQUE_GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);

/// Replaces sampled colors with cache diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheDebugView {
    #[default]
    Off,
    /// Texels that caused a cold miss come back opaque red.
    ColdMiss,
    /// Texels that missed (cold or not) come back opaque green.
    Miss,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUnitConfig {
    /// `None` reads every texel straight from memory.
    pub cache: Option<TextureCacheConfig>,
    pub debug_view: CacheDebugView,
}

impl Default for TextureUnitConfig {
    fn default() -> Self {
        Self {
            cache: Some(TextureCacheConfig::default()),
            debug_view: CacheDebugView::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lod {
    /// Derive the level from screen-space derivatives of the (normalized) coordinate.
    Auto { ddx: Vec4, ddy: Vec4 },
    /// Use this level; the fractional part blends towards the next one.
    Explicit(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRequest {
    /// Normalized coordinate; `s, t` for 2D targets, a direction `s, t, p` for cube maps.
    pub coord: Vec4,
    pub lod: Lod,
    pub target: TextureTarget,
    pub unit: usize,
}

/// The image a sample resolved to, copied out of the binding.
#[derive(Clone, Copy)]
struct Surface {
    image: TextureImage,
    face: ImageFace,
    unit: u32,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
}

/// Texture sampling unit: per-unit bindings in front of an optional texel cache.
pub struct TextureUnit {
    bindings: [TextureBinding; MAX_TEXTURE_UNITS],
    cache: Option<TextureCache>,
    debug_view: CacheDebugView,
}

impl TextureUnit {
    pub fn new(config: TextureUnitConfig) -> Result<Self> {
        let cache = config.cache.map(TextureCache::new).transpose()?;
        Ok(Self {
            bindings: [TextureBinding::default(); MAX_TEXTURE_UNITS],
            cache,
            debug_view: config.debug_view,
        })
    }

    pub fn bind(&mut self, unit: usize, binding: TextureBinding) -> Result<()> {
        let slot = self
            .bindings
            .get_mut(unit)
            .ok_or(TextureError::UnitOutOfRange {
                unit,
                max: MAX_TEXTURE_UNITS - 1,
            })?;
        *slot = binding;
        Ok(())
    }

    pub fn cache(&self) -> Option<&TextureCache> {
        self.cache.as_ref()
    }

    /// All zero when running without a cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.as_ref().map(TextureCache::stats).unwrap_or_default()
    }

    pub fn clear_cache(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }

    pub fn set_debug_view(&mut self, view: CacheDebugView) {
        self.debug_view = view;
    }

    /// Filtered sample. Never fails; problems are logged and produce transparent black.
    pub fn sample(&mut self, mem: &mut dyn TextureMemory, req: &SampleRequest) -> Vec4 {
        let Some(binding) = self.bindings.get(req.unit) else {
            warn!(unit = req.unit, "texture unit out of range");
            return Vec4::TRANSPARENT_BLACK;
        };

        let (face, image, s, t) = match req.target {
            TextureTarget::Texture2D => (
                ImageFace::Texture2D,
                binding.texture_2d,
                req.coord.s(),
                req.coord.t(),
            ),
            TextureTarget::Cube => {
                let (face, s, t) = cube_face(req.coord);
                let index = face.cube_index().unwrap_or(0);
                (face, binding.cube_faces[index], s, t)
            }
        };
        let surface = Surface {
            image,
            face,
            unit: req.unit as u32,
            wrap_s: binding.wrap_s,
            wrap_t: binding.wrap_t,
        };
        let (min_filter, mag_filter) = (binding.min_filter, binding.mag_filter);
        let max_anisotropy = binding.max_anisotropy;

        let Some(max_level) = image.last_level().map(|l| l as i32) else {
            warn!(unit = req.unit, ?face, "sampling unbound texture");
            return Vec4::TRANSPARENT_BLACK;
        };

        let (w0, h0) = (image.base_width() as f32, image.base_height() as f32);
        let coord = Vec4::new(s * w0, t * h0, req.coord.p(), req.coord.q());

        let (dominant, loser, major_axis, lod, blend) = match req.lod {
            Lod::Auto { ddx, ddy } => {
                let dx = (ddx.s() * w0, ddx.t() * h0);
                let dy = (ddy.s() * w0, ddy.t() * h0);
                let scale_x = dx.0.abs().max(dx.1.abs());
                let scale_y = dy.0.abs().max(dy.1.abs());
                let (dominant, loser, axis) = if scale_x > scale_y {
                    (scale_x, scale_y, dx)
                } else {
                    (scale_y, scale_x, dy)
                };
                let (lod, blend) = lod_from_scale(dominant);
                (dominant, Some(loser), axis, lod, blend)
            }
            Lod::Explicit(level) => {
                // Clamped before the split so a negative level cannot blend towards level 1.
                let level = level.clamp(0.0, max_level as f32);
                let lod = level.floor();
                // Forces the minification path; magnification ignores the level.
                (2.0, None, (0.0, 0.0), lod as i32, level - lod)
            }
        };
        let lod = lod.clamp(0, max_level);
        trace!(unit = req.unit, lod, blend, dominant, "texture sample");

        if dominant > 1.0 {
            match min_filter {
                MinFilter::Nearest => {
                    let c = wrap(&surface, coord.s(), coord.t(), 0);
                    self.texel(mem, &surface, c, 0)
                }
                MinFilter::Linear => self.bilinear(mem, &surface, coord, 0),
                MinFilter::NearestMipmapNearest => {
                    let c = scale_down(wrap(&surface, coord.s(), coord.t(), 0), lod);
                    self.texel(mem, &surface, c, lod)
                }
                MinFilter::LinearMipmapNearest => self.bilinear(mem, &surface, coord, lod),
                MinFilter::NearestMipmapLinear => {
                    let c = scale_down(wrap(&surface, coord.s(), coord.t(), 0), lod);
                    let near = self.texel(mem, &surface, c, lod);
                    if lod < max_level {
                        let far = self.texel(mem, &surface, scale_down(c, 1), lod + 1);
                        near * (1.0 - blend) + far * blend
                    } else {
                        near
                    }
                }
                MinFilter::LinearMipmapLinear => {
                    let samples = match loser {
                        Some(loser) => sample_count(dominant, loser, max_anisotropy),
                        None => 1,
                    };
                    if samples == 1 {
                        return self.trilinear(mem, &surface, coord, lod, blend, max_level);
                    }

                    let (lod, blend) = lod_from_scale(dominant / samples as f32);
                    let lod = lod.clamp(0, max_level);
                    let n = samples as f32;
                    let mut sum = Vec4::ZERO;
                    for i in 0..samples {
                        let k = (2.0 * i as f32 - (n - 1.0)) / (2.0 * n);
                        let mut c = coord;
                        c.set_s(coord.s() + major_axis.0 * k);
                        c.set_t(coord.t() + major_axis.1 * k);
                        sum = sum + self.trilinear(mem, &surface, c, lod, blend, max_level);
                    }
                    sum / n
                }
                MinFilter::Unknown(raw) => {
                    warn!(unit = req.unit, raw, "unknown minification filter");
                    Vec4::TRANSPARENT_BLACK
                }
            }
        } else {
            match mag_filter {
                MagFilter::Nearest => {
                    let c = wrap(&surface, coord.s(), coord.t(), 0);
                    self.texel(mem, &surface, c, 0)
                }
                MagFilter::Linear => self.bilinear(mem, &surface, coord, 0),
                MagFilter::Unknown(raw) => {
                    warn!(unit = req.unit, raw, "unknown magnification filter");
                    Vec4::TRANSPARENT_BLACK
                }
            }
        }
    }

    /// Unfiltered fetch from the unit's 2D image at integer texel coordinates `coord.s, coord.t`.
    pub fn fetch(
        &mut self,
        mem: &mut dyn TextureMemory,
        unit: usize,
        coord: Vec4,
        level: i32,
    ) -> Vec4 {
        let Some(binding) = self.bindings.get(unit) else {
            warn!(unit, "texture unit out of range");
            return Vec4::TRANSPARENT_BLACK;
        };
        let surface = Surface {
            image: binding.texture_2d,
            face: ImageFace::Texture2D,
            unit: unit as u32,
            wrap_s: binding.wrap_s,
            wrap_t: binding.wrap_t,
        };
        self.texel(mem, &surface, (coord.s(), coord.t()), level)
    }

    fn trilinear(
        &mut self,
        mem: &mut dyn TextureMemory,
        surface: &Surface,
        coord: Vec4,
        lod: i32,
        blend: f32,
        max_level: i32,
    ) -> Vec4 {
        let next = (lod + 1).min(max_level);
        if blend <= 0.01 {
            self.bilinear(mem, surface, coord, lod)
        } else if blend >= 0.99 {
            self.bilinear(mem, surface, coord, next)
        } else {
            let a = self.bilinear(mem, surface, coord, lod);
            let b = self.bilinear(mem, surface, coord, next);
            a * (1.0 - blend) + b * blend
        }
    }

    /// `coord` is in base-level texels.
    fn bilinear(
        &mut self,
        mem: &mut dyn TextureMemory,
        surface: &Surface,
        coord: Vec4,
        level: i32,
    ) -> Vec4 {
        let scale = (1u32 << level.clamp(0, 31)) as f32;
        let s = coord.s() / scale - 0.5;
        let t = coord.t() / scale - 0.5;

        // 2 3
        // 0 1
        let corners = [(s, t), (s + 1.0, t), (s, t + 1.0), (s + 1.0, t + 1.0)]
            .map(|(s, t)| wrap(surface, s, t, level));
        let mut texels = [Vec4::ZERO; 4];
        for (texel, &c) in texels.iter_mut().zip(corners.iter()) {
            *texel = self.texel(mem, surface, c, level);
        }

        let u = corners[0].0.fract();
        let v = corners[0].1.fract();
        let bottom = texels[0] * (1.0 - u) + texels[1] * u;
        let top = texels[2] * (1.0 - u) + texels[3] * u;
        bottom * (1.0 - v) + top * v
    }

    /// Reads one texel at level-space coordinates.
    fn texel(
        &mut self,
        mem: &mut dyn TextureMemory,
        surface: &Surface,
        (s, t): (f32, f32),
        level: i32,
    ) -> Vec4 {
        if !surface.image.is_bound() {
            warn!(unit = surface.unit, face = ?surface.face, "sampling unbound texture");
            return Vec4::TRANSPARENT_BLACK;
        }
        let Some(lv) = u32::try_from(level)
            .ok()
            .and_then(|l| surface.image.level(l))
            .copied()
        else {
            let max_level = surface.image.last_level();
            warn!(level, ?max_level, "mip level beyond end of chain");
            return Vec4::TRANSPARENT_BLACK;
        };

        let in_range = s >= 0.0 && t >= 0.0 && s < lv.width as f32 && t < lv.height as f32;
        if !in_range {
            warn!(
                s,
                t,
                width = lv.width,
                height = lv.height,
                level,
                "texel coordinate out of range"
            );
            return Vec4::TRANSPARENT_BLACK;
        }

        let loc = TexelLocation {
            image: &surface.image,
            face: surface.face,
            level: level as u32,
            unit: surface.unit,
            u: s as u32,
            v: t as u32,
        };
        let Some(cache) = &mut self.cache else {
            return read_direct(mem, &loc);
        };
        let (color, outcome) = cache.read(mem, &loc);
        match (self.debug_view, outcome) {
            (CacheDebugView::ColdMiss, CacheOutcome::ColdMiss) => OPAQUE_RED,
            (CacheDebugView::Miss, CacheOutcome::Miss | CacheOutcome::ColdMiss) => OPAQUE_GREEN,
            _ => color,
        }
    }
}

/// Splits a gradient magnitude into `(level, blend)`; `blend` lies in `[0, 1)` for positive input.
fn lod_from_scale(scale: f32) -> (i32, f32) {
    let (mantissa, exp) = frexp(scale);
    (exp - 1, mantissa * 2.0 - 1.0)
}

/// Anisotropic sample count: the gradient ratio capped at `max`, rounded down to a power of two.
fn sample_count(dominant: f32, loser: f32, max: u8) -> u32 {
    let ratio = dominant / loser;
    let n = if ratio.is_finite() {
        ratio.floor() as u32
    } else {
        u32::MAX
    };
    let n = n.min(u32::from(max)).max(1);
    1 << (31 - n.leading_zeros())
}

fn scale_down((s, t): (f32, f32), level: i32) -> (f32, f32) {
    let scale = (1u32 << level.clamp(0, 31)) as f32;
    (s / scale, t / scale)
}

fn wrap(surface: &Surface, s: f32, t: f32, level: i32) -> (f32, f32) {
    let lv = usize::try_from(level)
        .ok()
        .and_then(|l| surface.image.levels.get(l))
        .copied()
        .unwrap_or_default();
    (
        wrap_axis(surface.wrap_s, s, lv.width, "s"),
        wrap_axis(surface.wrap_t, t, lv.height, "t"),
    )
}

/// Wraps one coordinate against a level dimension.
pub fn wrap_axis(mode: WrapMode, x: f32, dim: u32, axis: &'static str) -> f32 {
    match mode {
        WrapMode::Repeat => {
            if dim == 0 {
                return x;
            }
            let d = dim as f32;
            let r = x - d * (x / d).floor();
            // -epsilon + d rounds up to d.
            if r >= d {
                0.0
            } else {
                r
            }
        }
        WrapMode::ClampToEdge => x.clamp(0.0, (dim as f32 - 1.0).max(0.0)),
        WrapMode::Unknown(raw) => {
            warn!(raw, axis, "unknown texture wrap mode; coordinate passed through");
            x
        }
    }
}

/// Picks the cube face for direction `(s, t, p)` and projects onto it.
///
/// Ties go to the later axis (`t` over `s`, `p` over both).
fn cube_face(c: Vec4) -> (ImageFace, f32, f32) {
    let (s, t, p) = (c.s(), c.t(), c.p());
    let (abs_s, abs_t, abs_p) = (s.abs(), t.abs(), p.abs());

    let project = |a: f32, b: f32, major: f32| (a / major / 2.0 + 0.5, b / major / 2.0 + 0.5);
    let z_face = || {
        let face = if p < 0.0 {
            ImageFace::NegativeZ
        } else {
            ImageFace::PositiveZ
        };
        let (sc, tc) = project(if p < 0.0 { -s } else { s }, -t, abs_p);
        (face, sc, tc)
    };

    if abs_s > abs_t {
        if abs_s > abs_p {
            let face = if s < 0.0 {
                ImageFace::NegativeX
            } else {
                ImageFace::PositiveX
            };
            let (sc, tc) = project(if s < 0.0 { p } else { -p }, -t, abs_s);
            (face, sc, tc)
        } else {
            z_face()
        }
    } else if abs_t > abs_p {
        let face = if t < 0.0 {
            ImageFace::NegativeY
        } else {
            ImageFace::PositiveY
        };
        let (sc, tc) = project(s, if t < 0.0 { -p } else { p }, abs_t);
        (face, sc, tc)
    } else {
        z_face()
    }
}
