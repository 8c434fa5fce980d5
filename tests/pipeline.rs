use gpusim::shader::{Instruction, Opcode, Operand, RunSummary, TextureRef, WriteMask};
use gpusim::texture::{MagFilter, MinFilter, MipChainBuilder, TextureBinding, TextureImage};
use gpusim::{
    FlatMemory, Lane, LaneMask, Program, RunParams, ShaderEngine, ShaderMode, TextureUnit,
    TextureUnitConfig, Vec4,
};
use pretty_assertions::assert_eq;

const MIN_FILTERS: [MinFilter; 6] = [
    MinFilter::Nearest,
    MinFilter::Linear,
    MinFilter::NearestMipmapNearest,
    MinFilter::LinearMipmapNearest,
    MinFilter::NearestMipmapLinear,
    MinFilter::LinearMipmapLinear,
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn assert_close(actual: Vec4, expected: Vec4) {
    let diff = (actual - expected).abs();
    assert!(
        diff.0.iter().all(|&d| d < 1e-5),
        "expected {expected}, got {actual}"
    );
}

fn rgb(r: f32, g: f32, b: f32) -> Vec4 {
    Vec4::new(r / 255.0, g / 255.0, b / 255.0, 1.0)
}

/// `TEX color, a2, texture[0], 2D`
fn textured() -> Program {
    Program::new(vec![Instruction::new(Opcode::Tex)
        .dst(Operand::color())
        .src(Operand::attribute(2))
        .texture(TextureRef::texture_2d(0))])
    .unwrap()
}

/// A 2x2 quad anchored at `(s, t)` whose lanes are `step` apart in texture space.
fn quad(s: f32, t: f32, step: f32) -> Vec<Lane> {
    (0..4)
        .map(|i| {
            let ds = (i % 2) as f32 * step;
            let dt = (i / 2) as f32 * step;
            Lane::new().with_attribute(2, Vec4::new(s + ds, t + dt, 0.0, 1.0))
        })
        .collect()
}

struct Gpu {
    engine: ShaderEngine,
    textures: TextureUnit,
    memory: FlatMemory,
}

impl Gpu {
    fn new() -> Self {
        init_tracing();
        Self {
            engine: ShaderEngine::new(),
            textures: TextureUnit::new(TextureUnitConfig::default()).unwrap(),
            memory: FlatMemory::new(1 << 16),
        }
    }

    fn run(
        &mut self,
        program: &Program,
        lanes: &mut [Lane],
        enabled: LaneMask,
        mode: ShaderMode,
        uniforms: &[Vec4],
    ) -> RunSummary {
        self.engine
            .run(
                lanes,
                RunParams {
                    program,
                    uniforms,
                    enabled,
                    mode,
                    textures: &mut self.textures,
                    memory: &mut self.memory,
                },
            )
            .unwrap()
    }

    /// 4x4 texture whose texel `(x, y)` is `(40x, 40y, 0, 255)`.
    fn bind_gradient(&mut self) {
        let mut data = Vec::new();
        for y in 0..4u8 {
            for x in 0..4u8 {
                data.extend_from_slice(&[x * 40, y * 40, 0, 255]);
            }
        }
        let image = MipChainBuilder::new()
            .build(&mut self.memory, 0, 4, 4, &data)
            .unwrap();
        self.textures
            .bind(
                0,
                TextureBinding::with_2d(image)
                    .filters(MinFilter::LinearMipmapLinear, MagFilter::Linear),
            )
            .unwrap();
    }
}

#[test]
fn one_texel_quad_gradient_samples_bilinear_at_level_zero() {
    let mut gpu = Gpu::new();
    gpu.bind_gradient();

    let mut lanes = quad(1.75 / 4.0, 2.0 / 4.0, 0.25);
    gpu.run(&textured(), &mut lanes, LaneMask::ALL, ShaderMode::Fragment, &[]);

    let colors: Vec<Vec4> = lanes.iter().map(|l| l.attributes[1]).collect();
    assert_close(colors[0], rgb(50.0, 60.0, 0.0));
    assert_close(colors[1], rgb(90.0, 60.0, 0.0));
    assert_close(colors[2], rgb(50.0, 100.0, 0.0));
    assert_close(colors[3], rgb(90.0, 100.0, 0.0));
}

#[test]
fn partial_quad_uses_helper_lanes_for_gradients() {
    let mut gpu = Gpu::new();
    gpu.bind_gradient();

    let mut lanes = quad(1.75 / 4.0, 2.0 / 4.0, 0.25);
    let summary = gpu.run(
        &textured(),
        &mut lanes,
        LaneMask::NONE.with(0),
        ShaderMode::Fragment,
        &[],
    );
    assert_eq!(summary.helper_lanes, 3);
    assert_close(lanes[0].attributes[1], rgb(50.0, 60.0, 0.0));
    for lane in &lanes[1..] {
        assert_eq!(lane.attributes[1], Vec4::ZERO);
    }
}

#[test]
fn uniform_texture_is_constant_under_every_filter_and_scale() {
    let mut gpu = Gpu::new();
    let image = TextureImage::solid(&mut gpu.memory, 0x400, 16, 16, [200, 100, 50, 255]).unwrap();
    let expected = rgb(200.0, 100.0, 50.0);

    for min in MIN_FILTERS {
        for mag in [MagFilter::Nearest, MagFilter::Linear] {
            let binding = TextureBinding::with_2d(image)
                .filters(min, mag)
                .anisotropy(4);
            gpu.textures.bind(0, binding).unwrap();
            for step in [1.0 / 64.0, 1.0 / 16.0, 1.0 / 4.0, 0.5, 3.0] {
                let mut lanes = quad(0.3, 0.6, step);
                gpu.run(&textured(), &mut lanes, LaneMask::ALL, ShaderMode::Fragment, &[]);
                for lane in &lanes {
                    assert_close(lane.attributes[1], expected);
                }
            }
        }
    }
}

#[test]
fn cache_persists_across_runs() {
    let mut gpu = Gpu::new();
    gpu.bind_gradient();
    let program = textured();

    let mut lanes = quad(1.75 / 4.0, 2.0 / 4.0, 0.25);
    gpu.run(&program, &mut lanes, LaneMask::ALL, ShaderMode::Fragment, &[]);
    let first = gpu.textures.cache_stats();
    let bursts = gpu.memory.stats().bursts;
    assert!(first.misses > 0);
    assert_eq!(first.cold_misses, first.misses);

    let mut lanes = quad(1.75 / 4.0, 2.0 / 4.0, 0.25);
    gpu.run(&program, &mut lanes, LaneMask::ALL, ShaderMode::Fragment, &[]);
    let second = gpu.textures.cache_stats();
    assert_eq!(second.misses, first.misses);
    assert!(second.hits > first.hits);
    assert_eq!(gpu.memory.stats().bursts, bursts);

    gpu.textures.clear_cache();
    let mut lanes = quad(1.75 / 4.0, 2.0 / 4.0, 0.25);
    gpu.run(&program, &mut lanes, LaneMask::ALL, ShaderMode::Fragment, &[]);
    assert!(gpu.textures.cache_stats().cold_misses > 0);
}

#[test]
fn vertex_transform_with_uniform_matrix() {
    let mut gpu = Gpu::new();
    // Rows of diag(2, 3, 4, 1) with a translation of +1 on x.
    let uniforms = [
        Vec4::new(2.0, 0.0, 0.0, 1.0),
        Vec4::new(0.0, 3.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 4.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    ];
    let masks = [WriteMask::X, WriteMask::Y, WriteMask::Z, WriteMask::W];
    let program = Program::new(
        masks
            .iter()
            .enumerate()
            .map(|(row, &mask)| {
                Instruction::new(Opcode::Dp4)
                    .dst(Operand::attribute(0).mask(mask))
                    .src(Operand::attribute(0))
                    .src(Operand::uniform(row as i32))
            })
            .collect(),
    )
    .unwrap();

    let mut lanes: Vec<Lane> = (0..3)
        .map(|i| Lane::new().with_attribute(0, Vec4::new(i as f32, 1.0, -1.0, 1.0)))
        .collect();
    let summary = gpu.run(&program, &mut lanes, LaneMask::ALL, ShaderMode::Vertex, &uniforms);

    // Rows read the source fetched before their own write, but later rows see earlier writes.
    // Only x changes before the others are computed, and no other row reads x.
    for (i, lane) in lanes.iter().enumerate() {
        assert_eq!(lane.attributes[0], Vec4::new(2.0 * i as f32 + 1.0, 3.0, -4.0, 1.0));
    }
    assert_eq!(summary.instructions, 12);
    // Four DP4 per lane: (3 + 1) ops each.
    assert_eq!(summary.scalar_ops, 48);
}
