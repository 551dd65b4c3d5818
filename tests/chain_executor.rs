use corrpt::effects::builtin::{self, neutral_parameters};
use corrpt::effects::{
    ChainExecutor, EffectCategory, EffectChain, EffectDefinition, EffectRegistry, FrameContext,
    ParameterValue, ProgramCache, ProgramCacheEntry, RenderTargetPair,
};
use corrpt::shaders::PASSTHROUGH_SHADER;
use corrpt::{GpuContext, GpuTexture};

fn headless() -> Option<GpuContext> {
    GpuContext::new()
}

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    rgba.repeat((width * height) as usize)
}

fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width.max(2).saturating_sub(1)).min(255) as u8);
            pixels.push((y * 255 / height.max(2).saturating_sub(1)).min(255) as u8);
            pixels.push(((x + y) * 37 % 256) as u8);
            pixels.push(255);
        }
    }
    pixels
}

/// Run `chain` over `pixels` with a fresh pair and cache, return the output
/// pixels and the pass count.
fn render(
    gpu: &GpuContext,
    registry: &EffectRegistry,
    chain: &EffectChain,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> (Vec<u8>, usize) {
    let source = GpuTexture::from_rgba(gpu, width, height, pixels).expect("upload source");
    let targets = RenderTargetPair::create(gpu, width, height, wgpu::FilterMode::Nearest)
        .expect("create render targets");
    let mut cache = ProgramCache::new();
    let frame = FrameContext::new(width, height, 0.0);

    let output = ChainExecutor::new(registry)
        .execute(gpu, &source, chain, &mut cache, &targets, &frame)
        .expect("execute chain");
    let passes = output.passes;
    let result = output.texture.read_pixels(gpu).expect("read back output");
    (result, passes)
}

fn chain_of(registry: &EffectRegistry, ids: &[&str]) -> EffectChain {
    let mut chain = EffectChain::new();
    for id in ids {
        assert!(chain.add(registry, id), "could not add {id}");
    }
    chain
}

#[test]
fn empty_chain_returns_source_reference_without_passes() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping empty chain test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let source = GpuTexture::from_rgba(&gpu, 4, 4, &gradient(4, 4)).unwrap();
    let targets = RenderTargetPair::create(&gpu, 4, 4, wgpu::FilterMode::Nearest).unwrap();
    let mut cache = ProgramCache::new();
    let frame = FrameContext::new(4, 4, 0.0);

    let output = ChainExecutor::new(&registry)
        .execute(&gpu, &source, &EffectChain::new(), &mut cache, &targets, &frame)
        .unwrap();

    assert!(std::ptr::eq(output.texture, &source));
    assert_eq!(output.passes, 0);
    assert!(output.is_passthrough());
    assert!(cache.is_empty());
}

#[test]
fn passthrough_reproduces_source_exactly() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping passthrough test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let pixels = gradient(7, 5);
    let chain = chain_of(&registry, &[builtin::PASSTHROUGH_ID]);

    let (output, passes) = render(&gpu, &registry, &chain, 7, 5, &pixels);
    assert_eq!(passes, 1);
    assert_eq!(output, pixels);
}

#[test]
fn brightness_invert_turns_red_into_cyan() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping brightness invert test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let chain = chain_of(&registry, &["brightnessInvert"]);

    let (output, passes) = render(&gpu, &registry, &chain, 2, 2, &solid(2, 2, [255, 0, 0, 255]));
    assert_eq!(passes, 1);
    assert_eq!(output, solid(2, 2, [0, 255, 255, 255]));
}

#[test]
fn chain_order_changes_output() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping order sensitivity test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let pixels = gradient(4, 4);

    let configure = |chain: &mut EffectChain| {
        chain.set_parameter("crt", "vignette", ParameterValue::Float(1.0));
        chain.set_parameter("crt", "lineIntensity", ParameterValue::Float(0.0));
        chain.set_parameter("crt", "curvature", ParameterValue::Float(0.0));
    };

    let mut invert_first = chain_of(&registry, &["brightnessInvert", "crt"]);
    configure(&mut invert_first);
    let mut crt_first = invert_first.clone();
    crt_first.reorder(vec!["crt".to_string(), "brightnessInvert".to_string()]);

    let (a, passes_a) = render(&gpu, &registry, &invert_first, 4, 4, &pixels);
    let (b, passes_b) = render(&gpu, &registry, &crt_first, 4, 4, &pixels);

    assert_eq!((passes_a, passes_b), (2, 2));
    assert_ne!(a, b);
}

#[test]
fn unregistered_effect_is_skipped() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping skip-on-missing test.");
        return;
    };
    let registry = builtin::builtin_registry();

    // Build the chain against a catalog that knows an extra id, then run it
    // against one that does not.
    let mut wider = builtin::builtin_registry();
    wider.register(EffectDefinition::new("ghost", "Ghost", EffectCategory::Color, PASSTHROUGH_SHADER));

    let mut with_ghost = chain_of(&wider, &["brightnessInvert", "ghost", "rgbShift"]);
    with_ghost.set_parameter("rgbShift", "intensity", ParameterValue::Float(0.5));
    let mut without_ghost = chain_of(&registry, &["brightnessInvert", "rgbShift"]);
    without_ghost.set_parameter("rgbShift", "intensity", ParameterValue::Float(0.5));

    let pixels = gradient(16, 8);
    let (a, passes_a) = render(&gpu, &registry, &with_ghost, 16, 8, &pixels);
    let (b, passes_b) = render(&gpu, &registry, &without_ghost, 16, 8, &pixels);

    assert_eq!(passes_a, 2);
    assert_eq!(passes_b, 2);
    assert_eq!(a, b);
}

#[test]
fn chain_of_only_unregistered_effects_returns_source() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping all-missing test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let mut wider = builtin::builtin_registry();
    wider.register(EffectDefinition::new("ghost", "Ghost", EffectCategory::Color, PASSTHROUGH_SHADER));
    let chain = chain_of(&wider, &["ghost"]);

    let source = GpuTexture::from_rgba(&gpu, 4, 4, &gradient(4, 4)).unwrap();
    let targets = RenderTargetPair::create(&gpu, 4, 4, wgpu::FilterMode::Nearest).unwrap();
    let mut cache = ProgramCache::new();
    let output = ChainExecutor::new(&registry)
        .execute(&gpu, &source, &chain, &mut cache, &targets, &FrameContext::new(4, 4, 0.0))
        .unwrap();

    assert!(std::ptr::eq(output.texture, &source));
    assert_eq!(output.passes, 0);
}

#[test]
fn broken_shader_is_skipped_and_remembered() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping compile failure test.");
        return;
    };
    let mut registry = builtin::builtin_registry();
    registry.register(EffectDefinition::new(
        "broken",
        "Broken",
        EffectCategory::Color,
        "@fragment fn fs_main() -> @location(0) vec4<f32> { return not_a_function(); }",
    ));

    let pixels = solid(2, 2, [255, 0, 0, 255]);
    let chain = chain_of(&registry, &["broken", "brightnessInvert"]);

    let source = GpuTexture::from_rgba(&gpu, 2, 2, &pixels).unwrap();
    let targets = RenderTargetPair::create(&gpu, 2, 2, wgpu::FilterMode::Nearest).unwrap();
    let mut cache = ProgramCache::new();
    let output = ChainExecutor::new(&registry)
        .execute(&gpu, &source, &chain, &mut cache, &targets, &FrameContext::new(2, 2, 0.0))
        .unwrap();

    assert_eq!(output.passes, 1);
    assert_eq!(output.texture.read_pixels(&gpu).unwrap(), solid(2, 2, [0, 255, 255, 255]));
    assert!(cache.failure("broken").is_some());
    assert!(!cache.contains("broken"));
    assert!(cache.contains("brightnessInvert"));
}

#[test]
fn neutral_parameters_match_empty_chain() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping neutral parameter test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let pixels = gradient(200, 100);
    let (baseline, baseline_passes) = render(&gpu, &registry, &EffectChain::new(), 200, 100, &pixels);
    assert_eq!(baseline_passes, 0);
    assert_eq!(baseline, pixels);

    for effect in registry.effects() {
        let Some(neutral) = neutral_parameters(&effect.id) else {
            continue;
        };
        let mut chain = chain_of(&registry, &[effect.id.as_str()]);
        for (name, value) in neutral {
            assert!(chain.set_parameter(&effect.id, name, value));
        }

        let (output, passes) = render(&gpu, &registry, &chain, 200, 100, &pixels);
        assert_eq!(passes, 1, "{} did not run", effect.id);
        assert!(output == baseline, "{} is not an identity at its neutral value", effect.id);
    }
}

#[test]
fn repeated_execution_is_deterministic() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping determinism test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let chain = chain_of(&registry, &["noise", "rgbShift", "sliceShift"]);
    let pixels = gradient(32, 16);

    let source = GpuTexture::from_rgba(&gpu, 32, 16, &pixels).unwrap();
    let targets = RenderTargetPair::create(&gpu, 32, 16, wgpu::FilterMode::Nearest).unwrap();
    let mut cache = ProgramCache::new();
    let frame = FrameContext::new(32, 16, 1.25);
    let executor = ChainExecutor::new(&registry);

    let first = executor
        .execute(&gpu, &source, &chain, &mut cache, &targets, &frame)
        .unwrap()
        .texture
        .read_pixels(&gpu)
        .unwrap();
    let second = executor
        .execute(&gpu, &source, &chain, &mut cache, &targets, &frame)
        .unwrap()
        .texture
        .read_pixels(&gpu)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.len(), 3);
}

#[test]
fn resources_are_released() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping resource accounting test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let ids = ["brightnessInvert", "rgbShift", "crt", "noise", "smear"];
    let mut chain = chain_of(&registry, &ids);

    let source = GpuTexture::from_rgba(&gpu, 8, 8, &gradient(8, 8)).unwrap();
    let mut targets = RenderTargetPair::create(&gpu, 8, 8, wgpu::FilterMode::Nearest).unwrap();
    let mut cache = ProgramCache::new();
    let frame = FrameContext::new(8, 8, 0.0);

    let passes = ChainExecutor::new(&registry)
        .execute(&gpu, &source, &chain, &mut cache, &targets, &frame)
        .unwrap()
        .passes;
    assert_eq!(passes, ids.len());
    assert_eq!(cache.len(), ids.len());

    for id in ids {
        assert!(chain.remove(id));
    }
    assert_eq!(cache.sync_with_chain(&chain), ids.len());
    assert_eq!(cache.len(), 0);

    assert_eq!(targets.live_buffers(), 2);
    assert_eq!(targets.dispose(), 2);
    assert_eq!(targets.live_buffers(), 0);
    assert_eq!(targets.dispose(), 0);
}

#[test]
fn disposed_targets_are_rejected() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping disposed target test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let chain = chain_of(&registry, &["brightnessInvert"]);
    let source = GpuTexture::from_rgba(&gpu, 2, 2, &solid(2, 2, [0, 0, 0, 255])).unwrap();
    let mut targets = RenderTargetPair::create(&gpu, 2, 2, wgpu::FilterMode::Nearest).unwrap();
    targets.dispose();

    let result = ChainExecutor::new(&registry).execute(
        &gpu,
        &source,
        &chain,
        &mut ProgramCache::new(),
        &targets,
        &FrameContext::new(2, 2, 0.0),
    );
    assert!(matches!(result, Err(corrpt::CompositorError::ResourceAllocation(_))));
}

#[test]
fn zero_sized_targets_fail_allocation() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping allocation failure test.");
        return;
    };
    let result = RenderTargetPair::create(&gpu, 0, 4, wgpu::FilterMode::Nearest);
    assert!(matches!(result, Err(corrpt::CompositorError::ResourceAllocation(_))));
}

#[test]
fn add_seeds_declared_defaults() {
    let registry = builtin::builtin_registry();
    for effect in registry.visible_effects() {
        let mut chain = EffectChain::new();
        assert!(chain.add(&registry, &effect.id));

        let params = chain.parameters(&effect.id).expect("parameters seeded");
        assert_eq!(params.len(), effect.parameters.len());
        for def in &effect.parameters {
            assert_eq!(params.get(&def.name), Some(&def.default_value()));
        }
    }
}

#[test]
fn every_builtin_shader_compiles() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping builtin compile test.");
        return;
    };
    let registry = builtin::builtin_registry();

    for effect in registry.effects() {
        let result = ProgramCacheEntry::compile(&gpu, effect);
        assert!(result.is_ok(), "{} failed to compile: {:?}", effect.id, result.err());
    }
}

#[test]
fn every_builtin_runs_as_a_single_pass() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping single pass test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let pixels = gradient(8, 8);

    for effect in registry.effects() {
        let chain = chain_of(&registry, &[effect.id.as_str()]);
        let (_, passes) = render(&gpu, &registry, &chain, 8, 8, &pixels);
        assert_eq!(passes, 1, "{} was skipped", effect.id);
    }
}

#[test]
fn bind_groups_are_reused_across_frames() {
    let Some(gpu) = headless() else {
        eprintln!("No adapter available; skipping bind group reuse test.");
        return;
    };
    let registry = builtin::builtin_registry();
    // The same effect id cannot appear twice, so the second pass reads a
    // different program; each program sees exactly one input per frame.
    let chain = chain_of(&registry, &["brightnessInvert", "rgbShift", "crt"]);

    let source = GpuTexture::from_rgba(&gpu, 8, 8, &gradient(8, 8)).unwrap();
    let targets = RenderTargetPair::create(&gpu, 8, 8, wgpu::FilterMode::Nearest).unwrap();
    let mut cache = ProgramCache::new();
    let frame = FrameContext::new(8, 8, 0.0);
    let executor = ChainExecutor::new(&registry);

    for _ in 0..4 {
        executor
            .execute(&gpu, &source, &chain, &mut cache, &targets, &frame)
            .unwrap();
    }

    for id in ["brightnessInvert", "rgbShift", "crt"] {
        let definition = registry.get(id).unwrap();
        let entry = cache.get_or_create(&gpu, &definition).unwrap();
        assert_eq!(entry.cached_bind_groups(), 1, "{id} rebuilt its bind group");
    }

    // A new source replaces the first program's input binding
    let other = GpuTexture::from_rgba(&gpu, 8, 8, &gradient(8, 8)).unwrap();
    executor
        .execute(&gpu, &other, &chain, &mut cache, &targets, &frame)
        .unwrap();
    let definition = registry.get("brightnessInvert").unwrap();
    assert_eq!(cache.get_or_create(&gpu, &definition).unwrap().cached_bind_groups(), 2);
}
