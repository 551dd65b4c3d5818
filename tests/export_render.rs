use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use corrpt::effects::builtin;
use corrpt::export::{export_image, ExportFormat, ExportRequest, ExportSink, ExportedImage, FileSink};
use corrpt::{CompositorError, DecodedImage, EffectChain, GpuContext};

fn unique_temp_dir() -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic enough for tests")
        .as_nanos();
    std::env::temp_dir().join(format!("corrpt-export-{nonce}"))
}

fn red_image(width: u32, height: u32) -> DecodedImage {
    DecodedImage::from_rgba(width, height, [255, 0, 0, 255].repeat((width * height) as usize), "red")
        .expect("valid pixel buffer")
}

fn decode(bytes: &[u8], format: image::ImageFormat) -> Vec<u8> {
    image::load_from_memory_with_format(bytes, format)
        .expect("decode export")
        .to_rgba8()
        .into_raw()
}

struct FailingSink;

impl ExportSink for FailingSink {
    fn deliver(&mut self, _image: ExportedImage) -> Result<(), CompositorError> {
        Err(CompositorError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only destination",
        )))
    }
}

#[test]
fn export_renders_chain_at_native_resolution() {
    let Some(gpu) = GpuContext::new() else {
        eprintln!("No adapter available; skipping export render test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let image = red_image(3, 2);
    let mut chain = EffectChain::new();
    chain.add(&registry, "brightnessInvert");

    let mut sink: Vec<ExportedImage> = Vec::new();
    let report = export_image(&gpu, &registry, ExportRequest::new(&image, chain.clone(), ExportFormat::Png), &mut sink)
        .expect("export succeeds");

    assert_eq!(report.file_name, "red__corrpt.png");
    assert_eq!((report.width, report.height), (3, 2));
    assert_eq!(report.passes, 1);
    // pair (2) + one program + display program + display target + source
    assert_eq!(report.released, 6);

    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].mime, "image/png");
    assert_eq!(sink[0].bytes.len(), report.size);
    assert_eq!(
        decode(&sink[0].bytes, image::ImageFormat::Png),
        [0, 255, 255, 255].repeat(6)
    );
}

#[test]
fn export_of_empty_chain_reproduces_source() {
    let Some(gpu) = GpuContext::new() else {
        eprintln!("No adapter available; skipping empty export test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let image = red_image(5, 3);

    let mut sink: Vec<ExportedImage> = Vec::new();
    let report = export_image(
        &gpu,
        &registry,
        ExportRequest::new(&image, EffectChain::new(), ExportFormat::Png),
        &mut sink,
    )
    .unwrap();

    assert_eq!(report.passes, 0);
    assert_eq!(decode(&sink[0].bytes, image::ImageFormat::Png), image.pixels);
}

#[test]
fn export_writes_suffixed_file() {
    let Some(gpu) = GpuContext::new() else {
        eprintln!("No adapter available; skipping file export test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let image = red_image(4, 4);
    let mut chain = EffectChain::new();
    chain.add(&registry, "crt");
    chain.add(&registry, "noise");

    let dir = unique_temp_dir();
    let mut sink = FileSink::new(&dir);
    let report = export_image(
        &gpu,
        &registry,
        ExportRequest::new(&image, chain, ExportFormat::Jpeg).with_jpeg_quality(80),
        &mut sink,
    )
    .unwrap();

    let path = dir.join("red__corrpt.jpg");
    assert_eq!(report.file_name, "red__corrpt.jpg");
    assert_eq!(sink.written(), &[path.clone()]);
    let bytes = fs::read(&path).expect("export written");
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn export_does_not_touch_live_chain() {
    let Some(gpu) = GpuContext::new() else {
        eprintln!("No adapter available; skipping snapshot test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let image = red_image(2, 2);
    let mut live = EffectChain::new();
    live.add(&registry, "brightnessInvert");

    let snapshot = live.clone();
    live.remove("brightnessInvert");

    let mut sink: Vec<ExportedImage> = Vec::new();
    let report = export_image(&gpu, &registry, ExportRequest::new(&image, snapshot, ExportFormat::WebP), &mut sink)
        .unwrap();

    assert_eq!(report.passes, 1);
    assert!(live.is_empty());
    assert_eq!(
        decode(&sink[0].bytes, image::ImageFormat::WebP),
        [0, 255, 255, 255].repeat(4)
    );
}

#[test]
fn sink_failure_is_reported() {
    let Some(gpu) = GpuContext::new() else {
        eprintln!("No adapter available; skipping sink failure test.");
        return;
    };
    let registry = builtin::builtin_registry();
    let image = red_image(2, 2);
    let mut chain = EffectChain::new();
    chain.add(&registry, "rgbShift");

    let result = export_image(
        &gpu,
        &registry,
        ExportRequest::new(&image, chain, ExportFormat::Png),
        &mut FailingSink,
    );
    assert!(matches!(result, Err(CompositorError::Io(_))));
}
