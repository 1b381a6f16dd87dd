//! End-to-end checks of both pipelines through the public API, using the
//! built-in classifier and the fallback background remover.

use clothing_service::config::{self, ServiceConfig};
use clothing_service::rejection::{Operation, RejectionKind};
use clothing_service::removal::RemovalMethod;
use clothing_service::service::ClothingService;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn encode(image: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 40])
    })
}

/// High-entropy pixels that PNG cannot compress much.
fn noise(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x1234_5678;
    RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    })
}

fn service() -> ClothingService {
    ClothingService::from_config(ServiceConfig::default()).unwrap()
}

#[test]
fn analyze_is_deterministic_and_bounded() {
    let bytes = encode(gradient(200, 200), ImageFormat::Png);
    let svc = service();
    let first = svc.analyze(&bytes).unwrap();
    let second = svc.analyze(&bytes).unwrap();
    assert_eq!(first, second);

    let attrs = &first.attributes;
    let catalog = &svc.config().catalog;
    assert_eq!(attrs.embedding.len(), 128);
    assert!((1..=3).contains(&attrs.styles.len()));
    assert!(catalog.clothing_types.contains(&attrs.clothing_type));
    assert!(catalog.colors.contains(&attrs.color));
    assert!(catalog.materials.contains(&attrs.material));
    assert!(catalog.patterns.contains(&attrs.pattern));
    assert_eq!(attrs.name, format!("{} {}", attrs.material, attrs.color));
    assert!(attrs.confidence > 0.0 && attrs.confidence <= 1.0);
    assert!(first.moderation.checked);
}

#[test]
fn separate_services_agree() {
    let bytes = encode(gradient(120, 80), ImageFormat::Jpeg);
    assert_eq!(
        service().analyze(&bytes).unwrap(),
        service().analyze(&bytes).unwrap()
    );
}

#[test]
fn concurrent_analysis_matches_sequential() {
    let bytes = encode(gradient(150, 150), ImageFormat::Png);
    let svc = service();
    let expected = svc.analyze(&bytes).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| svc.analyze(&bytes).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn skin_heavy_upload_is_blocked_with_reason() {
    let bytes = encode(
        RgbImage::from_pixel(100, 100, Rgb([220, 180, 150])),
        ImageFormat::Png,
    );
    let err = service().analyze(&bytes).unwrap_err();
    assert_eq!(err.status_code(), 451);
    let body = err.body(Operation::Analyze);
    assert_eq!(body.error, "content_blocked");
    assert_eq!(body.reason.as_deref(), Some("high skin ratio"));
    assert_eq!(body.confidence, Some(1.0));
}

#[test]
fn structural_rejections() {
    let svc = service();

    let tiny = encode(gradient(49, 200), ImageFormat::Png);
    assert_eq!(svc.analyze(&tiny).unwrap_err().kind(), RejectionKind::InvalidImage);

    let garbage = b"definitely not an image".to_vec();
    assert_eq!(svc.analyze(&garbage).unwrap_err().kind(), RejectionKind::InvalidImage);

    let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
    let err = svc.remove_background(&gif).unwrap_err();
    assert_eq!(err.body(Operation::RemoveBackground).error, "invalid_image");
}

#[test]
fn oversized_upload_is_rejected() {
    let mut config = ServiceConfig::default();
    config.validation.max_bytes = 1024;
    let svc = ClothingService::from_config(config).unwrap();
    let bytes = encode(noise(300, 300), ImageFormat::Png);
    assert!(bytes.len() > 1024);

    assert_eq!(svc.analyze(&bytes).unwrap_err().status_code(), 400);
    let err = svc
        .remove_background_upload(Cursor::new(bytes), Some("image/png"))
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn white_background_becomes_transparent() {
    let source = RgbImage::from_fn(100, 100, |x, y| {
        if (40..60).contains(&x) && (40..60).contains(&y) {
            Rgb([255, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let bytes = encode(source, ImageFormat::Png);
    let output = service().remove_background(&bytes).unwrap();

    assert_eq!(output.metadata.method, RemovalMethod::Fallback);
    assert_eq!(output.metadata.original_size, output.metadata.processed_size);
    assert!(output.metadata.has_transparency);

    let result = image::load_from_memory_with_format(&output.png, ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(result.dimensions(), (100, 100));
    assert_eq!(result.get_pixel(0, 0)[3], 0);
    assert_eq!(result.get_pixel(50, 50).0, [255, 0, 0, 255]);
}

#[test]
fn config_file_overrides_reach_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[moderation]\nenabled = false\n\n[model]\nembedding_dimensions = 16\n",
    )
    .unwrap();
    let config = config::load_config(Some(&path)).unwrap();
    let svc = ClothingService::from_config(config).unwrap();

    let bytes = encode(
        RgbImage::from_pixel(100, 100, Rgb([220, 180, 150])),
        ImageFormat::Png,
    );
    let record = svc.analyze(&bytes).unwrap();
    assert!(!record.moderation.checked);
    assert_eq!(record.attributes.embedding.len(), 16);
}
