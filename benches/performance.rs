use brandcrop::crop::{
    compute_display_geometry, compute_initial_crop_rect, display_rect_to_native_rect, extract_crop,
    extract_pixels, AspectRatio, NaturalSize, RasterImage, Size,
};
use brandcrop::markup;
use brandcrop::settings::CropSettings;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};

fn test_image(width: u32, height: u32) -> RasterImage {
    RasterImage::from_buffer(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
    }))
    .unwrap()
}

fn bench_layout(c: &mut Criterion) {
    let natural = NaturalSize::new(4032, 3024);
    let viewport = Size::new(800.0, 600.0);

    c.bench_function("layout_and_mapping", |b| {
        b.iter(|| {
            let display = compute_display_geometry(black_box(natural), viewport, 0.9).unwrap();
            let rect = compute_initial_crop_rect(&display, AspectRatio::SQUARE, 0.8);
            black_box(display_rect_to_native_rect(&rect, &display, natural))
        })
    });
}

fn bench_extract(c: &mut Criterion) {
    let image = test_image(1920, 1080);
    let settings = CropSettings::default();
    let display =
        compute_display_geometry(image.natural_size(), settings.viewport(), settings.fit_margin)
            .unwrap();
    let rect = compute_initial_crop_rect(&display, AspectRatio::SQUARE, settings.crop_fill);
    let native = display_rect_to_native_rect(&rect, &display, image.natural_size());
    let output = settings.output_spec(None).unwrap();

    c.bench_function("extract_crop_1920x1080_jpeg", |b| {
        b.iter(|| extract_crop(&image, black_box(&native), &output, 0.0).unwrap())
    });

    c.bench_function("extract_pixels_rotated_15deg", |b| {
        b.iter(|| extract_pixels(&image, black_box(&native), &output, 15.0).unwrap())
    });
}

fn bench_markup(c: &mut Criterion) {
    let html = "<div><strong>Brand</strong> Ltda. <em>desde <u>1998</u></em></div>\
                <div><a href=\"https://example.com\">site</a> \
                <span style=\"color: red\">*</span></div>"
        .repeat(20);

    c.bench_function("markup_roundtrip", |b| {
        b.iter(|| markup::to_rich_text(&markup::to_markdown(black_box(&html))))
    });
}

criterion_group!(benches, bench_layout, bench_extract, bench_markup);
criterion_main!(benches);
