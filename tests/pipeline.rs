use frame_overlay::overlay::{self, DrawList, DrawOp};
use frame_overlay::{
    Detector, DetectorConfig, FramePipeline, ModelBundle, OverlayStyle, PipelineError, RawFrame,
    ScreenRect, StubEngine, Viewport,
};

const WIDTH: u32 = 8;
const HEIGHT: u32 = 4;

/// Dark RGBA frame with a white block, rows padded with junk bytes.
fn padded_frame(padding: usize, block: (u32, u32, u32, u32)) -> (Vec<u8>, usize) {
    let stride = WIDTH as usize * 4 + padding;
    let mut bytes = vec![0xAB; stride * HEIGHT as usize];
    for y in 0..HEIGHT as usize {
        for x in 0..WIDTH as usize {
            let o = y * stride + x * 4;
            bytes[o..o + 4].copy_from_slice(&[10, 10, 10, 255]);
        }
    }
    let (bx, by, bw, bh) = block;
    for y in by..by + bh {
        for x in bx..bx + bw {
            let o = y as usize * stride + x as usize * 4;
            bytes[o..o + 4].copy_from_slice(&[255, 255, 255, 255]);
        }
    }
    (bytes, stride)
}

fn stub_pipeline() -> FramePipeline {
    FramePipeline::new(Detector::with_engine(
        DetectorConfig::default(),
        StubEngine::new(),
    ))
}

#[test]
fn padded_frame_flows_through_to_the_canvas() {
    let (bytes, stride) = padded_frame(12, (2, 0, 4, 2));
    let mut pipeline = stub_pipeline();

    let records = pipeline.detect(&bytes, WIDTH, HEIGHT, stride);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].label, "person");
    assert_eq!(records[0].score, 1.0);
    assert_eq!(records[0].rect, "{{0.25, 0.5}, {0.5, 0.5}}");

    let (handle, mut renderer) = overlay::channel(OverlayStyle::default());
    handle.update_detections(&records);
    assert!(renderer.poll());

    let mut canvas = DrawList::new();
    renderer.paint(Viewport::new(400.0, 200.0), &mut canvas);
    assert_eq!(
        canvas.stroked_rects(),
        vec![ScreenRect::new(100.0, 0.0, 200.0, 100.0)]
    );
    assert_eq!(canvas.texts(), vec!["person 100%"]);
    assert_eq!(canvas.filled_rects()[0].top, 0.0);
    assert!(matches!(canvas.ops()[0], DrawOp::Clear { .. }));
}

#[test]
fn frame_without_subject_clears_the_overlay() {
    let mut pipeline = stub_pipeline();
    let (handle, mut renderer) = overlay::channel(OverlayStyle::default());

    let (bytes, stride) = padded_frame(4, (0, 0, 2, 2));
    handle.update_detections(&pipeline.detect(&bytes, WIDTH, HEIGHT, stride));
    assert!(renderer.poll());
    assert_eq!(renderer.batch().len(), 1);

    let (bytes, stride) = padded_frame(4, (0, 0, 0, 0));
    let records = pipeline.detect(&bytes, WIDTH, HEIGHT, stride);
    assert!(records.is_empty());
    handle.update_detections(&records);
    assert!(renderer.poll());

    let mut canvas = DrawList::new();
    renderer.paint(Viewport::new(100.0, 100.0), &mut canvas);
    assert_eq!(canvas.ops().len(), 1);
}

#[test]
fn other_labels_are_filtered_out() {
    let config = DetectorConfig::default();
    let engine = StubEngine::new().with_label("dog");
    let mut pipeline = FramePipeline::new(Detector::with_engine(config, engine));

    let (bytes, stride) = padded_frame(0, (1, 1, 3, 2));
    assert!(pipeline.detect(&bytes, WIDTH, HEIGHT, stride).is_empty());
}

#[test]
fn short_buffer_is_reported_and_contained() {
    let mut pipeline = stub_pipeline();
    let (bytes, stride) = padded_frame(8, (0, 0, 4, 4));
    let truncated = &bytes[..bytes.len() - 9];

    assert!(pipeline.detect(truncated, WIDTH, HEIGHT, stride).is_empty());
    let err = pipeline
        .try_process(&RawFrame::rgba(truncated, WIDTH, HEIGHT, stride))
        .unwrap_err();
    assert!(matches!(err, PipelineError::MalformedInput(_)));
}

#[test]
fn missing_model_disables_detection() {
    let dir = tempfile::tempdir().expect("temp model dir");
    let detector = Detector::from_bundle(DetectorConfig::default(), &ModelBundle::new(dir.path()));
    assert!(!detector.is_enabled());
    assert!(matches!(
        detector.load_error(),
        Some(PipelineError::ModelLoad { .. })
    ));

    let mut pipeline = FramePipeline::new(detector);
    let (bytes, stride) = padded_frame(0, (0, 0, 8, 4));
    for _ in 0..3 {
        assert!(pipeline.detect(&bytes, WIDTH, HEIGHT, stride).is_empty());
    }
    let err = pipeline
        .try_process(&RawFrame::rgba(&bytes, WIDTH, HEIGHT, stride))
        .unwrap_err();
    assert!(matches!(err, PipelineError::ModelLoad { .. }));
}
