//! CPU fallback drawing and frame recording.

use lavabottle::canvas::{draw_bottle, Canvas2d, Color};
use lavabottle::{Bottle, BottleConfig, Frame, Recorder};

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("lavabottle-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_frames_keep_transform_balanced() {
    let mut bottle = Bottle::new(BottleConfig::default().with_seed(11)).unwrap();
    let mut canvas = Canvas2d::new(250, 350);
    for _ in 0..5 {
        bottle.step();
        draw_bottle(&mut canvas, &bottle);
        assert_eq!(canvas.depth(), 0);
    }

    // only the three scene colours appear
    for &pixel in canvas.pixels() {
        let color = Color::from_pixel(pixel);
        assert!(
            color == Color::BLACK || color == Color::WHITE || color == Color::GRAY,
            "unexpected colour {color:?}"
        );
    }
    assert!(canvas.pixels().iter().any(|&p| Color::from_pixel(p) == Color::WHITE));
}

#[test]
fn test_record_canvas_frames() {
    let dir = scratch_dir("canvas");
    let bottle = Bottle::new(BottleConfig::default().with_seed(5)).unwrap();
    let mut canvas = Canvas2d::new(50, 70);
    let mut recorder = Recorder::new(&dir).unwrap();

    for _ in 0..3 {
        draw_bottle(&mut canvas, &bottle);
        let frame = Frame {
            width: canvas.width(),
            height: canvas.height(),
            rgba: canvas.to_rgba(),
        };
        recorder.record(&frame).unwrap();
    }

    for i in 0..3 {
        let path = dir.join(format!("frame-{i:08}.png"));
        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (50, 70));
    }
    assert!(!dir.join("frame-00000003.png").exists());
    std::fs::remove_dir_all(&dir).unwrap();
}
