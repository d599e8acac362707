//! End-to-end runs through the system `ffmpeg`/`ffprobe`. Each test returns early when the tools
//! are missing.

use std::{path::Path, process::Command};

use mediastack::{
    FrameRgb, ImageAsset, ImagePosition, SingleOpts, VideoAsset, VideoCombiner,
    is_ffmpeg_on_path, is_ffprobe_on_path, probe_video,
};

fn tools_available() -> bool {
    let ok = is_ffmpeg_on_path() && is_ffprobe_on_path();
    if !ok {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
    }
    ok
}

fn synth_video(path: &Path, color: &str, width: u32, height: u32, frames: u32) -> anyhow::Result<()> {
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("color=c={color}:size={width}x{height}:rate=30"))
        .args(["-frames:v", &frames.to_string(), "-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
        .arg(path)
        .status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating {}", path.display());
    Ok(())
}

fn synth_image(path: &Path, width: u32, height: u32, rgb: [u8; 3]) -> anyhow::Result<()> {
    image::RgbImage::from_pixel(width, height, image::Rgb(rgb)).save(path)?;
    Ok(())
}

fn mean_channel(frame: &FrameRgb, y0: u32, y1: u32, channel: usize) -> f64 {
    let mut sum = 0u64;
    let mut n = 0u64;
    for y in y0..y1 {
        for x in 0..frame.width {
            sum += u64::from(frame.pixel(x, y)[channel]);
            n += 1;
        }
    }
    sum as f64 / n as f64
}

#[test]
fn video_asset_reports_metadata_and_frames() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    synth_video(&path, "green", 320, 240, 30).unwrap();

    let mut video = VideoAsset::open(&path).unwrap();
    assert_eq!(video.width(), 320);
    assert_eq!(video.height(), 240);
    assert!((video.fps().as_f64() - 30.0).abs() < 1e-6);
    assert_eq!(video.frame_count(), 30);

    let first = video.get_frame().unwrap().unwrap();
    assert_eq!(first.shape(), (240, 320, 3));
    video.get_frame().unwrap();
    video.reset().unwrap();
    assert_eq!(video.frames().count(), 30);
    assert!(video.get_frame().unwrap().is_none());

    video.release();
    video.release();
}

#[test]
fn image_asset_round_trips_native_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.png");
    synth_image(&path, 200, 100, [0, 0, 255]).unwrap();

    let image = ImageAsset::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (200, 100));
    assert_eq!(image.get_frame().shape(), (100, 200, 3));
    assert_eq!(image.get_frame().pixel(10, 10), [0, 0, 255]);
}

#[test]
fn non_video_file_fails_to_open_as_video() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.mp4");
    std::fs::write(&path, b"definitely not a video").unwrap();
    let err = VideoAsset::open(&path).unwrap_err();
    assert!(err.to_string().contains("fake.mp4"));
}

#[test]
fn combine_single_appends_image_below() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("video.mp4");
    let image = dir.path().join("image.png");
    let out = dir.path().join("out").join("combined.mp4");
    synth_video(&video, "green", 320, 240, 30).unwrap();
    synth_image(&image, 320, 100, [255, 0, 0]).unwrap();

    let stats = VideoCombiner::default()
        .combine_single(&video, &image, &out, SingleOpts::default())
        .unwrap();
    assert_eq!(stats.frames_written, 30);

    let info = probe_video(&out).unwrap();
    assert_eq!((info.width, info.height), (320, 340));
    assert_eq!(info.frame_count, 30);
}

#[test]
fn combine_single_crops_and_puts_image_on_top() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("video.mp4");
    let image = dir.path().join("image.png");
    let out = dir.path().join("combined.mp4");
    synth_video(&video, "green", 320, 240, 10).unwrap();
    synth_image(&image, 320, 100, [255, 0, 0]).unwrap();

    VideoCombiner::default()
        .combine_single(
            &video,
            &image,
            &out,
            SingleOpts {
                crop_bottom: 20,
                image_position: ImagePosition::Top,
            },
        )
        .unwrap();

    let mut combined = VideoAsset::open(&out).unwrap();
    assert_eq!((combined.width(), combined.height()), (320, 320));
    let frame = combined.get_frame().unwrap().unwrap();
    assert!(mean_channel(&frame, 10, 90, 0) > 150.0);
    assert!(mean_channel(&frame, 110, 310, 1) > 150.0);
}

#[test]
fn combine_from_folder_blacks_out_shorter_video() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("media");
    std::fs::create_dir(&media).unwrap();
    synth_image(&media.join("a_image.png"), 640, 200, [255, 0, 0]).unwrap();
    synth_video(&media.join("m_video.avi"), "blue", 320, 240, 30).unwrap();
    synth_video(&media.join("z_video.mp4"), "green", 320, 240, 10).unwrap();
    let out = dir.path().join("combined.mp4");

    let stats = VideoCombiner::default()
        .combine_from_folder(&media, &out)
        .unwrap();
    assert_eq!((stats.width, stats.height), (320, 100 + 240 + 240));

    let mut combined = VideoAsset::open(&out).unwrap();
    let frames: Vec<FrameRgb> = combined.frames().collect::<Result<_, _>>().unwrap();
    assert_eq!(frames.len() as u64, stats.frames_written);
    assert!(mean_channel(&frames[0], 350, 570, 1) > 150.0);
    let last = frames.last().unwrap();
    assert!(mean_channel(last, 350, 570, 1) < 30.0);
    assert!(mean_channel(last, 110, 330, 2) > 150.0);
}
