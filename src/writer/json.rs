//! Scene events as JSON lines, one object per event.

use std::io::Write;

use anyhow::Context;

use crate::color::Rgba;
use crate::model::CameraInfo;
use crate::scene::{DrawEvent, Scene, SceneEvent};

pub struct JsonLines<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Events written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(mut self) -> anyhow::Result<W> {
        self.out.flush().context("Flushing scene output")?;
        Ok(self.out)
    }

    fn emit<E: serde::Serialize>(&mut self, event: &E) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, event).context("Serializing scene event")?;
        self.out
            .write_all(b"\n")
            .context("Writing scene event")?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write> Scene for JsonLines<W> {
    fn background(&mut self, color: Rgba) -> anyhow::Result<()> {
        self.emit(&SceneEvent::Background { color })
    }

    fn camera(&mut self, camera: &CameraInfo) -> anyhow::Result<()> {
        self.emit(&SceneEvent::Camera(camera.clone()))
    }

    fn draw(&mut self, event: &DrawEvent) -> anyhow::Result<()> {
        self.emit(&SceneEvent::Draw(event.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Primitive;
    use glam::Mat4;

    #[test]
    fn test_one_line_per_event() {
        let mut writer = JsonLines::new(Vec::new());
        writer.background(Rgba::WHITE).unwrap();
        writer.camera(&CameraInfo::default()).unwrap();
        writer
            .draw(&DrawEvent {
                primitive: Primitive::Box,
                matrix: Mat4::IDENTITY,
                color: Rgba::RED,
            })
            .unwrap();
        assert_eq!(writer.written(), 3);

        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        let events: Vec<&str> = lines.iter().map(|l| l["event"].as_str().unwrap()).collect();
        assert_eq!(events, vec!["background", "camera", "draw"]);
        assert_eq!(lines[2]["primitive"], "box");
        assert_eq!(lines[2]["matrix"][0], 1.0);
        assert_eq!(lines[2]["matrix"][15], 1.0);
        assert_eq!(lines[2]["color"]["g"], 0);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_surfaces() {
        let mut writer = JsonLines::new(Broken);
        assert!(writer.background(Rgba::WHITE).is_err());
        assert_eq!(writer.written(), 0);
    }
}
