//! Renderer-facing output: the event types and the single consumer they go to.
use glam::Mat4;
use serde::{Serialize, Serializer};

use crate::color::Rgba;
use crate::model::{CameraInfo, Primitive};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawEvent {
    pub primitive: Primitive,
    #[serde(serialize_with = "column_major")]
    pub matrix: Mat4,
    pub color: Rgba,
}

fn column_major<S: Serializer>(matrix: &Mat4, serializer: S) -> Result<S::Ok, S::Error> {
    matrix.to_cols_array().serialize(serializer)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SceneEvent {
    Background { color: Rgba },
    Camera(CameraInfo),
    Draw(DrawEvent),
}

/// Receives a build's events in order: one background, one camera, then
/// every draw. An `Err` from any callback aborts the build.
pub trait Scene {
    fn background(&mut self, _color: Rgba) -> anyhow::Result<()> {
        Ok(())
    }

    fn camera(&mut self, _camera: &CameraInfo) -> anyhow::Result<()> {
        Ok(())
    }

    fn draw(&mut self, event: &DrawEvent) -> anyhow::Result<()>;
}

impl<S: Scene + ?Sized> Scene for &mut S {
    fn background(&mut self, color: Rgba) -> anyhow::Result<()> {
        (**self).background(color)
    }

    fn camera(&mut self, camera: &CameraInfo) -> anyhow::Result<()> {
        (**self).camera(camera)
    }

    fn draw(&mut self, event: &DrawEvent) -> anyhow::Result<()> {
        (**self).draw(event)
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub events: Vec<SceneEvent>,
}

impl Recorder {
    pub fn draws(&self) -> impl Iterator<Item = &DrawEvent> {
        self.events.iter().filter_map(|e| match e {
            SceneEvent::Draw(draw) => Some(draw),
            _ => None,
        })
    }
}

impl Scene for Recorder {
    fn background(&mut self, color: Rgba) -> anyhow::Result<()> {
        self.events.push(SceneEvent::Background { color });
        Ok(())
    }

    fn camera(&mut self, camera: &CameraInfo) -> anyhow::Result<()> {
        self.events.push(SceneEvent::Camera(camera.clone()));
        Ok(())
    }

    fn draw(&mut self, event: &DrawEvent) -> anyhow::Result<()> {
        self.events.push(SceneEvent::Draw(event.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let draw = SceneEvent::Draw(DrawEvent {
            primitive: Primitive::Sphere,
            matrix: Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)),
            color: Rgba::RED,
        });
        let json = serde_json::to_value(&draw).unwrap();
        assert_eq!(json["event"], "draw");
        assert_eq!(json["primitive"], "sphere");
        assert_eq!(json["matrix"].as_array().map(Vec::len), Some(16));
        assert_eq!(json["matrix"][12], 1.0);
        assert_eq!(json["matrix"][14], 3.0);
        assert_eq!(json["color"]["r"], 255);

        let camera = serde_json::to_value(SceneEvent::Camera(CameraInfo::default())).unwrap();
        assert_eq!(camera["event"], "camera");
        assert!(camera["translation"].is_null());

        let bg = serde_json::to_value(SceneEvent::Background { color: Rgba::WHITE }).unwrap();
        assert_eq!(bg["event"], "background");
        assert_eq!(bg["color"]["a"], 255);
    }
}
