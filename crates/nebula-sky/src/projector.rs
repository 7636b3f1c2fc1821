//! Sky projection: unit directions on the celestial sphere to screen pixels.

use glam::{DVec3, Quat, Vec2, Vec3};

/// Maps sky directions to screen positions for the current view.
pub trait Projector {
    /// Screen position in pixels of a unit direction, or `None` when the
    /// direction cannot be projected (behind the viewer).
    fn project(&self, direction: DVec3) -> Option<Vec2>;

    /// Viewport size in pixels.
    fn viewport(&self) -> Vec2;

    /// Vertical field of view in degrees.
    fn fov_degrees(&self) -> f32;

    /// Pixels per radian at the center of the view.
    fn pixels_per_radian(&self) -> f32;

    /// Like [`project`](Self::project), but also requires the result to land
    /// inside the viewport.
    fn project_check(&self, direction: DVec3) -> Option<Vec2> {
        let pos = self.project(direction)?;
        let size = self.viewport();
        (pos.x >= 0.0 && pos.y >= 0.0 && pos.x <= size.x && pos.y <= size.y).then_some(pos)
    }
}

/// Gnomonic (pinhole) projector with a rotation-only view.
///
/// The viewer looks down -Z of its local frame with +Y up, like a camera.
/// Screen origin is the bottom-left corner with +Y pointing up.
#[derive(Clone, Debug)]
pub struct SkyProjector {
    /// Orientation of the view in the sky frame.
    pub rotation: Quat,
    width: f32,
    height: f32,
    fov_deg: f32,
    focal: f32,
}

/// Widest field of view a gnomonic projection can represent sensibly.
const MAX_GNOMONIC_FOV: f32 = 170.0;

impl SkyProjector {
    /// Create a projector looking down -Z with the given viewport and
    /// vertical field of view in degrees.
    pub fn new(width: u32, height: u32, fov_deg: f32) -> Self {
        let mut projector = Self {
            rotation: Quat::IDENTITY,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            fov_deg,
            focal: 1.0,
        };
        projector.set_fov(fov_deg);
        projector
    }

    /// Point the view at `direction` (any length, non-zero).
    pub fn look_at(&mut self, direction: DVec3) {
        let target = direction.normalize_or_zero().as_vec3();
        if target != Vec3::ZERO {
            self.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, target);
        }
    }

    /// Change the vertical field of view in degrees.
    pub fn set_fov(&mut self, fov_deg: f32) {
        self.fov_deg = fov_deg.clamp(f32::EPSILON, MAX_GNOMONIC_FOV);
        self.update_focal();
    }

    /// Resize the viewport. Zero sizes are raised to one pixel.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
        self.update_focal();
    }

    /// The direction at the center of the view.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    fn update_focal(&mut self) {
        self.focal = 0.5 * self.height / (0.5 * self.fov_deg.to_radians()).tan();
    }
}

impl Projector for SkyProjector {
    fn project(&self, direction: DVec3) -> Option<Vec2> {
        let local = self.rotation.inverse() * direction.as_vec3();
        // On or behind the image plane.
        if local.z >= 0.0 {
            return None;
        }
        let depth = -local.z;
        Some(Vec2::new(
            0.5 * self.width + self.focal * local.x / depth,
            0.5 * self.height + self.focal * local.y / depth,
        ))
    }

    fn viewport(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    fn fov_degrees(&self) -> f32 {
        self.fov_deg
    }

    fn pixels_per_radian(&self) -> f32 {
        self.focal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_projects_to_center() {
        let projector = SkyProjector::new(800, 600, 60.0);
        let pos = projector.project(DVec3::NEG_Z).unwrap();
        assert!((pos - Vec2::new(400.0, 300.0)).length() < 1e-4);
    }

    #[test]
    fn test_behind_viewer_is_rejected() {
        let projector = SkyProjector::new(800, 600, 60.0);
        assert!(projector.project(DVec3::Z).is_none());
        assert!(projector.project(DVec3::X).is_none(), "image plane edge is not projectable");
    }

    #[test]
    fn test_half_fov_lands_on_top_edge() {
        let projector = SkyProjector::new(800, 600, 60.0);
        let half = 30f64.to_radians();
        let dir = DVec3::new(0.0, half.sin(), -half.cos());
        let pos = projector.project(dir).unwrap();
        assert!((pos.y - 600.0).abs() < 1e-2, "expected top edge, got {pos}");
    }

    #[test]
    fn test_project_check_rejects_offscreen() {
        let projector = SkyProjector::new(800, 600, 10.0);
        let off = DVec3::new(0.5, 0.0, -0.5).normalize();
        assert!(projector.project(off).is_some());
        assert!(projector.project_check(off).is_none());
        assert!(projector.project_check(DVec3::NEG_Z).is_some());
    }

    #[test]
    fn test_look_at_centers_target() {
        let mut projector = SkyProjector::new(640, 480, 45.0);
        let target = DVec3::new(1.0, 1.0, 0.0);
        projector.look_at(target);
        let pos = projector.project(target.normalize()).unwrap();
        assert!((pos - Vec2::new(320.0, 240.0)).length() < 1e-3);
    }

    #[test]
    fn test_pixels_per_radian_grows_when_zooming() {
        let mut projector = SkyProjector::new(800, 600, 60.0);
        let wide = projector.pixels_per_radian();
        projector.set_fov(5.0);
        assert!(projector.pixels_per_radian() > wide);
        assert_eq!(projector.fov_degrees(), 5.0);
    }
}
