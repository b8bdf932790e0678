use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            yaw,
            pitch,
            fov: std::f32::consts::PI / 3.0,
            near: 0.1,
            far: 1000.0,
        };
        camera.update_vectors();
        camera
    }

    pub fn update_vectors(&mut self) {
        let forward = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();

        let right = forward.cross(Vec3::Y).normalize_or_zero();
        self.forward = forward;
        self.right = if right.length_squared() < 1e-6 {
            Vec3::X
        } else {
            right
        };
        self.up = self.right.cross(forward).normalize();
    }

    /// Rigid world-to-camera transform; camera looks down its local -Z.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn projection_matrix(&self, width: usize, height: usize) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn focal_lengths(&self, width: usize, height: usize) -> Vec2 {
        let h = height.max(1) as f32;
        let w = width.max(1) as f32;
        let tan_half = (self.fov * 0.5).tan().max(1e-6);
        let fy = h / (2.0 * tan_half);
        Vec2::new(fy * (w / h), fy)
    }
}

pub fn look_at_target(camera: &mut Camera, target: Vec3) {
    let to_target = (target - camera.position).normalize_or_zero();
    if to_target.length_squared() < 1e-8 {
        return;
    }
    camera.yaw = to_target.z.atan2(to_target.x);
    camera.pitch = to_target.y.clamp(-1.0, 1.0).asin();
    camera.update_vectors();
}

/// Places the camera on a horizontal circle around `target` and aims at it.
pub fn orbit(camera: &mut Camera, target: Vec3, radius: f32, height: f32, angle: f32) {
    camera.position = target + Vec3::new(radius * angle.cos(), height, radius * angle.sin());
    look_at_target(camera, target);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_matrix_keeps_distances() {
        let mut camera = Camera::new(Vec3::new(3.0, 1.0, 4.0), 0.0, 0.0);
        look_at_target(&mut camera, Vec3::ZERO);
        let view = camera.view_matrix();

        let point = Vec3::new(-2.0, 0.5, 1.0);
        let camera_space = view.transform_point3(point);
        let expected = (point - camera.position).length_squared();
        assert!((camera_space.length_squared() - expected).abs() < 1e-3);
        // Straight ahead lands on -Z.
        assert!(view.transform_point3(Vec3::ZERO).z < 0.0);
    }

    #[test]
    fn orbit_faces_target() {
        let mut camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        orbit(&mut camera, Vec3::new(1.0, 0.0, 1.0), 5.0, 0.0, 1.2);
        let to_target = (Vec3::new(1.0, 0.0, 1.0) - camera.position).normalize();
        assert!(camera.forward.dot(to_target) > 0.999);
    }

    #[test]
    fn focal_lengths_follow_aspect() {
        let camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        let focal = camera.focal_lengths(200, 100);
        assert!((focal.x - 2.0 * focal.y).abs() < 1e-3);
    }
}
