//! Core types: math re-exports, Transform, Camera, orbit input.

pub use glam::{EulerRot, Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod orbit;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(
            vec3(1.0, 2.0, 3.0),
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 2.0, 2.0),
        );
        // Last column is translation, diagonal is scale (no rotation).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::new_perspective(
            vec3(0.0, 0.0, 4.0),
            vec3(0.0, 0.0, 0.0),
            Vec3::Y,
            60f32.to_radians(),
            0.1,
            100.0,
            16.0 / 9.0,
        );
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn orbit_rotates_only_while_dragging() {
        let mut orbit = orbit::OrbitController::new(0.01);
        orbit.cursor_moved(100.0, 100.0);
        orbit.cursor_moved(150.0, 120.0);
        assert_eq!((orbit.yaw, orbit.pitch), (0.0, 0.0));

        orbit.press();
        assert!(orbit.is_dragging());
        orbit.cursor_moved(200.0, 100.0);
        assert!((orbit.yaw - 0.5).abs() < 1e-6);
        assert!((orbit.pitch + 0.2).abs() < 1e-6);

        orbit.release();
        assert!(!orbit.is_dragging());
        orbit.cursor_moved(0.0, 0.0);
        assert!((orbit.yaw - 0.5).abs() < 1e-6);
    }

    #[test]
    fn orbit_drag_after_leaving_window_does_not_jump() {
        let mut orbit = orbit::OrbitController::default();
        orbit.press();
        orbit.cursor_moved(10.0, 10.0);
        orbit.cursor_left();
        orbit.cursor_moved(500.0, 500.0);
        assert_eq!((orbit.yaw, orbit.pitch), (0.0, 0.0));
    }

    #[test]
    fn orbit_rotation_applies_pitch_then_yaw() {
        let mut orbit = orbit::OrbitController::default();
        orbit.yaw = std::f32::consts::FRAC_PI_2;
        orbit.pitch = std::f32::consts::FRAC_PI_2;
        // Rx(90) takes +Y to +Z, then Ry(90) takes +Z to +X.
        let v = orbit.rotation().transform_vector3(Vec3::Y);
        assert!((v - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn normalized_bounds_fit_unit_sphere() {
        let t = transform::Transform::normalize_bounds(vec3(2.0, 2.0, 2.0), vec3(4.0, 6.0, 2.0));
        let m = t.matrix();
        let corner = m.transform_point3(vec3(4.0, 6.0, 2.0));
        let center = m.transform_point3(vec3(3.0, 4.0, 2.0));
        assert!(center.length() < 1e-6);
        assert!((corner.length() - 1.0).abs() < 1e-5);

        let point = transform::Transform::normalize_bounds(Vec3::ONE, Vec3::ONE);
        assert!(point.matrix().transform_point3(Vec3::ONE).length() < 1e-6);
    }

    #[test]
    fn framing_camera_keeps_unit_sphere_in_front() {
        let cam = camera::Camera::framing_unit_sphere(60f32.to_radians(), 0.5);
        assert!(cam.eye.z > 1.0);
        assert!(cam.z_near > 0.0 && cam.z_near < cam.eye.z - 1.0);
        assert!(cam.z_far > cam.eye.z + 0.99);
        let clip = cam.proj_view() * Vec3::X.extend(1.0);
        let ndc_x = clip.x / clip.w;
        assert!(ndc_x.abs() < 1.0);
    }
}
