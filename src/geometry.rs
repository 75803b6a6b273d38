use glam::{EulerRot, Quat, Vec2, Vec3};

/// Intersection of a ray (origin, unit direction) with the plane through
/// `point` with normal `normal`. Undefined when the ray is parallel to the
/// plane; callers guard by picking the candidate plane whose normal is most
/// parallel to the ray direction.
pub fn plane_intersect(origin: Vec3, dir: Vec3, point: Vec3, normal: Vec3) -> Vec3 {
    let t = (point - origin).dot(normal) / dir.dot(normal);
    origin + dir * t
}

/// Angle of `mouse` around `center` in screen space, in degrees in [0, 360).
pub fn crank_angle(center: Vec2, mouse: Vec2) -> f32 {
    let v = mouse - center;
    180.0 + v.y.atan2(v.x).to_degrees()
}

/// Maps an angle in degrees into (-180, 180].
pub fn wrap_degrees(mut degrees: f32) -> f32 {
    while degrees > 180.0 {
        degrees -= 360.0;
    }
    while degrees <= -180.0 {
        degrees += 360.0;
    }
    degrees
}

/// Heading/pitch/roll in degrees to a quaternion. Heading is about +Z,
/// pitch about +X, roll about +Y (Z-up, Y-forward).
pub fn hpr_to_quat(hpr: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZXY, hpr.x.to_radians(), hpr.y.to_radians(), hpr.z.to_radians())
}

pub fn quat_to_hpr(q: Quat) -> Vec3 {
    let (h, p, r) = q.to_euler(EulerRot::ZXY);
    Vec3::new(h.to_degrees(), p.to_degrees(), r.to_degrees())
}

/// Smoothstep ease used by the handle resize tween.
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_intersect_hits_offset_plane() {
        let origin = Vec3::new(0.0, -10.0, 0.0);
        let dir = Vec3::new(0.0, 1.0, 0.0);
        let hit = plane_intersect(origin, dir, Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
        assert!((hit - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-6);

        let slanted = Vec3::new(0.6, 0.8, 0.0);
        let hit = plane_intersect(Vec3::ZERO, slanted, Vec3::new(0.0, 4.0, 0.0), Vec3::Y);
        assert!((hit.y - 4.0).abs() < 1e-6);
        assert!((hit.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn crank_angle_covers_all_quadrants() {
        let c = Vec2::ZERO;
        assert!((crank_angle(c, Vec2::new(1.0, 0.0)) - 180.0).abs() < 1e-4);
        assert!((crank_angle(c, Vec2::new(0.0, 1.0)) - 270.0).abs() < 1e-4);
        assert!((crank_angle(c, Vec2::new(0.0, -1.0)) - 90.0).abs() < 1e-4);
        let near_wrap = crank_angle(c, Vec2::new(-1.0, 1e-5));
        assert!(near_wrap < 360.0 && near_wrap > 359.0);
        let past_wrap = crank_angle(c, Vec2::new(-1.0, -1e-5));
        assert!(past_wrap >= 0.0 && past_wrap < 1.0);
    }

    #[test]
    fn hpr_round_trips_through_quat() {
        let hpr = Vec3::new(30.0, -40.0, 75.0);
        let back = quat_to_hpr(hpr_to_quat(hpr));
        assert!((wrap_degrees(back.x - hpr.x)).abs() < 1e-3);
        assert!((wrap_degrees(back.y - hpr.y)).abs() < 1e-3);
        assert!((wrap_degrees(back.z - hpr.z)).abs() < 1e-3);
    }

    #[test]
    fn heading_rotates_about_up_axis() {
        let q = hpr_to_quat(Vec3::new(90.0, 0.0, 0.0));
        let fwd = q * Vec3::Y;
        assert!((fwd - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn ease_is_monotonic_and_clamped() {
        assert_eq!(ease_in_out(-1.0), 0.0);
        assert_eq!(ease_in_out(2.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-6);
        let mut prev = 0.0;
        for i in 1..=10 {
            let v = ease_in_out(i as f32 / 10.0);
            assert!(v >= prev);
            prev = v;
        }
    }
}
