//! Toroidal mirroring of stamps that cross the field edges

use glam::Vec2;

/// Offsets along one axis: 0, plus `+size` when the disc crosses the low edge
/// and `-size` when it crosses the high edge
fn axis_offsets(center: f32, radius: f32, size: f32) -> ([f32; 3], usize) {
    let mut offsets = [0.0; 3];
    let mut count = 1;
    if center - radius < 0.0 {
        offsets[count] = size;
        count += 1;
    }
    if center + radius > size - 1.0 {
        offsets[count] = -size;
        count += 1;
    }
    (offsets, count)
}

/// Mirror centers for a stamp at `center` (already reduced into the field)
///
/// Only edges the disc actually crosses produce mirrors; a disc crossing two
/// adjacent edges also gets the diagonal corner copy.
pub fn mirror_centers(center: Vec2, radius: f32, width: u32, height: u32) -> Vec<Vec2> {
    let (xs, nx) = axis_offsets(center.x, radius, width as f32);
    let (ys, ny) = axis_offsets(center.y, radius, height as f32);

    let mut mirrors = Vec::with_capacity(nx * ny - 1);
    for &oy in &ys[..ny] {
        for &ox in &xs[..nx] {
            if ox == 0.0 && oy == 0.0 {
                continue;
            }
            mirrors.push(center + Vec2::new(ox, oy));
        }
    }
    mirrors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_has_no_mirrors() {
        assert!(mirror_centers(Vec2::new(50.0, 50.0), 10.0, 100, 100).is_empty());
    }

    #[test]
    fn test_right_edge_mirror() {
        let mirrors = mirror_centers(Vec2::new(99.0, 50.0), 10.0, 100, 100);
        assert_eq!(mirrors, vec![Vec2::new(-1.0, 50.0)]);
    }

    #[test]
    fn test_corner_mirrors() {
        let mirrors = mirror_centers(Vec2::new(2.0, 97.0), 5.0, 100, 100);
        assert_eq!(mirrors.len(), 3);
        assert!(mirrors.contains(&Vec2::new(102.0, 97.0)));
        assert!(mirrors.contains(&Vec2::new(2.0, -3.0)));
        assert!(mirrors.contains(&Vec2::new(102.0, -3.0)));
    }
}
