use crate::coord::Coordinate;

/// A straight line segment between two coordinates.
#[derive(Debug, PartialEq)]
pub struct Segment<'a>(pub &'a Coordinate, pub &'a Coordinate);

impl<'a> Segment<'a> {
    /// Point at fraction `t` of the way from the start to the end.
    pub fn interpolate(&self, t: f64) -> Coordinate {
        self.0.lerp(self.1, t)
    }

    /// Points spaced `step` apart along the segment, starting `step` from the start and stopping before the end.
    ///
    /// `length` is the length of the segment measured in the same units as `step`, which do not have to be the units
    /// of the coordinates.
    pub fn samples(&self, length: f64, step: f64) -> Vec<Coordinate> {
        (1..=Self::sample_count(length, step))
            .map(|k| self.interpolate(k as f64 * step / length))
            .collect()
    }

    /// Number of points [`Segment::samples`] returns for the same arguments, without creating them.
    ///
    /// The count saturates instead of overflowing when the step is tiny compared to the length.
    pub fn sample_count(length: f64, step: f64) -> usize {
        let valid = step > 0.0 && length > step && length.is_finite();
        if !valid {
            return 0;
        }

        // k * step < length for k in 1..=n
        (length / step).ceil() as usize - 1
    }

    /// Closest point of the segment to the given point, over the first two components.
    ///
    /// * if the normal from the point to the segment ends inside the segment, the foot of the normal is returned
    /// * otherwise the closer one of the endpoints is returned
    pub fn closest_point(&self, point: &Coordinate) -> Coordinate {
        let dx = self.1.x - self.0.x;
        let dy = self.1.y - self.0.y;
        let ds_len = dx * dx + dy * dy;
        if ds_len == 0.0 {
            return *self.0;
        }

        let r = ((point.x - self.0.x) * dx + (point.y - self.0.y) * dy) / ds_len;
        self.interpolate(r.clamp(0.0, 1.0))
    }

    /// Closest point of the segment to the given point, over all three components.
    pub fn closest_point_3d(&self, point: &Coordinate) -> Coordinate {
        let (az, bz, pz) = (
            self.0.z.unwrap_or(0.0),
            self.1.z.unwrap_or(0.0),
            point.z.unwrap_or(0.0),
        );
        let dx = self.1.x - self.0.x;
        let dy = self.1.y - self.0.y;
        let dz = bz - az;
        let ds_len = dx * dx + dy * dy + dz * dz;
        if ds_len == 0.0 {
            return *self.0;
        }

        let r = ((point.x - self.0.x) * dx + (point.y - self.0.y) * dy + (pz - az) * dz) / ds_len;
        self.interpolate(r.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn closest_point() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(10.0, 0.0);
        let segment = Segment(&a, &b);

        assert_eq!(segment.closest_point(&Coordinate::new(5.0, 3.0)), Coordinate::new(5.0, 0.0));
        assert_eq!(segment.closest_point(&Coordinate::new(-3.0, 4.0)), a);
        assert_eq!(segment.closest_point(&Coordinate::new(13.0, -4.0)), b);

        let degenerate = Segment(&a, &a);
        assert_eq!(degenerate.closest_point(&Coordinate::new(3.0, 4.0)), a);
    }

    #[test]
    fn samples_are_spaced_by_step() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 500.0);
        let samples = Segment(&a, &b).samples(500.0, 200.0);
        assert_eq!(
            samples,
            vec![Coordinate::new(0.0, 200.0), Coordinate::new(0.0, 400.0)]
        );
    }

    #[test]
    fn no_samples_for_short_segment() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 200.0);
        assert!(Segment(&a, &b).samples(200.0, 200.0).is_empty());
        assert_eq!(Segment(&a, &b).samples(201.0, 200.0).len(), 1);
    }

    #[test]
    fn sample_count_matches_samples() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1000.0);
        for (length, step) in [(1000.0, 200.0), (1000.0, 300.0), (1000.0, 1000.0), (1000.0, 0.0), (0.0, 200.0)] {
            assert_eq!(
                Segment::sample_count(length, step),
                Segment(&a, &b).samples(length, step).len()
            );
        }
        assert_eq!(Segment::sample_count(1000.0, 200.0), 4);
        assert_eq!(Segment::sample_count(1000.0, 300.0), 3);
        assert_eq!(Segment::sample_count(f64::INFINITY, 200.0), 0);
    }

    #[test]
    fn sample_count_of_tiny_step() {
        assert!(Segment::sample_count(2_000.0, 1e-6) > 1_000_000_000);
        assert_eq!(Segment::sample_count(1e300, 1e-300), usize::MAX - 1);
    }

    #[test]
    fn closest_point_3d() {
        let a = Coordinate::new_3d(0.0, 0.0, 0.0);
        let b = Coordinate::new_3d(0.0, 0.0, 10.0);
        let closest = Segment(&a, &b).closest_point_3d(&Coordinate::new_3d(1.0, 1.0, 4.0));
        assert_abs_diff_eq!(closest.z.unwrap(), 4.0);
    }
}
