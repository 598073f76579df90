//! Warp a detected face onto the canonical 112×112 ArcFace crop.

use image::{Rgb, RgbImage};

pub const ALIGNED_SIZE: u32 = 112;

/// Where the five landmarks sit in a 112×112 crop.
const CANONICAL_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Scale + rotation + translation: `(x, y) -> (a·x − b·y + tx, b·x + a·y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Least-squares fit mapping `src` onto `dst`.
    ///
    /// `None` when the source points are all coincident.
    pub fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Option<Self> {
        let n = src.len() as f32;
        let mean = |pts: &[(f32, f32); 5]| {
            let (sx, sy) = pts
                .iter()
                .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n, sy / n)
        };
        let (smx, smy) = mean(src);
        let (dmx, dmy) = mean(dst);

        let (mut dot, mut cross, mut norm) = (0.0f32, 0.0f32, 0.0f32);
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
            let (sx, sy) = (sx - smx, sy - smy);
            let (dx, dy) = (dx - dmx, dy - dmy);
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
            norm += sx * sx + sy * sy;
        }
        if norm < 1e-9 {
            return None;
        }

        let a = dot / norm;
        let b = cross / norm;
        Some(Self {
            a,
            b,
            tx: dmx - (a * smx - b * smy),
            ty: dmy - (b * smx + a * smy),
        })
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let (a, b) = (self.a / det, -self.b / det);
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

/// Crop the face with `landmarks` into an aligned 112×112 RGB image.
///
/// Pixels that map outside the frame are black.
pub fn align_face(frame: &RgbImage, landmarks: &[(f32, f32); 5]) -> Option<RgbImage> {
    let to_frame = Similarity::estimate(landmarks, &CANONICAL_LANDMARKS)?.inverse()?;

    Some(RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |ox, oy| {
        let (sx, sy) = to_frame.apply((ox as f32, oy as f32));
        sample_bilinear(frame, sx, sy)
    }))
}

fn sample_bilinear(frame: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let (x0, y0) = (x.floor() as i64, y.floor() as i64);
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let texel = |px: i64, py: i64, c: usize| -> f32 {
        if px >= 0 && px < w && py >= 0 && py < h {
            frame.get_pixel(px as u32, py as u32)[c] as f32
        } else {
            0.0
        }
    };

    let mut out = [0u8; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let top = texel(x0, y0, c) * (1.0 - fx) + texel(x0 + 1, y0, c) * fx;
        let bottom = texel(x0, y0 + 1, c) * (1.0 - fx) + texel(x0 + 1, y0 + 1, c) * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn test_estimate_identity() {
        let t = Similarity::estimate(&CANONICAL_LANDMARKS, &CANONICAL_LANDMARKS).unwrap();
        assert!((t.a - 1.0).abs() < 1e-5);
        assert!(t.b.abs() < 1e-5);
        assert!(t.tx.abs() < 1e-3 && t.ty.abs() < 1e-3);
    }

    #[test]
    fn test_estimate_recovers_half_scale() {
        let src = CANONICAL_LANDMARKS.map(|(x, y)| (x * 2.0 + 100.0, y * 2.0 + 40.0));
        let t = Similarity::estimate(&src, &CANONICAL_LANDMARKS).unwrap();
        assert!((t.a - 0.5).abs() < 1e-5);
        assert!(t.b.abs() < 1e-5);
        for (s, d) in src.iter().zip(CANONICAL_LANDMARKS.iter()) {
            assert!(close(t.apply(*s), *d));
        }
    }

    #[test]
    fn test_estimate_recovers_quarter_turn() {
        // (x, y) -> (-y, x)
        let dst = CANONICAL_LANDMARKS.map(|(x, y)| (-y, x));
        let t = Similarity::estimate(&CANONICAL_LANDMARKS, &dst).unwrap();
        assert!(t.a.abs() < 1e-5);
        assert!((t.b - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_inverse_round_trips_points() {
        let t = Similarity {
            a: 0.8,
            b: 0.3,
            tx: 12.0,
            ty: -7.0,
        };
        let inv = t.inverse().unwrap();
        let p = (31.0, 54.5);
        assert!(close(inv.apply(t.apply(p)), p));
    }

    #[test]
    fn test_coincident_landmarks_cannot_align() {
        let frame = RgbImage::new(64, 64);
        assert!(align_face(&frame, &[(10.0, 10.0); 5]).is_none());
    }

    #[test]
    fn test_align_face_copies_canonical_region() {
        // Frame already in canonical position; a bright patch around the nose survives.
        let mut frame = RgbImage::new(ALIGNED_SIZE, ALIGNED_SIZE);
        for y in 66..78 {
            for x in 50..62 {
                frame.put_pixel(x, y, Rgb([250, 10, 10]));
            }
        }

        let aligned = align_face(&frame, &CANONICAL_LANDMARKS).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        assert_eq!(aligned.get_pixel(56, 72), &Rgb([250, 10, 10]));
        assert_eq!(aligned.get_pixel(5, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_align_face_outside_frame_is_black() {
        let frame = RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]));
        let far = CANONICAL_LANDMARKS.map(|(x, y)| (x + 1000.0, y + 1000.0));
        let aligned = align_face(&frame, &far).unwrap();
        assert!(aligned.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
