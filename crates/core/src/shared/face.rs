//! Detection result types: one [`Face`] per detected face, carrying the
//! bounding box, the final-stage confidence, and five named landmarks.

/// Rectangular face region in image coordinates, clamped to the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// The five canonical facial landmarks, each an `(x, y)` pixel coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keypoints {
    pub left_eye: (i32, i32),
    pub right_eye: (i32, i32),
    pub nose: (i32, i32),
    pub mouth_left: (i32, i32),
    pub mouth_right: (i32, i32),
}

impl Keypoints {
    /// Landmarks paired with their canonical names, in ONet output order.
    pub fn named(&self) -> [(&'static str, (i32, i32)); 5] {
        [
            ("left_eye", self.left_eye),
            ("right_eye", self.right_eye),
            ("nose", self.nose),
            ("mouth_left", self.mouth_left),
            ("mouth_right", self.mouth_right),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
    pub bounding_box: BoundingBox,
    /// ONet score for this face, in [0, 1].
    pub confidence: f32,
    pub keypoints: Keypoints,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypoints() -> Keypoints {
        Keypoints {
            left_eye: (440, 350),
            right_eye: (560, 350),
            nose: (500, 420),
            mouth_left: (460, 470),
            mouth_right: (540, 470),
        }
    }

    #[test]
    fn test_named_has_five_entries() {
        let named = keypoints().named();
        assert_eq!(named.len(), 5);
    }

    #[test]
    fn test_named_order_and_values() {
        let named = keypoints().named();
        assert_eq!(named[0], ("left_eye", (440, 350)));
        assert_eq!(named[1], ("right_eye", (560, 350)));
        assert_eq!(named[2], ("nose", (500, 420)));
        assert_eq!(named[3], ("mouth_left", (460, 470)));
        assert_eq!(named[4], ("mouth_right", (540, 470)));
    }

    #[test]
    fn test_face_construction() {
        let face = Face {
            bounding_box: BoundingBox {
                x: 420,
                y: 300,
                width: 200,
                height: 240,
            },
            confidence: 0.99,
            keypoints: keypoints(),
        };
        assert_eq!(face.bounding_box.width, 200);
        assert!(face.confidence > 0.9);
    }
}
