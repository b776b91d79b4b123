pub mod box_utils;
pub mod face_detector;
pub mod scale_pyramid;
