pub const PNET_MODEL_NAME: &str = "mtcnn_pnet.onnx";
pub const PNET_MODEL_URL: &str =
    "https://github.com/mtcnn-onnx/mtcnn/releases/download/v0.1.0/mtcnn_pnet.onnx";

pub const RNET_MODEL_NAME: &str = "mtcnn_rnet.onnx";
pub const RNET_MODEL_URL: &str =
    "https://github.com/mtcnn-onnx/mtcnn/releases/download/v0.1.0/mtcnn_rnet.onnx";

pub const ONET_MODEL_NAME: &str = "mtcnn_onet.onnx";
pub const ONET_MODEL_URL: &str =
    "https://github.com/mtcnn-onnx/mtcnn/releases/download/v0.1.0/mtcnn_onet.onnx";

/// Smallest face the cascade will look for, in pixels.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 20;

/// Per-stage confidence cutoffs: PNet, RNet, ONet.
pub const DEFAULT_STEPS_THRESHOLD: [f32; 3] = [0.6, 0.7, 0.7];

/// Pyramid decay between consecutive scales.
pub const DEFAULT_SCALE_FACTOR: f64 = 0.709;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
