pub mod model_resolver;
pub mod onnx_mtcnn_detector;
pub mod preprocess;
