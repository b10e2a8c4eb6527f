pub mod mock_board;

pub use mock_board::{BoardHandle, MockBoard, MockPort, RecordingPlatform};
