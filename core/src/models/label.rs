use super::{one, Board};
use crate::error::ApiError;

resource! {
    /// A colored tag defined on a board.
    Label => Label
}

impl Label {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name")
    }

    pub fn set_name(&self, name: &str) -> Result<(), ApiError> {
        self.0.set("name", name)
    }

    pub fn color(&self) -> Option<String> {
        self.0.get_str("color")
    }

    pub fn set_color(&self, color: &str) -> Result<(), ApiError> {
        self.0.set("color", color)
    }

    pub fn board(&self) -> Option<Board> {
        one(&self.0, "board")
    }
}
