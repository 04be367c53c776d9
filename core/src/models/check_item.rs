use super::{one, Checklist};
use crate::error::ApiError;

const COMPLETE: &str = "complete";
const INCOMPLETE: &str = "incomplete";

resource! {
    /// One entry of a checklist.
    CheckItem => CheckItem
}

impl CheckItem {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name")
    }

    pub fn set_name(&self, name: &str) -> Result<(), ApiError> {
        self.0.set("name", name)
    }

    pub fn pos(&self) -> Option<f64> {
        self.0.get_f64("pos")
    }

    pub fn state(&self) -> Option<String> {
        self.0.get_str("state")
    }

    pub fn is_complete(&self) -> bool {
        self.state().as_deref() == Some(COMPLETE)
    }

    pub fn set_complete(&self, complete: bool) -> Result<(), ApiError> {
        self.0.set("state", if complete { COMPLETE } else { INCOMPLETE })
    }

    pub fn checklist(&self) -> Option<Checklist> {
        one(&self.0, "checklist")
    }
}
