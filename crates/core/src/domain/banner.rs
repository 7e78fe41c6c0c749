use serde::Serialize;

/// 画面に1件だけ表示される通知。新しいメッセージは常に前のものを置き換える。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Banner {
    None,
    Success(String),
    Error(String),
}

impl Banner {
    pub fn set_success(&mut self, message: impl Into<String>) {
        *self = Self::Success(message.into());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        *self = Self::Error(message.into());
    }

    pub fn clear(&mut self) {
        *self = Self::None;
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Success(m) | Self::Error(m) => Some(m),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::None
    }
}
