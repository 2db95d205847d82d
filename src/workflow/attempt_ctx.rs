//! 尝试上下文
//!
//! 封装"这是第几次尝试"这一信息，只用于日志

use std::fmt::Display;

/// 单次尝试的上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCtx {
    /// 从 1 开始
    pub attempt: u32,
    pub max_attempts: u32,
}

impl AttemptCtx {
    pub fn new(attempt: u32, max_attempts: u32) -> Self {
        Self {
            attempt,
            max_attempts,
        }
    }

    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

impl Display for AttemptCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(Attempt {}/{})", self.attempt, self.max_attempts)
    }
}
