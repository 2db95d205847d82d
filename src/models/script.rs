//! 交互脚本模型
//!
//! 一组按顺序执行、带延迟的输入动作

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 设备输入动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputAction {
    /// 点击屏幕坐标
    Tap { x: u32, y: u32 },
    /// 发送按键，例如 KEYCODE_BACK
    KeyEvent { code: String },
}

impl InputAction {
    /// 对应的 `adb shell input ...` 参数
    pub fn to_input_args(&self) -> Vec<String> {
        match self {
            InputAction::Tap { x, y } => vec![
                "input".to_string(),
                "tap".to_string(),
                x.to_string(),
                y.to_string(),
            ],
            InputAction::KeyEvent { code } => {
                vec!["input".to_string(), "keyevent".to_string(), code.clone()]
            }
        }
    }
}

/// 脚本中的一步
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// 日志中显示的步骤名
    pub label: String,
    pub action: InputAction,
    /// 执行后至少等待的毫秒数
    pub delay_ms: u64,
    /// 额外的随机等待上限（毫秒）
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_jitter_ms() -> u64 {
    1500
}

impl ScriptStep {
    pub fn tap(label: &str, (x, y): (u32, u32), delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            label: label.to_string(),
            action: InputAction::Tap { x, y },
            delay_ms,
            jitter_ms,
        }
    }

    pub fn key(label: &str, code: &str, delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            label: label.to_string(),
            action: InputAction::KeyEvent {
                code: code.to_string(),
            },
            delay_ms,
            jitter_ms,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

/// 完整的交互脚本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionScript {
    pub steps: Vec<ScriptStep>,
}

// 默认坐标（按设备调整，或通过 INTERACTION_SCRIPT 覆盖）
const COORD_PLUS: (u32, u32) = (95, 2253);
const COORD_ATTACH: (u32, u32) = (780, 1555);
const COORD_IMAGE: (u32, u32) = (500, 750);
const COORD_SEND: (u32, u32) = (985, 1365);
const COORD_PHOTO: (u32, u32) = (600, 900);
const COORD_DOTS: (u32, u32) = (1011, 161);
const COORD_SAVE: (u32, u32) = (720, 320);

impl Default for InteractionScript {
    /// 发送图片 → 打开图片 → 保存 → 返回聊天
    fn default() -> Self {
        Self {
            steps: vec![
                ScriptStep::tap("点击加号按钮", COORD_PLUS, 2000, 1500),
                ScriptStep::tap("点击附件按钮", COORD_ATTACH, 2000, 1500),
                ScriptStep::tap("选择图片", COORD_IMAGE, 2000, 1500),
                ScriptStep::tap("发送图片", COORD_SEND, 10000, 2000),
                ScriptStep::tap("打开已上传的图片", COORD_PHOTO, 7000, 1000),
                ScriptStep::tap("打开选项菜单", COORD_DOTS, 2000, 1500),
                ScriptStep::tap("点击保存", COORD_SAVE, 3000, 1500),
                ScriptStep::key("返回聊天", "KEYCODE_BACK", 2000, 1500),
            ],
        }
    }
}

impl InteractionScript {
    /// 不带任何延迟的副本，便于测试
    pub fn without_delays(mut self) -> Self {
        for step in &mut self.steps {
            step.delay_ms = 0;
            step.jitter_ms = 0;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_script_order() {
        let script = InteractionScript::default();
        assert_eq!(script.len(), 8);
        assert_eq!(
            script.steps[0].action,
            InputAction::Tap { x: 95, y: 2253 }
        );
        assert_eq!(
            script.steps.last().map(|s| s.action.clone()),
            Some(InputAction::KeyEvent {
                code: "KEYCODE_BACK".to_string()
            })
        );
    }

    #[test]
    fn test_input_args() {
        assert_eq!(
            InputAction::Tap { x: 1, y: 2 }.to_input_args(),
            vec!["input", "tap", "1", "2"]
        );
        assert_eq!(
            InputAction::KeyEvent {
                code: "KEYCODE_BACK".into()
            }
            .to_input_args(),
            vec!["input", "keyevent", "KEYCODE_BACK"]
        );
    }

    #[test]
    fn test_without_delays() {
        let script = InteractionScript::default().without_delays();
        assert!(script
            .steps
            .iter()
            .all(|s| s.delay() == Duration::ZERO && s.jitter() == Duration::ZERO));
    }
}
