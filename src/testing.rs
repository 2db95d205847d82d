//! 测试用的内存设备
//!
//! 模拟设备文件系统和应用行为：注入输入后，上传目录中的每个文件
//! 都会在下载目录生成一个"压缩后"的同名文件

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{AppError, AppResult, TransferOp};
use crate::infrastructure::DeviceBridge;
use crate::models::InputAction;

#[derive(Default)]
struct FakeState {
    files: BTreeMap<String, Vec<u8>>,
    pushes: Vec<String>,
    pulls: HashMap<String, u32>,
    inputs: Vec<InputAction>,
    shell_commands: Vec<String>,
}

/// 内存设备
pub struct FakeDevice {
    upload_root: String,
    download_root: String,
    devices_output: String,
    fail_push: HashSet<String>,
    fail_pull: HashSet<String>,
    unconfirmed_pull: HashSet<String>,
    fail_input: bool,
    fail_shell: bool,
    state: Mutex<FakeState>,
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `shell_quote` 的逆操作
fn unquote(arg: &str) -> String {
    arg.strip_prefix('\'')
        .and_then(|a| a.strip_suffix('\''))
        .unwrap_or(arg)
        .replace("'\\''", "'")
}

impl FakeDevice {
    pub fn new(upload_root: &str, download_root: &str) -> Self {
        Self {
            upload_root: upload_root.trim_end_matches('/').to_string(),
            download_root: download_root.trim_end_matches('/').to_string(),
            devices_output: "List of devices attached\nemulator-5554\tdevice".to_string(),
            fail_push: HashSet::new(),
            fail_pull: HashSet::new(),
            unconfirmed_pull: HashSet::new(),
            fail_input: false,
            fail_shell: false,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// 没有连接设备
    pub fn disconnected(mut self) -> Self {
        self.devices_output = "List of devices attached\n".to_string();
        self
    }

    /// push 该文件名时返回传输错误
    pub fn failing_push(mut self, name: &str) -> Self {
        self.fail_push.insert(name.to_string());
        self
    }

    /// pull 该文件名时返回传输错误
    pub fn failing_pull(mut self, name: &str) -> Self {
        self.fail_pull.insert(name.to_string());
        self
    }

    /// pull 该文件名时传输成功但不写本地文件
    pub fn unconfirmed_pull(mut self, name: &str) -> Self {
        self.unconfirmed_pull.insert(name.to_string());
        self
    }

    /// 所有输入注入都失败（应用不会产生结果）
    pub fn failing_input(mut self) -> Self {
        self.fail_input = true;
        self
    }

    /// 所有 shell 命令都失败
    pub fn failing_shell(mut self) -> Self {
        self.fail_shell = true;
        self
    }

    pub fn push_count(&self) -> usize {
        self.lock().pushes.len()
    }

    pub fn pushed_names(&self) -> Vec<String> {
        self.lock()
            .pushes
            .iter()
            .map(|p| file_name(p).to_string())
            .collect()
    }

    pub fn pull_attempts(&self, name: &str) -> u32 {
        let path = format!("{}/{}", self.download_root, name);
        self.lock().pulls.get(&path).copied().unwrap_or(0)
    }

    pub fn input_count(&self) -> usize {
        self.lock().inputs.len()
    }

    pub fn inputs(&self) -> Vec<InputAction> {
        self.lock().inputs.clone()
    }

    pub fn shell_commands(&self) -> Vec<String> {
        self.lock().shell_commands.clone()
    }

    /// 设备上当前存在的文件路径
    pub fn remote_files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl DeviceBridge for FakeDevice {
    async fn list_devices(&self) -> AppResult<String> {
        Ok(self.devices_output.clone())
    }

    async fn push(&self, local_path: &Path, remote_path: &str) -> AppResult<()> {
        let mut state = self.lock();
        state.pushes.push(remote_path.to_string());
        if self.fail_push.contains(file_name(remote_path)) {
            return Err(AppError::transfer(TransferOp::Push, remote_path, "exit status: 1"));
        }
        let bytes = std::fs::read(local_path)
            .map_err(|e| AppError::transfer(TransferOp::Push, remote_path, e.to_string()))?;
        state.files.insert(remote_path.to_string(), bytes);
        Ok(())
    }

    async fn pull(&self, remote_path: &str, local_path: &Path) -> AppResult<()> {
        let mut state = self.lock();
        *state.pulls.entry(remote_path.to_string()).or_default() += 1;

        let name = file_name(remote_path);
        if self.fail_pull.contains(name) {
            return Err(AppError::transfer(TransferOp::Pull, remote_path, "exit status: 1"));
        }
        if self.unconfirmed_pull.contains(name) {
            return Ok(());
        }
        let bytes = state.files.get(remote_path).cloned().ok_or_else(|| {
            AppError::transfer(TransferOp::Pull, remote_path, "remote object does not exist")
        })?;
        std::fs::write(local_path, bytes)
            .map_err(|e| AppError::transfer(TransferOp::Pull, remote_path, e.to_string()))?;
        Ok(())
    }

    async fn inject_input(&self, action: &InputAction) -> AppResult<()> {
        let mut state = self.lock();
        state.inputs.push(action.clone());
        if self.fail_input {
            return Err(AppError::Interaction {
                step: action.to_input_args().join(" "),
                reason: "exit status: 255".to_string(),
            });
        }

        let upload_prefix = format!("{}/", self.upload_root);
        let produced: Vec<(String, Vec<u8>)> = state
            .files
            .iter()
            .filter(|(path, _)| path.starts_with(&upload_prefix))
            .map(|(path, bytes)| {
                let mut compressed = b"compressed:".to_vec();
                compressed.extend_from_slice(bytes);
                (
                    format!("{}/{}", self.download_root, file_name(path)),
                    compressed,
                )
            })
            .collect();
        state.files.extend(produced);
        Ok(())
    }

    async fn shell(&self, command: &str) -> AppResult<String> {
        let mut state = self.lock();
        state.shell_commands.push(command.to_string());
        if self.fail_shell {
            return Err(AppError::Bridge {
                command: command.to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        if let Some(rest) = command.strip_prefix("rm -f ") {
            state.files.remove(&unquote(rest));
        }
        Ok(String::new())
    }
}
