use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurgeError {
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("连接错误: {0}")]
    Connection(String),
    #[error("协议错误: {0}")]
    Protocol(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("文件错误: {path} - {message}")]
    Io { path: String, message: String },
    #[error("存储传输失败: {key} - {message}")]
    Storage { key: String, message: String },
    #[error("外部程序执行失败: {program} - {message}")]
    Collaborator { program: String, message: String },
    #[error("内部通道已关闭: {0}")]
    ChannelClosed(String),
    #[error("操作超时: {0}")]
    Timeout(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SurgeResult<T> = Result<T, SurgeError>;

impl SurgeError {
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn protocol_error<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }
    pub fn io_error<P: Into<String>>(path: P, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
    pub fn storage_error<K: Into<String>, S: Into<String>>(key: K, msg: S) -> Self {
        Self::Storage {
            key: key.into(),
            message: msg.into(),
        }
    }
    pub fn collaborator_error<P: Into<String>, S: Into<String>>(program: P, msg: S) -> Self {
        Self::Collaborator {
            program: program.into(),
            message: msg.into(),
        }
    }
    /// Collaborator failures only abort the current job; everything else stops the worker.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SurgeError::Collaborator { .. })
    }
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            SurgeError::Connection(_) | SurgeError::Timeout(_) | SurgeError::ChannelClosed(_)
        )
    }
}

impl From<serde_json::Error> for SurgeError {
    fn from(err: serde_json::Error) -> Self {
        SurgeError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SurgeError {
    fn from(err: anyhow::Error) -> Self {
        SurgeError::Internal(err.to_string())
    }
}
