use std::sync::Arc;

use surge_domain::Job;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    RequestSent,
    Executing,
}

/// 工作循环下一次 tick 要做的事
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    RequestJob,
    Execute(Job),
    Wait,
}

#[derive(Debug, Default)]
struct WorkerStateInner {
    current_job: Option<Job>,
    request_pending: bool,
}

/// 接收任务和工作循环共享的状态: 当前任务和待响应请求标记, 所有读写都经过互斥锁
#[derive(Debug, Clone, Default)]
pub struct WorkerState {
    inner: Arc<Mutex<WorkerStateInner>>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存解码后的任务并清除待响应标记, 返回被替换的任务 (如果有)
    pub async fn job_received(&self, job: Job) -> Option<Job> {
        let mut inner = self.inner.lock().await;
        inner.request_pending = false;
        inner.current_job.replace(job)
    }

    /// 队列暂无任务
    pub async fn queue_empty(&self) {
        self.inner.lock().await.request_pending = false;
    }

    /// 决定下一步; 请求任务时在同一临界区内标记待响应, 不会发出第二个请求
    pub async fn next_action(&self) -> NextAction {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.current_job.clone() {
            inner.request_pending = false;
            return NextAction::Execute(job);
        }
        if inner.request_pending {
            return NextAction::Wait;
        }
        inner.request_pending = true;
        NextAction::RequestJob
    }

    /// 结果上报后丢弃 `job`; 期间到达的其他任务留给下一次 tick, 返回槽位是否已清空
    pub async fn finish_job(&self, job: &Job) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.current_job.as_ref() == Some(job) {
            inner.current_job = None;
        }
        inner.current_job.is_none()
    }

    pub async fn current_job(&self) -> Option<Job> {
        self.inner.lock().await.current_job.clone()
    }

    pub async fn is_request_pending(&self) -> bool {
        self.inner.lock().await.request_pending
    }

    pub async fn phase(&self) -> WorkerPhase {
        let inner = self.inner.lock().await;
        match (&inner.current_job, inner.request_pending) {
            (Some(_), _) => WorkerPhase::Executing,
            (None, true) => WorkerPhase::RequestSent,
            (None, false) => WorkerPhase::Idle,
        }
    }
}
