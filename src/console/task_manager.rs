use super::actions::Action;
use crate::components::rows::RowKey;
use crate::form::FormId;
use crate::transport::{ConsoleBackend, SubmitRequest};
use crate::view::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

pub type TaskId = u64;

#[derive(Debug)]
pub struct BackgroundTask {
    pub id: TaskId,
    pub handle: JoinHandle<()>,
    pub description: String,
    pub started_at: std::time::Instant,
}

/// Runs network operations on tokio and reports their results as actions
pub struct TaskManager {
    tasks: HashMap<TaskId, BackgroundTask>,
    next_task_id: TaskId,
    action_sender: mpsc::UnboundedSender<Action>,
    backend: Arc<dyn ConsoleBackend>,
}

impl TaskManager {
    pub fn new(backend: Arc<dyn ConsoleBackend>) -> (Self, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Self {
                tasks: HashMap::new(),
                next_task_id: 1,
                action_sender: tx,
                backend,
            },
            rx,
        )
    }

    fn register(&mut self, handle: JoinHandle<()>, description: String) -> TaskId {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        log::debug!("Task {}: {}", task_id, description);
        let task = BackgroundTask {
            id: task_id,
            handle,
            description,
            started_at: std::time::Instant::now(),
        };

        self.tasks.insert(task_id, task);
        task_id
    }

    /// Fetch the custom type names needed for a new field row
    pub fn spawn_type_listing(&mut self, form: FormId) -> TaskId {
        let action_sender = self.action_sender.clone();
        let backend = Arc::clone(&self.backend);

        let handle = tokio::spawn(async move {
            let action = match backend.fetch_type_names().await {
                Ok(names) => Action::TypeNamesLoaded { form, names },
                Err(error) => Action::TypeNamesFailed { form, error },
            };
            let _ = action_sender.send(action);
        });

        self.register(handle, "Load type names".to_string())
    }

    /// Fetch a listing fragment for the control at `anchor`
    pub fn spawn_fragment_load(&mut self, anchor: NodeId, url: Url) -> TaskId {
        let action_sender = self.action_sender.clone();
        let backend = Arc::clone(&self.backend);
        let description = format!("Load fragment {}", url);

        let handle = tokio::spawn(async move {
            let action = match backend.fetch_fragment(&url).await {
                Ok(response) => Action::FragmentLoaded { anchor, response },
                Err(error) => Action::FragmentFailed { anchor, error },
            };
            let _ = action_sender.send(action);
        });

        self.register(handle, description)
    }

    pub fn spawn_filter_load(&mut self, form: FormId, key: RowKey, url: Url) -> TaskId {
        let action_sender = self.action_sender.clone();
        let backend = Arc::clone(&self.backend);
        let description = format!("Load filter {}", key);

        let handle = tokio::spawn(async move {
            let action = match backend.fetch_fragment(&url).await {
                Ok(response) => Action::FilterLoaded { form, key, response },
                Err(error) => Action::FilterFailed { form, key, error },
            };
            let _ = action_sender.send(action);
        });

        self.register(handle, description)
    }

    /// Post a form; with `track_progress` every transfer sample is forwarded as an action
    pub fn spawn_submission(&mut self, form: FormId, request: SubmitRequest, track_progress: bool) -> TaskId {
        let action_sender = self.action_sender.clone();
        let backend = Arc::clone(&self.backend);
        let description = format!("Submit {}", request.url);

        let handle = tokio::spawn(async move {
            let (progress, forwarder) = if track_progress {
                let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
                let progress_sender = action_sender.clone();
                let forwarder = tokio::spawn(async move {
                    while let Some(sample) = progress_rx.recv().await {
                        if progress_sender.send(Action::UploadProgress(sample)).is_err() {
                            break;
                        }
                    }
                });
                (Some(progress_tx), Some(forwarder))
            } else {
                (None, None)
            };

            let result = backend.submit(request, progress).await;

            if let Some(forwarder) = forwarder {
                forwarder.abort();
            }

            let action = match result {
                Ok(response) => Action::SubmissionCompleted { form, response },
                Err(error) => Action::SubmissionFailed { form, error },
            };
            let _ = action_sender.send(action);
        });

        self.register(handle, description)
    }

    /// Abort a running task; returns false when it already finished
    pub fn abort(&mut self, task_id: TaskId) -> bool {
        match self.tasks.remove(&task_id) {
            Some(task) if !task.handle.is_finished() => {
                task.handle.abort();
                log::info!("Task {} aborted: {}", task.id, task.description);
                true
            }
            _ => false,
        }
    }

    /// Check for completed tasks and clean them up
    pub fn cleanup_finished_tasks(&mut self) -> Vec<TaskId> {
        let finished: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.handle.is_finished())
            .map(|(task_id, _)| *task_id)
            .collect();

        for task_id in &finished {
            if let Some(task) = self.tasks.remove(task_id) {
                log::debug!(
                    "Task {} finished after {:?}: {}",
                    task.id,
                    task.started_at.elapsed(),
                    task.description
                );
            }
        }

        finished
    }

    /// Cancel all running tasks
    pub fn cancel_all_tasks(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.handle.abort();
        }
    }

    /// Get the number of active tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.cancel_all_tasks();
    }
}
