//! # Task Management System
//!
//! A small worker pool for CPU-bound work that must not block the thread
//! driving the world.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker
//! - `TaskResult`: The result of a completed task, applied to a context `C`
//! - `TaskChannel`: Communication channel between the owning thread and one worker
//!
//! Each worker has a dedicated channel and at most [`MAX_TASKS_IN_FLIGHT`]
//! tasks. Tasks that cannot be sent right away wait in a FIFO queue and are
//! handed out round-robin by `process_queued_tasks()`.
//!
//! With zero workers every task is processed inline on `publish_task()` and
//! its result is applied by the next `process_completed_tasks()` call, so the
//! calling code does not change. The same happens once every worker has
//! stopped. Tasks that were on a worker when it stopped are counted and
//! reported by `take_lost_tasks()`.
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut task_manager = TaskManager::new(2)?;
//!
//! task_manager.publish_task(Box::new(MyTask::new(...)));
//!
//! // In the owning loop:
//! task_manager.process_completed_tasks(&mut context);
//! task_manager.process_queued_tasks();
//! ```
//!
//! Dropping the manager closes every channel and joins the workers, waiting
//! for the task each one is currently processing.

pub mod task;

use log::{error, trace};
use std::{
    collections::VecDeque,
    io,
    sync::mpsc::{channel, Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
};
use task::{Task, TaskResult};

type BoxedTask<C> = Box<dyn Task<C> + Send>;
type BoxedResult<C> = Box<dyn TaskResult<C> + Send>;

/// A communication channel between the owning thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks to the worker; dropping it stops the worker
/// - `result_receiver`: Receives task results from the worker
/// - `num_tasks_in_flight`: Tasks sent but whose result was not received yet
/// - `worker`: Handle to the worker thread, joined on drop
struct TaskChannel<C> {
    task_sender: Option<Sender<BoxedTask<C>>>,
    result_receiver: Receiver<BoxedResult<C>>,
    num_tasks_in_flight: usize,
    worker: Option<JoinHandle<()>>,
    disconnected: bool,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// `C` is the context handed to every [`TaskResult::handle_result`].
pub struct TaskManager<C> {
    channels: Vec<TaskChannel<C>>,
    queued_tasks: VecDeque<BoxedTask<C>>,
    /// Results of tasks processed inline, when there are no workers.
    completed_inline: VecDeque<BoxedResult<C>>,
    current_channel: usize,
    /// Tasks that were on a worker when it stopped, never to report back.
    lost_tasks: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// With one task per worker, queued work is never committed to a busy
/// worker and results come back in order within each channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl<C: 'static> TaskManager<C> {
    /// Creates a new `TaskManager` with `num_workers` named worker threads.
    ///
    /// `0` workers means every task runs inline on the publishing thread.
    pub fn new(num_workers: usize) -> io::Result<Self> {
        let mut channels = Vec::with_capacity(num_workers);

        for worker_index in 0..num_workers {
            let (task_tx, task_rx) = channel::<BoxedTask<C>>();
            let (result_tx, result_rx) = channel::<BoxedResult<C>>();

            let worker = thread::Builder::new()
                .name(format!("mesh-worker-{}", worker_index))
                .spawn(move || {
                    while let Ok(task) = task_rx.recv() {
                        let result = task.process();
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                })?;

            channels.push(TaskChannel {
                task_sender: Some(task_tx),
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                worker: Some(worker),
                disconnected: false,
            });
        }

        Ok(TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            completed_inline: VecDeque::new(),
            current_channel: 0,
            lost_tasks: 0,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.channels.len()
    }

    /// Tasks waiting for a free worker.
    pub fn queued_len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Tasks handed to a worker whose result has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum::<usize>()
            + self.completed_inline.len()
    }

    /// Whether every published task has had its result applied.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.in_flight() == 0
    }

    /// Returns the number of tasks lost to stopped workers since the last
    /// call. Their results will never be applied.
    pub fn take_lost_tasks(&mut self) -> usize {
        std::mem::take(&mut self.lost_tasks)
    }

    fn has_live_worker(&self) -> bool {
        self.channels.iter().any(|channel| !channel.disconnected)
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// Returns the task back if the worker is gone, so it can be requeued.
    fn try_send_task(&mut self, task: BoxedTask<C>, channel_idx: usize) -> Result<(), BoxedTask<C>> {
        let channel = &mut self.channels[channel_idx];
        let sender = match &channel.task_sender {
            Some(sender) => sender,
            None => return Err(task),
        };

        match sender.send(task) {
            Ok(_) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                error!("Mesh worker {} disconnected, its tasks are requeued", channel_idx);
                channel.disconnected = true;
                Err(task.0)
            }
        }
    }

    /// Finds a worker channel that can accept a new task, round-robin from the
    /// last used channel. Full and disconnected channels are skipped.
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|offset| (self.current_channel + offset) % len)
            .find(|&index| {
                let channel = &self.channels[index];
                !channel.disconnected && channel.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
            })
    }

    /// Publishes a new task for execution.
    ///
    /// Returns `true` if the task was handed to a worker (or processed
    /// inline), `false` if it was queued because all workers are busy.
    pub fn publish_task(&mut self, task: BoxedTask<C>) -> bool {
        if !self.has_live_worker() {
            self.completed_inline.push_back(task.process());
            return true;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to free workers, oldest first, until the queue is
    /// empty or every worker is busy. With no worker left the queue is
    /// processed inline.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let task = match self.queued_tasks.pop_front() {
                Some(task) => task,
                None => return,
            };

            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }

        if !self.has_live_worker() && !self.queued_tasks.is_empty() {
            trace!("No mesh worker left, processing {} queued tasks inline", self.queued_tasks.len());
            while let Some(task) = self.queued_tasks.pop_front() {
                self.completed_inline.push_back(task.process());
            }
        }
    }

    /// Applies every result received so far to `context`. Never blocks.
    ///
    /// Returns the number of results applied.
    pub fn process_completed_tasks(&mut self, context: &mut C) -> usize {
        let mut handled = 0;

        while let Some(result) = self.completed_inline.pop_front() {
            result.handle_result(context);
            handled += 1;
        }

        for (channel_idx, channel) in self.channels.iter_mut().enumerate() {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight -= 1;
                        result.handle_result(context);
                        handled += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !channel.disconnected {
                            error!("Mesh worker {} stopped unexpectedly", channel_idx);
                            channel.disconnected = true;
                        }
                        self.lost_tasks += channel.num_tasks_in_flight;
                        channel.num_tasks_in_flight = 0;
                        break;
                    }
                }
            }
        }

        if handled > 0 {
            trace!("Applied {} task results", handled);
        }
        handled
    }

    /// Drops every queued task. Tasks already on a worker still complete.
    pub fn discard_queued_tasks(&mut self) -> usize {
        let discarded = self.queued_tasks.len();
        self.queued_tasks.clear();
        discarded
    }
}

impl<C> Drop for TaskManager<C> {
    fn drop(&mut self) {
        for channel in &mut self.channels {
            channel.task_sender.take();
        }
        for channel in &mut self.channels {
            if let Some(worker) = channel.worker.take() {
                if worker.join().is_err() {
                    error!("A mesh worker panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[derive(Default)]
    struct Sum {
        total: u64,
        order: Vec<u64>,
    }

    struct Square(u64);

    struct Squared(u64);

    impl Task<Sum> for Square {
        fn process(self: Box<Self>) -> Box<dyn TaskResult<Sum> + Send> {
            Box::new(Squared(self.0 * self.0))
        }
    }

    impl TaskResult<Sum> for Squared {
        fn handle_result(self: Box<Self>, context: &mut Sum) {
            context.total += self.0;
            context.order.push(self.0);
        }
    }

    fn drain(manager: &mut TaskManager<Sum>, sum: &mut Sum) {
        for _ in 0..2000 {
            manager.process_completed_tasks(sum);
            manager.process_queued_tasks();
            if manager.is_idle() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("tasks did not finish");
    }

    #[test]
    fn inline_manager_processes_on_publish() {
        let mut manager = TaskManager::new(0).unwrap();
        let mut sum = Sum::default();

        assert!(manager.publish_task(Box::new(Square(3))));
        assert!(manager.publish_task(Box::new(Square(4))));
        assert_eq!(manager.in_flight(), 2);

        assert_eq!(manager.process_completed_tasks(&mut sum), 2);
        assert_eq!(sum.total, 25);
        assert_eq!(sum.order, vec![9, 16]);
        assert!(manager.is_idle());
    }

    #[test]
    fn workers_process_every_task() {
        let mut manager = TaskManager::new(3).unwrap();
        let mut sum = Sum::default();

        for value in 1..=20 {
            manager.publish_task(Box::new(Square(value)));
        }
        assert!(manager.queued_len() >= 17);

        drain(&mut manager, &mut sum);
        assert_eq!(sum.total, (1..=20u64).map(|v| v * v).sum::<u64>());
        assert_eq!(sum.order.len(), 20);
    }

    #[test]
    fn discarded_tasks_never_report() {
        let mut manager = TaskManager::new(1).unwrap();
        let mut sum = Sum::default();

        for value in 1..=5 {
            manager.publish_task(Box::new(Square(value)));
        }
        assert_eq!(manager.discard_queued_tasks(), 4);

        drain(&mut manager, &mut sum);
        assert_eq!(sum.order, vec![1]);
    }

    struct Explode;

    impl Task<Sum> for Explode {
        fn process(self: Box<Self>) -> Box<dyn TaskResult<Sum> + Send> {
            panic!("worker task failed");
        }
    }

    #[test]
    fn stopped_worker_loses_its_task_and_falls_back_inline() {
        let mut manager = TaskManager::new(1).unwrap();
        let mut sum = Sum::default();

        assert!(manager.publish_task(Box::new(Explode)));
        assert!(!manager.publish_task(Box::new(Square(3))));
        assert_eq!(manager.queued_len(), 1);

        let mut lost = 0;
        for _ in 0..2000 {
            manager.process_completed_tasks(&mut sum);
            lost += manager.take_lost_tasks();
            if lost > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(lost, 1);
        assert_eq!(manager.take_lost_tasks(), 0);

        manager.process_queued_tasks();
        assert_eq!(manager.queued_len(), 0);
        assert!(manager.publish_task(Box::new(Square(4))));
        assert_eq!(manager.queued_len(), 0);

        assert_eq!(manager.process_completed_tasks(&mut sum), 2);
        assert_eq!(sum.order, vec![9, 16]);
        assert!(manager.is_idle());
    }

    #[test]
    fn dropping_the_manager_joins_workers() {
        let mut manager: TaskManager<Sum> = TaskManager::new(2).unwrap();
        manager.publish_task(Box::new(Square(2)));
        drop(manager);
    }
}
