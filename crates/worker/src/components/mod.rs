pub mod receive_task;
pub mod send_task;
pub mod transport;
pub mod worker_loop;
pub mod worker_state;

pub use receive_task::{apply_inbound_frame, ReceiveTask};
pub use send_task::SendTask;
pub use transport::{QueueConnector, QueueStream};
pub use worker_loop::{JobHandler, WorkerLoop};
pub use worker_state::{NextAction, WorkerPhase, WorkerState};
