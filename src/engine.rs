//! Sequential command-execution engine.
//!
//! One worker task owns the transport and drains a FIFO job queue; at most
//! one job is ever in flight, so operations reach the device in strict
//! enqueue order. Front ends push `(command, args)` pairs with
//! [`Engine::enqueue`] and consume the engine's event stream through
//! [`Engine::subscribe`].
//!
//! Error policy: a malformed argument, an unrecognized command or a transport
//! failure is reported as one `error` event and the queue advances, so a long
//! batch script survives an operator mistake. Only the `exit` command, or a
//! transport failure when `halt_on_transport_error` is set, ends the session;
//! the terminal transition discards any still-queued jobs, closes the
//! transport exactly once and emits a single `End` event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::codec::{self, ByteOrder};
use crate::command::CommandKind;
use crate::config::config as global_config;
use crate::error::{MbconError, ValidationError};
use crate::format;
use crate::transport::Transport;
use crate::validate;

/// One parsed console command, immutable once enqueued.
#[derive(Debug, Clone)]
pub struct Job {
    pub command: String,
    pub args: Vec<String>,
}

/// Lifecycle and output events broadcast to every subscribed front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Informational output (`echo`, connection banners).
    Info(String),
    /// One human-readable line per failed job; the queue continues.
    Error(String),
    /// One line of read output.
    Response(String),
    /// Fires after every completed job; front ends use it to re-prompt.
    AfterJob,
    /// The queue has been quiet for the configured idle window.
    QueueIdle,
    /// Terminal event: session over, transport released. Carries the fatal
    /// error message if the session ended on a fault.
    End(Option<String>),
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub unit_id: u8,
    pub idle_window: Duration,
    pub halt_on_transport_error: bool,
}

impl EngineOptions {
    #[must_use]
    pub const fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    #[must_use]
    pub const fn with_idle_window(mut self, window: Duration) -> Self {
        self.idle_window = window;
        self
    }

    #[must_use]
    pub const fn with_halt_on_transport_error(mut self, halt: bool) -> Self {
        self.halt_on_transport_error = halt;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        let cfg = global_config();
        Self {
            unit_id: 1,
            idle_window: Duration::from_millis(cfg.idle_window_ms),
            halt_on_transport_error: cfg.halt_on_transport_error,
        }
    }
}

/// Handle to a running engine. Dropping the handle closes the job channel and
/// lets the worker wind down.
pub struct Engine {
    jobs: mpsc::UnboundedSender<Job>,
    events: broadcast::Sender<Event>,
    stopped: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl Engine {
    /// Move `transport` into a new worker task and return the handle.
    pub fn spawn<T>(transport: T, options: EngineOptions) -> Self
    where
        T: Transport + 'static,
    {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(256);
        let stopped = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            transport,
            options,
            events: events_tx.clone(),
            stopped: Arc::clone(&stopped),
        };
        let handle = tokio::spawn(worker.run(jobs_rx));
        Self {
            jobs: jobs_tx,
            events: events_tx,
            stopped,
            worker: handle,
        }
    }

    /// Append a job to the queue. A silent no-op once the engine is draining
    /// or closed.
    pub fn enqueue(&self, command: impl Into<String>, args: Vec<String>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let job = Job {
            command: command.into(),
            args,
        };
        // send only fails when the worker is gone, which the flag also covers
        let _ = self.jobs.send(job);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// True once the engine has reached its terminal state (after `exit` or
    /// a fatal fault); enqueues are no-ops from then on.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Wait for the worker task to finish.
    pub async fn join(self) {
        drop(self.jobs);
        let _ = self.worker.await;
    }
}

enum JobOutcome {
    Continue,
    Stop,
}

struct Worker<T> {
    transport: T,
    options: EngineOptions,
    events: broadcast::Sender<Event>,
    stopped: Arc<AtomicBool>,
}

impl<T: Transport> Worker<T> {
    async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<Job>) {
        // armed whenever the queue has gone quiet after activity; disarmed
        // once it fires so a silent session does not tick forever
        let mut idle_at: Option<Instant> = None;
        loop {
            let job = if let Some(deadline) = idle_at {
                tokio::select! {
                    job = jobs.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                    () = time::sleep_until(deadline) => {
                        self.emit(Event::QueueIdle);
                        idle_at = None;
                        continue;
                    }
                }
            } else {
                match jobs.recv().await {
                    Some(job) => job,
                    None => break,
                }
            };

            match self.run_job(&job).await {
                Ok(JobOutcome::Continue) => {
                    self.emit(Event::AfterJob);
                    idle_at = Some(Instant::now() + self.options.idle_window);
                }
                Ok(JobOutcome::Stop) => {
                    self.shut_down(&mut jobs, None).await;
                    return;
                }
                Err(err) => {
                    self.shut_down(&mut jobs, Some(err.to_string())).await;
                    return;
                }
            }
        }
        // all handles dropped without an explicit exit: still release the
        // transport exactly once
        if let Err(e) = self.transport.close().await {
            log::warn!("transport close failed: {e}");
        }
    }

    async fn shut_down(&mut self, jobs: &mut mpsc::UnboundedReceiver<Job>, error: Option<String>) {
        self.stopped.store(true, Ordering::SeqCst);
        jobs.close();
        // jobs still queued at termination are discarded, never executed
        let mut discarded = 0usize;
        while jobs.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            log::debug!("discarded {discarded} queued job(s) on termination");
        }
        if let Err(e) = self.transport.close().await {
            log::warn!("transport close failed: {e}");
        }
        self.emit(Event::End(error));
    }

    fn emit(&self, event: Event) {
        // no subscribers is fine; events are best-effort
        let _ = self.events.send(event);
    }

    fn emit_error(&self, message: impl std::fmt::Display) {
        self.emit(Event::Error(message.to_string()));
    }

    /// Report a failed transport call. Non-fatal unless the engine was
    /// configured to halt, in which case the error propagates as the
    /// session-ending fault.
    fn transport_failed(&self, err: MbconError) -> Result<(), MbconError> {
        self.emit_error(&err);
        if self.options.halt_on_transport_error {
            Err(err)
        } else {
            Ok(())
        }
    }

    async fn run_job(&mut self, job: &Job) -> Result<JobOutcome, MbconError> {
        let Ok(kind) = job.command.parse::<CommandKind>() else {
            self.emit_error(format!("unrecognized command {}", job.command));
            return Ok(JobOutcome::Continue);
        };
        log::debug!("job {:?} args={:?}", kind, job.args);

        let args = job.args.as_slice();
        match kind {
            CommandKind::Exit => return Ok(JobOutcome::Stop),
            CommandKind::Echo => self.emit(Event::Info(args.join(" "))),
            CommandKind::Delay => match validate::delay_millis(arg(args, 0)) {
                Ok(ms) => time::sleep(Duration::from_millis(ms)).await,
                Err(e) => self.emit_error(e),
            },
            CommandKind::ReadCoils | CommandKind::ReadDiscreteInputs => {
                self.read_bits(kind, args).await?;
            }
            CommandKind::ReadHolding | CommandKind::ReadInput => {
                self.read_words(kind, args).await?;
            }
            CommandKind::WriteCoil => match validate::address_and_boolean(arg(args, 0), arg(args, 1)) {
                Ok((addr, value)) => {
                    let unit = self.options.unit_id;
                    if let Err(e) = self.transport.write_single_coil(unit, addr, value).await {
                        self.transport_failed(e)?;
                    }
                }
                Err(e) => self.emit_error(e),
            },
            CommandKind::WriteRegister => {
                match validate::address_and_register_value(arg(args, 0), arg(args, 1)) {
                    Ok((addr, value)) => {
                        let unit = self.options.unit_id;
                        if let Err(e) = self.transport.write_single_register(unit, addr, value).await
                        {
                            self.transport_failed(e)?;
                        }
                    }
                    Err(e) => self.emit_error(e),
                }
            }
            CommandKind::WriteCoils => {
                match validate::address_and_boolean_values(arg(args, 0), rest(args)) {
                    Ok((addr, values)) => {
                        let unit = self.options.unit_id;
                        if let Err(e) =
                            self.transport.write_multiple_coils(unit, addr, &values).await
                        {
                            self.transport_failed(e)?;
                        }
                    }
                    Err(e) => self.emit_error(e),
                }
            }
            CommandKind::WriteRegisters => {
                match validate::address_and_register_values(arg(args, 0), rest(args)) {
                    Ok((addr, values)) => {
                        let unit = self.options.unit_id;
                        if let Err(e) = self
                            .transport
                            .write_multiple_registers(unit, addr, &values)
                            .await
                        {
                            self.transport_failed(e)?;
                        }
                    }
                    Err(e) => self.emit_error(e),
                }
            }
            CommandKind::ReadHoldingFloats(order) | CommandKind::ReadInputFloats(order) => {
                self.read_floats(kind, order, args).await?;
            }
            CommandKind::WriteFloats(order) => {
                match validate::address_and_float_values(arg(args, 0), rest(args)) {
                    Ok((addr, floats)) => {
                        let words: Vec<u16> = floats
                            .iter()
                            .flat_map(|&f| codec::encode_float(f, order))
                            .collect();
                        let unit = self.options.unit_id;
                        if let Err(e) = self
                            .transport
                            .write_multiple_registers(unit, addr, &words)
                            .await
                        {
                            self.transport_failed(e)?;
                        }
                    }
                    Err(e) => self.emit_error(e),
                }
            }
        }
        Ok(JobOutcome::Continue)
    }

    async fn read_bits(&mut self, kind: CommandKind, args: &[String]) -> Result<(), MbconError> {
        let (addr, count) = match validate::address_and_count(arg(args, 0), arg(args, 1)) {
            Ok(p) => p,
            Err(e) => {
                self.emit_error(e);
                return Ok(());
            }
        };
        let unit = self.options.unit_id;
        let res = match kind {
            CommandKind::ReadCoils => self.transport.read_coils(unit, addr, count).await,
            _ => self.transport.read_discrete_inputs(unit, addr, count).await,
        };
        match res {
            Ok(bits) => {
                for line in format::format_coils(&bits, addr) {
                    self.emit(Event::Response(line));
                }
                Ok(())
            }
            Err(e) => self.transport_failed(e),
        }
    }

    async fn read_words(&mut self, kind: CommandKind, args: &[String]) -> Result<(), MbconError> {
        let (addr, count) = match validate::address_and_count(arg(args, 0), arg(args, 1)) {
            Ok(p) => p,
            Err(e) => {
                self.emit_error(e);
                return Ok(());
            }
        };
        let unit = self.options.unit_id;
        let res = match kind {
            CommandKind::ReadHolding => self.transport.read_holding_registers(unit, addr, count).await,
            _ => self.transport.read_input_registers(unit, addr, count).await,
        };
        match res {
            Ok(words) => {
                for line in format::format_registers(&words, addr) {
                    self.emit(Event::Response(line));
                }
                Ok(())
            }
            Err(e) => self.transport_failed(e),
        }
    }

    async fn read_floats(
        &mut self,
        kind: CommandKind,
        order: ByteOrder,
        args: &[String],
    ) -> Result<(), MbconError> {
        // two registers per float: the raw read covers count * 2 words
        let params = validate::address_and_count(arg(args, 0), arg(args, 1)).and_then(|(a, n)| {
            n.checked_mul(2)
                .map(|words| (a, words))
                .ok_or(ValidationError::BadCount)
        });
        let (addr, words) = match params {
            Ok(p) => p,
            Err(e) => {
                self.emit_error(e);
                return Ok(());
            }
        };
        let unit = self.options.unit_id;
        let res = match kind {
            CommandKind::ReadHoldingFloats(_) => {
                self.transport.read_holding_registers(unit, addr, words).await
            }
            _ => self.transport.read_input_registers(unit, addr, words).await,
        };
        match res {
            Ok(registers) => {
                let floats = codec::decode_floats(&registers, order);
                let line = floats
                    .iter()
                    .map(f32::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.emit(Event::Response(line));
                Ok(())
            }
            Err(e) => self.transport_failed(e),
        }
    }
}

fn arg(args: &[String], index: usize) -> &str {
    args.get(index).map_or("", String::as_str)
}

fn rest(args: &[String]) -> &[String] {
    args.get(1..).unwrap_or(&[])
}
