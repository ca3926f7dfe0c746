// ============================================================================
// SESSION RUNNER: background execution of session commands
// ============================================================================
//
// The session itself never leaves the caller's thread. `submit` prepares a
// command (guards + input snapshot), spawns its `Work` on a rayon pool and
// returns at once; the finished outcome comes back over an mpsc channel and
// is committed by `poll`/`wait` on the caller's thread. Only one job may be
// outstanding per session, so completions arrive in submission order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;

use crate::error::{EditError, Result};
use crate::session::{Command, EditSession, Outcome, Ticket};

struct Completion {
    job: u64,
    result: Result<Outcome>,
}

/// Completion signal for one submitted job.
#[derive(Debug)]
pub struct JobReport {
    pub job: u64,
    pub command: &'static str,
    /// `Ok` once the result is installed in the session; the session is
    /// unchanged on `Err`.
    pub result: Result<()>,
}

impl JobReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

struct PendingJob {
    job: u64,
    ticket: Ticket,
}

pub struct SessionRunner {
    session: EditSession,
    pool: rayon::ThreadPool,
    sender: mpsc::Sender<Completion>,
    receiver: mpsc::Receiver<Completion>,
    pending: Option<PendingJob>,
    next_job: u64,
}

impl SessionRunner {
    /// Wrap `session` with a pool of `threads` workers (at least one).
    pub fn new(session: EditSession, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("filterlab-worker-{}", i))
            .build()
            .map_err(|e| EditError::Worker(e.to_string()))?;
        let (sender, receiver) = mpsc::channel();
        Ok(Self {
            session,
            pool,
            sender,
            receiver,
            pending: None,
            next_job: 1,
        })
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Start `command` in the background and return its job id.
    ///
    /// Fails immediately with `Busy` while another job is outstanding, or with
    /// the command's guard error (e.g. `InvalidTransition`). Neither case
    /// changes the session.
    pub fn submit(&mut self, command: Command) -> Result<u64> {
        if self.pending.is_some() {
            return Err(EditError::Busy);
        }
        let (ticket, work) = self.session.prepare(command)?;
        let job = self.next_job;
        self.next_job += 1;

        let sender = self.sender.clone();
        let name = ticket.command_name();
        self.pool.spawn(move || {
            let result = match catch_unwind(AssertUnwindSafe(|| work.run())) {
                Ok(result) => result,
                Err(panic_info) => {
                    let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic payload".to_string()
                    };
                    log_err!("Job {} ({}) panicked: {}", job, name, msg);
                    Err(EditError::TaskPanicked(msg))
                }
            };
            let _ = sender.send(Completion { job, result });
        });

        self.pending = Some(PendingJob { job, ticket });
        Ok(job)
    }

    /// Non-blocking: the report of the outstanding job if it has finished.
    pub fn poll(&mut self) -> Option<JobReport> {
        match self.receiver.try_recv() {
            Ok(completion) => self.finish(completion),
            Err(_) => None,
        }
    }

    /// Block until the outstanding job finishes. `None` when nothing is pending.
    pub fn wait(&mut self) -> Option<JobReport> {
        self.pending.as_ref()?;
        match self.receiver.recv() {
            Ok(completion) => self.finish(completion),
            Err(_) => None,
        }
    }

    /// Submit `command` and block for its report.
    pub fn run(&mut self, command: Command) -> Result<()> {
        self.submit(command)?;
        match self.wait() {
            Some(report) => report.result,
            None => Err(EditError::Worker("job finished without a report".to_string())),
        }
    }

    fn finish(&mut self, completion: Completion) -> Option<JobReport> {
        let pending = self.pending.take_if(|p| p.job == completion.job)?;
        let command = pending.ticket.command_name();
        let result = completion
            .result
            .and_then(|outcome| self.session.commit(pending.ticket, outcome).map(|_| ()));
        if let Err(e) = &result {
            log_warn!("Job {} ({}) failed: {}", completion.job, command, e);
        }
        Some(JobReport {
            job: completion.job,
            command,
            result,
        })
    }
}
