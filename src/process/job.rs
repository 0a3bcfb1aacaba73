use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitPidFlag, WaitStatus},
    unistd::Pid,
};
use thiserror::Error;

use super::{status::JobStatus, syscall};

#[derive(Debug, Error)]
#[error("failed to wait for process {pid}: {source}")]
pub struct WaitError {
    pub pid: Pid,
    #[source]
    pub source: Errno,
}

/// The processes started for one command line, in pipeline order.
#[derive(Debug)]
pub struct Job {
    pids: Vec<Pid>,
    background: bool,
}

impl Job {
    pub fn new(pids: Vec<Pid>, background: bool) -> Self {
        Self { pids, background }
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    /// The process reported to the user for this job.
    pub fn leader(&self) -> Pid {
        self.pids[0]
    }

    /// Blocks until every process of the job has terminated and returns the
    /// status of the last one. Every process is waited on even if an earlier
    /// wait fails; the first failure is returned.
    pub fn wait(self) -> Result<JobStatus, WaitError> {
        let mut result = Ok(JobStatus::Exited(0));

        for pid in self.pids {
            let status = wait_for(pid);
            trace!(%pid, ?status, "waited");
            if result.is_ok() {
                result = status;
            }
        }

        result
    }
}

fn wait_for(pid: Pid) -> Result<JobStatus, WaitError> {
    loop {
        match syscall(|| waitpid(pid, None)) {
            Ok(status) => {
                if let Some(status) = JobStatus::from_wait(status) {
                    return Ok(status);
                }
            }
            Err(source) => return Err(WaitError { pid, source }),
        }
    }
}

/// Background processes that have not been reaped yet.
///
/// Only processes recorded here are ever waited on, and each is dropped from
/// the table as soon as it has been reaped.
#[derive(Debug, Default)]
pub struct BackgroundJobs {
    pids: Vec<Pid>,
}

impl BackgroundJobs {
    pub fn track(&mut self, job: Job) {
        self.pids.extend(job.pids);
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Collects every tracked process that has terminated, without blocking.
    pub fn reap(&mut self) -> Vec<(Pid, JobStatus)> {
        let mut finished = Vec::new();

        self.pids
            .retain(|&pid| match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => true,
                Ok(status) => match JobStatus::from_wait(status) {
                    Some(status) => {
                        finished.push((pid, status));
                        false
                    }
                    None => true,
                },
                Err(errno) => {
                    warn!(%pid, %errno, "dropping background job that cannot be waited on");
                    false
                }
            });

        finished
    }
}
