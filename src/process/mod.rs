use nix::errno::Errno;

pub mod job;
pub mod launch;
pub mod signals;
pub mod status;

pub use self::{
    job::{BackgroundJobs, Job, WaitError},
    launch::{launch, LaunchError},
    status::JobStatus,
};

/// Retries a system call for as long as it is interrupted by a signal.
pub(crate) fn syscall<T>(f: impl Fn() -> nix::Result<T>) -> nix::Result<T> {
    loop {
        match f() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}
