use std::{
    ffi::{CStr, CString, NulError},
    os::unix::{ffi::OsStrExt, io::RawFd},
    path::Path,
};

use nix::{
    errno::Errno,
    fcntl::{fcntl, open, FcntlArg, FdFlag, OFlag},
    libc,
    sys::stat::Mode,
    unistd::{self, close, dup2, fork, pipe2, setpgid, ForkResult, Pid},
};
use thiserror::Error;

use super::{job::Job, signals, syscall};
use crate::cmd::execution_plan::{ExecutionPlan, OutputMode, Segment};

const EXIT_FAILURE: i32 = 1;
const EXIT_NOT_EXECUTABLE: i32 = 126;
const EXIT_NOT_FOUND: i32 = 127;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("argument contains a NUL byte: {0}")]
    Nul(#[from] NulError),
    #[error("{call} failed: {source}")]
    Sys {
        call: &'static str,
        #[source]
        source: Errno,
    },
}

/// A [`Segment`] converted to C strings before forking, so conversion errors
/// surface in the shell and the child only has system calls left to make.
/// The fork happens in a threaded process, so the child must not allocate.
struct Prepared {
    program: CString,
    argv: Vec<CString>,
    /// Pointers into `argv`, NULL-terminated, as `execvp` takes them.
    argv_ptrs: Vec<*const libc::c_char>,
    input: Option<CString>,
    output: Option<(CString, OutputMode)>,
}

impl Prepared {
    fn new(segment: &Segment<'_>) -> Result<Self, LaunchError> {
        let argv = segment
            .argv
            .iter()
            .map(|arg| CString::new(*arg))
            .collect::<Result<Vec<_>, _>>()?;

        // the heap buffers behind `argv` stay put when the `Vec` itself moves
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();

        Ok(Self {
            program: CString::new(segment.program())?,
            argv,
            argv_ptrs,
            input: segment.input.map(CString::new).transpose()?,
            output: segment
                .output
                .map(|target| CString::new(target.path).map(|path| (path, target.mode)))
                .transpose()?,
        })
    }
}

/// Descriptors a child attaches to its standard streams, and the one pipe
/// end it has no use for.
#[derive(Debug, Default, Clone, Copy)]
struct Wiring {
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    unused: Option<RawFd>,
    own_group: bool,
}

/// Starts the processes for `plan` with `working_dir` as their initial
/// directory.
///
/// A pipeline is started flat: the right side first, then the left, both as
/// direct children of the shell, and the shell closes its copies of the pipe
/// before returning. File redirections are opened in the child after any pipe
/// is attached, so a redirection overrides the pipe on its side.
pub fn launch(plan: &ExecutionPlan<'_>, working_dir: &Path) -> Result<Job, LaunchError> {
    let cwd = CString::new(working_dir.as_os_str().as_bytes())?;
    let left = Prepared::new(&plan.left)?;
    let own_group = plan.background;

    let Some(right) = &plan.right else {
        let pid = spawn(
            &left,
            &cwd,
            Wiring {
                own_group,
                ..Default::default()
            },
        )?;
        return Ok(Job::new(vec![pid], plan.background));
    };

    let right = Prepared::new(right)?;

    let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(|source| LaunchError::Sys {
        call: "pipe",
        source,
    })?;
    trace!(read, write, "created pipe");

    let close_pipe = || {
        for fd in [read, write] {
            if let Err(err) = close(fd) {
                warn!(fd, %err, "failed to close pipe end");
            }
        }
    };

    let right_pid = match spawn(
        &right,
        &cwd,
        Wiring {
            stdin: Some(read),
            unused: Some(write),
            own_group,
            ..Default::default()
        },
    ) {
        Ok(pid) => pid,
        Err(err) => {
            close_pipe();
            return Err(err);
        }
    };

    let left_pid = spawn(
        &left,
        &cwd,
        Wiring {
            stdout: Some(write),
            unused: Some(read),
            own_group,
            ..Default::default()
        },
    );

    close_pipe();

    match left_pid {
        Ok(left_pid) => Ok(Job::new(vec![left_pid, right_pid], plan.background)),
        Err(err) => {
            // the right side reads end-of-file now that the write end is gone
            if let Err(wait_err) = Job::new(vec![right_pid], false).wait() {
                warn!(%wait_err, "failed to reap right side of pipeline");
            }
            Err(err)
        }
    }
}

fn spawn(prepared: &Prepared, cwd: &CStr, wiring: Wiring) -> Result<Pid, LaunchError> {
    trace!(program = ?prepared.program, ?wiring, "forking");

    // SAFETY: the child never returns from here; it either execs or calls _exit
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            if wiring.own_group {
                // also done by the child; whichever runs first wins
                let _ = setpgid(child, child);
            }
            debug!(%child, program = ?prepared.program, "spawned");
            Ok(child)
        }
        Ok(ForkResult::Child) => exec_child(prepared, cwd, wiring),
        Err(source) => Err(LaunchError::Sys {
            call: "fork",
            source,
        }),
    }
}

fn exec_child(prepared: &Prepared, cwd: &CStr, wiring: Wiring) -> ! {
    signals::restore_defaults();

    if wiring.own_group {
        let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    }

    if let Some(fd) = wiring.unused {
        let _ = close(fd);
    }

    if let Err(errno) = unistd::chdir(cwd) {
        die(cwd.to_bytes(), errno.desc(), EXIT_FAILURE);
    }

    if let Some(fd) = wiring.stdin {
        attach(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = wiring.stdout {
        attach(fd, libc::STDOUT_FILENO);
    }

    if let Some(path) = &prepared.input {
        let flags = OFlag::O_RDONLY | OFlag::O_CLOEXEC;
        match syscall(|| open(path.as_c_str(), flags, Mode::empty())) {
            Ok(fd) => attach(fd, libc::STDIN_FILENO),
            Err(errno) => die(path.to_bytes(), errno.desc(), EXIT_FAILURE),
        }
    }

    if let Some((path, mode)) = &prepared.output {
        let flags = OFlag::O_WRONLY
            | OFlag::O_CREAT
            | OFlag::O_CLOEXEC
            | match mode {
                OutputMode::Truncate => OFlag::O_TRUNC,
                OutputMode::Append => OFlag::O_APPEND,
            };
        let perms = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
        match syscall(|| open(path.as_c_str(), flags, perms)) {
            Ok(fd) => attach(fd, libc::STDOUT_FILENO),
            Err(errno) => die(path.to_bytes(), errno.desc(), EXIT_FAILURE),
        }
    }

    // SAFETY: both pointers come from `prepared`, which outlives the call,
    // and `argv_ptrs` ends with NULL
    unsafe { libc::execvp(prepared.program.as_ptr(), prepared.argv_ptrs.as_ptr()) };
    let errno = Errno::last();

    let program = prepared.program.to_bytes();
    let (status, reason) = match errno {
        // only a bare name is searched for on PATH
        Errno::ENOENT if !program.contains(&b'/') => (EXIT_NOT_FOUND, "command not found"),
        Errno::ENOENT => (EXIT_NOT_FOUND, errno.desc()),
        Errno::EACCES => (EXIT_NOT_EXECUTABLE, errno.desc()),
        _ => (EXIT_FAILURE, errno.desc()),
    };

    die(program, reason, status)
}

/// Moves `fd` onto `target` and closes the original.
fn attach(fd: RawFd, target: RawFd) {
    if fd == target {
        // already in place, but opened close-on-exec
        if let Err(errno) = fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())) {
            die(b"fcntl", errno.desc(), EXIT_FAILURE);
        }
        return;
    }

    if let Err(errno) = syscall(|| dup2(fd, target)) {
        die(b"dup2", errno.desc(), EXIT_FAILURE);
    }
    let _ = close(fd);
}

/// Reports a failure from a forked child and ends it.
fn die(subject: &[u8], reason: &str, status: i32) -> ! {
    let parts: [&[u8]; 5] = [b"orbit: ", subject, b": ", reason.as_bytes(), b"\n"];
    for part in parts {
        let _ = unistd::write(libc::STDERR_FILENO, part);
    }

    // SAFETY: skips the exit handlers and buffered output inherited from the shell
    unsafe { libc::_exit(status) }
}
