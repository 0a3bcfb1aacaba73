use std::sync::atomic::{AtomicBool, Ordering};

use nix::{
    libc,
    sys::signal::{sigaction, signal, SaFlags, SigAction, SigHandler, SigSet, Signal},
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Keeps `SIGINT` from terminating the shell and ignores `SIGQUIT`.
///
/// The handler is installed without `SA_RESTART`, so a blocking read of the
/// next command line fails with `EINTR` and the line being typed can be
/// thrown away. A foreground job shares the shell's process group and gets
/// the terminal's interrupt directly; the shell only survives it. Handlers
/// do not survive `exec`, so programs start with the default disposition.
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );

    // SAFETY: the handler only touches an atomic
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    // SAFETY: no handler involved
    unsafe { signal(Signal::SIGQUIT, SigHandler::SigIgn) }?;

    debug!("installed interrupt handler");

    Ok(())
}

/// Returns whether an interrupt arrived since the last call, clearing it.
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Puts back the dispositions a program expects to start with. Called in a
/// forked child before `exec`.
///
/// The Rust runtime ignores `SIGPIPE`, and an ignored signal stays ignored
/// across `exec`, which would leave the writing side of a pipeline to see
/// `EPIPE` instead of being stopped. The shell's own ignored `SIGQUIT` would
/// be inherited the same way.
pub fn restore_defaults() {
    // SAFETY: plain disposition changes with no handler involved
    unsafe {
        for sig in [Signal::SIGPIPE, Signal::SIGINT, Signal::SIGQUIT] {
            let _ = signal(sig, SigHandler::SigDfl);
        }
    }
}
