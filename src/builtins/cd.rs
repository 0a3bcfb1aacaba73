use std::io::Write;

use nix::errno::Errno;

use crate::prelude::*;

use super::{BuiltinCommand, BuiltinError};

#[derive(Default)]
pub struct Cd;

impl BuiltinCommand for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn execute(
        &self,
        args: &[&str],
        state: &mut State,
        _out: &mut dyn Write,
    ) -> Result<Flow, BuiltinError> {
        trace!("executing cd builtin: {args:?}");

        let Some(target) = args.get(1) else {
            return Err(BuiltinError::MissingArgument(self.name()));
        };

        let failed = |source| BuiltinError::ChangeDirectory {
            path: target.to_string(),
            source,
        };

        let full_path = state.working_dir.join(target).canonicalize().map_err(failed)?;
        if !full_path.is_dir() {
            return Err(failed(Errno::ENOTDIR.into()));
        }

        trace!("cd: {:?}", full_path);

        state.working_dir = full_path;

        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state_in(dir: &std::path::Path) -> State {
        State::with_working_dir(Config::default(), dir.canonicalize().unwrap())
    }

    #[test]
    fn changes_into_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let mut state = state_in(dir.path());

        let flow = Cd.execute(&["cd", "sub"], &mut state, &mut Vec::new()).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(state.working_dir, dir.path().canonicalize().unwrap().join("sub"));
        assert!(state
            .prompt()
            .contains(&state.working_dir.display().to_string()));

        Cd.execute(&["cd", ".."], &mut state, &mut Vec::new()).unwrap();
        assert_eq!(state.working_dir, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_directory_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        let before = state.working_dir.clone();

        let err = Cd
            .execute(&["cd", "nope"], &mut state, &mut Vec::new())
            .unwrap_err();

        assert!(matches!(err, BuiltinError::ChangeDirectory { .. }));
        assert!(err.to_string().starts_with("nope: "));
        assert_eq!(state.working_dir, before);
    }

    #[test]
    fn regular_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file"), b"").unwrap();
        let mut state = state_in(dir.path());

        let err = Cd
            .execute(&["cd", "file"], &mut state, &mut Vec::new())
            .unwrap_err();

        assert!(matches!(err, BuiltinError::ChangeDirectory { .. }));
        assert_eq!(state.working_dir, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn requires_an_argument() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());

        let err = Cd.execute(&["cd"], &mut state, &mut Vec::new()).unwrap_err();

        assert_eq!(err.to_string(), "expected argument to \"cd\"");
    }
}
